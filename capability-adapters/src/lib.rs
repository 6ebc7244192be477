//! External service clients and the capabilities built on them.
//!
//! Clients implement [`ServiceClient`]; [`capabilities`] turns them into
//! registrable descriptors.

#![warn(missing_docs, clippy::pedantic)]

pub mod capabilities;
pub mod stub;
pub mod traits;
pub mod twitter;

mod http_client;

pub use capabilities::{
    QUERY_FIELD, RECENT_TWEETS_CAPABILITY_ID, ServiceCapability, TWEET_CAPABILITY_ID,
    recent_tweets_capability, tweet_capability,
};
pub use stub::StubClient;
pub use traits::{ServiceClient, ServiceError, ServiceMetadata, ServiceResult};
pub use twitter::{NO_RECENT_TWEETS, RecentTweetSearch, TweetPoster, TwitterClient, TwitterConfig};

//! Capability descriptors backed by service clients.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use capability_primitives::{CapabilityId, FieldSpec, InputSchema, Result, ValidatedInput};
use capability_registry::{Capability, CapabilityDescriptor, CapabilityError, CapabilityResult};
use tracing::debug;

use crate::traits::ServiceClient;

/// Argument name shared by the service-backed capabilities.
pub const QUERY_FIELD: &str = "query";

/// Identity of the tweet capability.
pub const TWEET_CAPABILITY_ID: &str = "tweet.post";

/// Identity of the recent-tweets capability.
pub const RECENT_TWEETS_CAPABILITY_ID: &str = "6e57b718-8953-448b-98db-fd19c1d1469c";

/// Executor that forwards one string argument to a [`ServiceClient`].
pub struct ServiceCapability {
    client: Arc<dyn ServiceClient>,
    field: &'static str,
}

impl fmt::Debug for ServiceCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCapability")
            .field("service", &self.client.metadata().service())
            .field("operation", &self.client.metadata().operation())
            .field("field", &self.field)
            .finish()
    }
}

impl ServiceCapability {
    /// Forwards the `field` argument to `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ServiceClient>, field: &'static str) -> Self {
        Self { client, field }
    }
}

#[async_trait]
impl Capability for ServiceCapability {
    async fn execute(&self, input: ValidatedInput) -> CapabilityResult<String> {
        let argument = input.str(self.field).ok_or_else(|| {
            CapabilityError::unknown(format!("argument `{}` is not a string", self.field))
        })?;

        let metadata = self.client.metadata();
        debug!(
            service = metadata.service(),
            operation = metadata.operation(),
            "calling service"
        );
        Ok(self.client.call(argument).await?)
    }
}

/// Descriptor for posting a tweet through `client`.
///
/// # Errors
///
/// Returns an error only if the built-in identity, slug, or schema is
/// rejected.
pub fn tweet_capability(client: Arc<dyn ServiceClient>) -> Result<CapabilityDescriptor> {
    let schema = InputSchema::builder()
        .field(
            FieldSpec::string(QUERY_FIELD)
                .required()
                .description("The text for the tweet.")
                .min_length(1)
                .max_length(280),
        )
        .build()?;

    CapabilityDescriptor::builder(CapabilityId::new(TWEET_CAPABILITY_ID)?)
        .display_name("Tweet on Twitter")?
        .slug("tweeterTweet")?
        .description("Tweet a message using Twitter.")
        .input_schema(schema)
        .executor(ServiceCapability::new(client, QUERY_FIELD))
        .build()
}

/// Descriptor for searching recent tweets through `client`.
///
/// # Errors
///
/// Returns an error only if the built-in identity, slug, or schema is
/// rejected.
pub fn recent_tweets_capability(client: Arc<dyn ServiceClient>) -> Result<CapabilityDescriptor> {
    let schema = InputSchema::builder()
        .field(
            FieldSpec::string(QUERY_FIELD)
                .required()
                .description("Search query for tweets from the last seven days.")
                .min_length(1)
                .max_length(512),
        )
        .build()?;

    CapabilityDescriptor::builder(CapabilityId::new(RECENT_TWEETS_CAPABILITY_ID)?)
        .display_name("Get Recent Tweets")?
        .slug("recentTweets")?
        .description("Fetch recent tweets matching a query.")
        .input_schema(schema)
        .executor(ServiceCapability::new(client, QUERY_FIELD))
        .build()
}

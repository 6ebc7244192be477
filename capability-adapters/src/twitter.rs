//! Twitter API v2 client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::{Bytes, to_bytes};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, HeaderMap, Request, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::http_client::{HyperClient, build_https_client};
use crate::traits::{ServiceClient, ServiceError, ServiceMetadata, ServiceResult};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";
const MIN_RESULTS: u8 = 10;
const MAX_RESULTS: u8 = 100;

/// Text returned by [`TwitterClient::search_recent`] when nothing matched.
pub const NO_RECENT_TWEETS: &str = "no recent tweets";

/// Configuration for [`TwitterClient`].
#[derive(Clone)]
pub struct TwitterConfig {
    base_url: String,
    bearer_token: Option<String>,
    timeout: Duration,
    max_results: u8,
}

impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TwitterConfig {
    /// Creates a configuration pointing at the public API with no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            bearer_token: None,
            timeout: Duration::from_secs(30),
            max_results: MIN_RESULTS,
        }
    }

    /// Overrides the API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] if the URL has no http(s)
    /// scheme or does not parse.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> ServiceResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the bearer token used for every request.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many tweets a recent search asks for.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] outside `10..=100`, the range
    /// the search endpoint accepts.
    pub fn with_max_results(mut self, max_results: u8) -> ServiceResult<Self> {
        if !(MIN_RESULTS..=MAX_RESULTS).contains(&max_results) {
            return Err(ServiceError::configuration(format!(
                "max_results must be within {MIN_RESULTS}..={MAX_RESULTS}, got {max_results}"
            )));
        }
        self.max_results = max_results;
        Ok(self)
    }

    /// Base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured search page size.
    #[must_use]
    pub const fn max_results(&self) -> u8 {
        self.max_results
    }
}

/// Client for the tweet and recent-search endpoints. Both operations share
/// one connection pool.
pub struct TwitterClient {
    client: HyperClient,
    tweets_endpoint: Uri,
    search_endpoint: String,
    authorization: String,
    timeout: Duration,
    max_results: u8,
}

impl fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterClient")
            .field("tweets_endpoint", &self.tweets_endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// Constructs a client from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] when no bearer token is set or
    /// the endpoints cannot be derived from the base URL.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: TwitterConfig) -> ServiceResult<Self> {
        let token = config
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ServiceError::configuration("twitter bearer token is not set"))?;

        let tweets_endpoint = format!("{}2/tweets", config.base_url)
            .parse::<Uri>()
            .map_err(|err| {
                ServiceError::configuration(format!("invalid Twitter endpoint: {err}"))
            })?;

        Ok(Self {
            client: build_https_client(),
            tweets_endpoint,
            search_endpoint: format!("{}2/tweets/search/recent", config.base_url),
            authorization: format!("Bearer {token}"),
            timeout: config.timeout,
            max_results: config.max_results,
        })
    }

    /// Posts `text` as a tweet, returning `posted:<id>`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] describing transport, status, or decoding
    /// failures.
    pub async fn post_tweet(&self, text: &str) -> ServiceResult<String> {
        let request = self.build_post_request(text)?;
        let bytes = self.send(request, "post_tweet").await?;
        let created: Envelope<Tweet> = decode(&bytes)?;
        let tweet = created
            .data
            .ok_or_else(|| ServiceError::response("tweet response carried no data"))?;
        Ok(format!("posted:{}", tweet.id))
    }

    /// Searches tweets from the last seven days, one line per tweet.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] describing transport, status, or decoding
    /// failures.
    pub async fn search_recent(&self, query: &str) -> ServiceResult<String> {
        let request = self.build_search_request(query)?;
        let bytes = self.send(request, "search_recent").await?;
        let found: Envelope<Vec<Tweet>> = decode(&bytes)?;
        Ok(render_tweets(found.data.unwrap_or_default()))
    }

    fn build_post_request(&self, text: &str) -> ServiceResult<Request<Body>> {
        let body = serde_json::to_vec(&CreateTweet { text }).map_err(|err| {
            ServiceError::configuration(format!("failed to encode tweet: {err}"))
        })?;

        Request::post(self.tweets_endpoint.clone())
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| ServiceError::transport(format!("failed to build tweet request: {err}")))
    }

    fn build_search_request(&self, query: &str) -> ServiceResult<Request<Body>> {
        let uri = format!(
            "{}?query={}&max_results={}",
            self.search_endpoint,
            urlencoding::encode(query),
            self.max_results
        )
        .parse::<Uri>()
        .map_err(|err| ServiceError::configuration(format!("invalid search URI: {err}")))?;

        Request::get(uri)
            .header(AUTHORIZATION, &self.authorization)
            .body(Body::empty())
            .map_err(|err| ServiceError::transport(format!("failed to build search request: {err}")))
    }

    async fn send(&self, request: Request<Body>, operation: &'static str) -> ServiceResult<Vec<u8>> {
        debug!(operation, uri = %request.uri().path(), "twitter request");

        let (status, headers, bytes) = timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| ServiceError::Timeout {
                elapsed: self.timeout,
            })??;

        check_status(status, &headers, &bytes)?;
        debug!(operation, status = status.as_u16(), "twitter response");
        Ok(bytes.to_vec())
    }

    /// Sends the request and reads the whole body.
    async fn exchange(&self, request: Request<Body>) -> ServiceResult<(StatusCode, HeaderMap, Bytes)> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| ServiceError::transport(format!("Twitter request failed: {err}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            ServiceError::transport(format!("failed to read Twitter response: {err}"))
        })?;
        Ok((status, headers, bytes))
    }
}

fn check_status(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ServiceResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ServiceError::RateLimited { retry_after });
    }

    let reason = serde_json::from_slice::<ProblemDetails>(body)
        .ok()
        .and_then(|problem| problem.detail.or(problem.title))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    Err(ServiceError::rejected(status.as_u16(), &reason))
}

fn decode<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> ServiceResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|err| ServiceError::response(format!("failed to decode Twitter response: {err}")))
}

fn render_tweets(tweets: Vec<Tweet>) -> String {
    if tweets.is_empty() {
        return NO_RECENT_TWEETS.to_owned();
    }
    tweets
        .into_iter()
        .map(|tweet| format!("{}: {}", tweet.id, tweet.text.replace(['\n', '\r'], " ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_base_url(input: &str) -> ServiceResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ServiceError::configuration(
            "Twitter base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| ServiceError::configuration(format!("invalid Twitter base URL: {err}")))?;
    Ok(base)
}

#[derive(Debug, Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ProblemDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Posts its input as a tweet.
#[derive(Debug, Clone)]
pub struct TweetPoster {
    client: Arc<TwitterClient>,
    metadata: ServiceMetadata,
}

impl TweetPoster {
    /// Wraps a shared client.
    #[must_use]
    pub fn new(client: Arc<TwitterClient>) -> Self {
        Self {
            client,
            metadata: ServiceMetadata::new("twitter", "post_tweet"),
        }
    }
}

#[async_trait]
impl ServiceClient for TweetPoster {
    fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    async fn call(&self, input: &str) -> ServiceResult<String> {
        self.client.post_tweet(input).await
    }
}

/// Runs its input as a recent-tweet search query.
#[derive(Debug, Clone)]
pub struct RecentTweetSearch {
    client: Arc<TwitterClient>,
    metadata: ServiceMetadata,
}

impl RecentTweetSearch {
    /// Wraps a shared client.
    #[must_use]
    pub fn new(client: Arc<TwitterClient>) -> Self {
        Self {
            client,
            metadata: ServiceMetadata::new("twitter", "search_recent"),
        }
    }
}

#[async_trait]
impl ServiceClient for RecentTweetSearch {
    fn metadata(&self) -> &ServiceMetadata {
        &self.metadata
    }

    async fn call(&self, input: &str) -> ServiceResult<String> {
        self.client.search_recent(input).await
    }
}

//! Tweet miner: serves the Twitter capabilities over JSON lines on stdin.
//!
//! Each input line is `{"tool": "<slug or identity>", "arguments": {...}}`;
//! each output line is the capability output or a feedback message.

mod protocol;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use capability_adapters::{
    RecentTweetSearch, ServiceClient, StubClient, TweetPoster, TwitterClient, TwitterConfig,
    recent_tweets_capability, tweet_capability,
};
use capability_config::NodeConfig;
use capability_registry::{CapabilityRegistry, TracingObserver};
use capability_telemetry::TelemetryConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::parse_from_env()?;
    let node_dir = config.ensure_directories()?;
    capability_telemetry::init(&TelemetryConfig::new(config.log_filter()).with_log_dir(&node_dir))?;

    info!(
        miner = %config.miner.name,
        netuid = config.netuid,
        mock = config.miner.mock,
        path = %node_dir.display(),
        "starting tweet miner"
    );
    debug!(config = %serde_json::to_string(&config)?, "effective configuration");

    let registry = build_registry(&config)?;

    if config.miner.intro_text {
        let catalog = serde_json::to_string_pretty(&registry.list().to_json_catalog())?;
        println!("{catalog}");
    }

    serve(&registry).await
}

fn build_registry(config: &NodeConfig) -> Result<CapabilityRegistry> {
    let (poster, search): (Arc<dyn ServiceClient>, Arc<dyn ServiceClient>) = if config.miner.mock {
        (
            Arc::new(StubClient::new("posted:")),
            Arc::new(StubClient::new("recent:")),
        )
    } else {
        let mut twitter = TwitterConfig::new()
            .with_base_url(&config.twitter.base_url)?
            .with_max_results(config.twitter.max_results)?
            .with_timeout(config.invoke_timeout().unwrap_or(Duration::from_secs(30)));
        if let Some(token) = &config.twitter.bearer_token {
            twitter = twitter.with_bearer_token(token.clone());
        }
        let client = Arc::new(TwitterClient::new(twitter).context("failed to build Twitter client")?);
        (
            Arc::new(TweetPoster::new(Arc::clone(&client))),
            Arc::new(RecentTweetSearch::new(client)),
        )
    };

    let mut registry = CapabilityRegistry::new().with_observer(Arc::new(TracingObserver));
    if let Some(deadline) = config.invoke_timeout() {
        registry = registry.with_default_timeout(deadline);
    }
    registry.register_all([tweet_capability(poster)?, recent_tweets_capability(search)?])?;

    info!(capabilities = registry.len(), "registry ready");
    Ok(registry)
}

async fn serve(registry: &CapabilityRegistry) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = protocol::handle_line(registry, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    info!("tweet miner stopped");
    Ok(())
}

//! Node configuration schema.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::{ArgAction, Args, Parser, ValueEnum};
use serde::Serialize;

use crate::paths::expand_home;

/// Everything a capability node needs at startup.
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "capability-node", about = "Serves registered capabilities to an orchestrator")]
pub struct NodeConfig {
    /// Axon settings.
    #[command(flatten)]
    pub axon: AxonArgs,

    /// Chain connection settings.
    #[command(flatten)]
    pub subtensor: SubtensorArgs,

    /// Subnet uid served by this node.
    #[arg(id = "netuid", long, env = "CAPREG_NETUID", default_value_t = 22)]
    pub netuid: u16,

    /// Wallet selection.
    #[command(flatten)]
    pub wallet: WalletArgs,

    /// Log output settings.
    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Miner behaviour.
    #[command(flatten)]
    pub miner: MinerArgs,

    /// Language model selection.
    #[command(flatten)]
    pub llm: LlmArgs,

    /// Twitter API access.
    #[command(flatten)]
    pub twitter: TwitterArgs,

    /// Invocation limits.
    #[command(flatten)]
    pub invoke: InvokeArgs,
}

/// Axon settings.
#[derive(Debug, Clone, Args, Serialize)]
pub struct AxonArgs {
    /// Port to serve the axon on.
    #[arg(id = "axon.port", long = "axon.port", env = "CAPREG_AXON_PORT", default_value_t = 8098)]
    pub port: u16,
}

/// Chain connection settings.
#[derive(Debug, Clone, Args, Serialize)]
pub struct SubtensorArgs {
    /// Network to connect to.
    #[arg(id = "subtensor.network", long = "subtensor.network", env = "CAPREG_SUBTENSOR_NETWORK", default_value = "finney")]
    pub network: String,

    /// Chain endpoint to connect to.
    #[arg(
        id = "subtensor.chain_endpoint",
        long = "subtensor.chain_endpoint",
        env = "CAPREG_SUBTENSOR_CHAIN_ENDPOINT",
        default_value = "wss://entrypoint-finney.opentensor.ai:443"
    )]
    pub chain_endpoint: String,
}

/// Wallet selection.
#[derive(Debug, Clone, Args, Serialize)]
pub struct WalletArgs {
    /// Wallet (coldkey) name.
    #[arg(id = "wallet.name", long = "wallet.name", env = "CAPREG_WALLET_NAME", default_value = "default")]
    pub name: String,

    /// Hotkey name.
    #[arg(id = "wallet.hotkey", long = "wallet.hotkey", env = "CAPREG_WALLET_HOTKEY", default_value = "default")]
    pub hotkey: String,
}

/// Log output settings.
#[derive(Debug, Clone, Args, Serialize)]
pub struct LoggingArgs {
    /// Root directory for per-node logs.
    #[arg(
        id = "logging.logging_dir",
        long = "logging.logging_dir",
        env = "CAPREG_LOGGING_DIR",
        default_value = "~/.bittensor/miners"
    )]
    pub logging_dir: String,

    /// Enables debug output.
    #[arg(id = "logging.debug", long = "logging.debug", env = "CAPREG_LOGGING_DEBUG", action = ArgAction::SetTrue)]
    pub debug: bool,

    /// Enables trace output.
    #[arg(id = "logging.trace", long = "logging.trace", env = "CAPREG_LOGGING_TRACE", action = ArgAction::SetTrue)]
    pub trace: bool,
}

/// Miner behaviour.
#[derive(Debug, Clone, Args, Serialize)]
pub struct MinerArgs {
    /// Name of this miner; the last component of its directory.
    #[arg(id = "miner.name", long = "miner.name", env = "CAPREG_MINER_NAME", default_value = "Bittensor Miner")]
    pub name: String,

    /// Blocks between weight updates.
    #[arg(
        id = "miner.blocks_per_epoch",
        long = "miner.blocks_per_epoch",
        env = "CAPREG_MINER_BLOCKS_PER_EPOCH",
        default_value_t = 100
    )]
    pub blocks_per_epoch: u32,

    /// Serves capabilities from offline stubs instead of live services.
    #[arg(id = "miner.mock", long = "miner.mock", env = "CAPREG_MINER_MOCK", action = ArgAction::SetTrue)]
    pub mock: bool,

    /// Prints the capability catalog at startup.
    #[arg(
        id = "miner.intro_text",
        long = "miner.intro_text",
        env = "CAPREG_MINER_INTRO_TEXT",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub intro_text: bool,
}

/// Language model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Hosted OpenAI models.
    Openai,
    /// Locally served models.
    Local,
}

/// Language model selection.
#[derive(Debug, Clone, Args, Serialize)]
pub struct LlmArgs {
    /// Model provider.
    #[arg(
        id = "llm.model_provider",
        long = "llm.model_provider",
        env = "CAPREG_LLM_MODEL_PROVIDER",
        value_enum,
        default_value = "openai"
    )]
    pub model_provider: ModelProvider,

    /// Model name or path.
    #[arg(id = "llm.model_name", long = "llm.model_name", env = "CAPREG_LLM_MODEL_NAME", default_value = "gpt-3.5-turbo-1106")]
    pub model_name: String,

    /// Sampling temperature.
    #[arg(id = "llm.temperature", long = "llm.temperature", env = "CAPREG_LLM_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,
}

/// Twitter API access.
#[derive(Clone, Args, Serialize)]
pub struct TwitterArgs {
    /// API base URL.
    #[arg(id = "twitter.base_url", long = "twitter.base_url", env = "CAPREG_TWITTER_BASE_URL", default_value = "https://api.twitter.com/")]
    pub base_url: String,

    /// Bearer token for the v2 API.
    #[arg(id = "twitter.bearer_token", long = "twitter.bearer_token", env = "CAPREG_TWITTER_BEARER_TOKEN", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,

    /// Tweets requested per recent search.
    #[arg(id = "twitter.max_results", long = "twitter.max_results", env = "CAPREG_TWITTER_MAX_RESULTS", default_value_t = 10)]
    pub max_results: u8,
}

impl fmt::Debug for TwitterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterArgs")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Invocation limits.
#[derive(Debug, Clone, Args, Serialize)]
pub struct InvokeArgs {
    /// Default deadline per invocation in milliseconds; `0` disables it.
    #[arg(id = "invoke.timeout_ms", long = "invoke.timeout_ms", env = "CAPREG_INVOKE_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,
}

impl NodeConfig {
    /// Parses the process arguments and environment, then validates.
    ///
    /// Exits the process on `--help` or malformed flags, as clap does.
    ///
    /// # Errors
    ///
    /// Returns an error if the parsed values fail [`NodeConfig::validate`].
    pub fn parse_from_env() -> Result<Self> {
        let config = <Self as Parser>::parse();
        config.validate()?;
        Ok(config)
    }

    /// Parses an explicit argument list (the first item is the binary name).
    ///
    /// # Errors
    ///
    /// Returns an error for malformed flags or values that fail validation.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = <Self as Parser>::try_parse_from(args).context("invalid node arguments")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints clap cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.llm.temperature.is_finite() && (0.0..=2.0).contains(&self.llm.temperature),
            "llm.temperature must be within 0..=2, got {}",
            self.llm.temperature
        );
        ensure!(!self.llm.model_name.trim().is_empty(), "llm.model_name must not be empty");
        ensure!(
            (10..=100).contains(&self.twitter.max_results),
            "twitter.max_results must be within 10..=100, got {}",
            self.twitter.max_results
        );
        ensure!(
            self.miner.mock || self.twitter.bearer_token.as_deref().is_some_and(|t| !t.trim().is_empty()),
            "twitter.bearer_token is required unless miner.mock is set"
        );

        for (flag, value) in [
            ("wallet.name", &self.wallet.name),
            ("wallet.hotkey", &self.wallet.hotkey),
            ("miner.name", &self.miner.name),
        ] {
            ensure!(!value.trim().is_empty(), "{flag} must not be empty");
            ensure!(
                !value.contains(['/', '\\']) && value != ".." && value != ".",
                "{flag} must be a single path component, got {value:?}"
            );
        }
        Ok(())
    }

    /// Node directory: `<logging_dir>/<wallet>/<hotkey>/netuid<uid>/<miner name>`.
    #[must_use]
    pub fn full_path(&self) -> PathBuf {
        expand_home(&self.logging.logging_dir)
            .join(&self.wallet.name)
            .join(&self.wallet.hotkey)
            .join(format!("netuid{}", self.netuid))
            .join(&self.miner.name)
    }

    /// Default invocation deadline, or `None` when disabled.
    #[must_use]
    pub fn invoke_timeout(&self) -> Option<Duration> {
        (self.invoke.timeout_ms > 0).then(|| Duration::from_millis(self.invoke.timeout_ms))
    }

    /// Log filter directive implied by the logging flags.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.logging.trace {
            "trace"
        } else if self.logging.debug {
            "debug"
        } else {
            "info"
        }
    }
}

//! Configuration for capability nodes.
//!
//! [`NodeConfig`] is parsed from `--group.flag` options with `CAPREG_*`
//! environment fallbacks and knows the node's directory layout.

#![warn(missing_docs, clippy::pedantic)]

pub mod node;
pub mod paths;

pub use node::{
    AxonArgs, InvokeArgs, LlmArgs, LoggingArgs, MinerArgs, ModelProvider, NodeConfig,
    SubtensorArgs, TwitterArgs, WalletArgs,
};
pub use paths::expand_home;

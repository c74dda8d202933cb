//! Environment-driven configuration, loaded the way `ethrex_l2`'s
//! `ProverServerConfig` does: a plain `Deserialize` struct read through
//! `envy::prefixed`, with `clap` covering the handful of flags an operator
//! expects to override on the command line rather than export.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read OPNET_* environment configuration: {0}")]
    Env(#[from] envy::Error),
}

/// Environment-sourced settings (`OPNET_*`). Everything here has a default,
/// so a bare `opnet-node` with no environment at all still starts.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    #[serde(default = "defaults::listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    #[serde(default = "defaults::consensus_activation_height")]
    pub consensus_activation_height: u64,
    #[serde(default = "defaults::expiration_blocks")]
    pub expiration_blocks: u64,
    #[serde(default = "defaults::minimal_psbt_acceptance_fee_vb_per_sat")]
    pub minimal_psbt_acceptance_fee_vb_per_sat: u64,
    #[serde(default = "defaults::max_subscriptions")]
    pub max_subscriptions: usize,
    #[serde(default = "defaults::max_decompressed_size")]
    pub max_decompressed_size: usize,
    #[serde(default = "defaults::max_contract_size_compressed")]
    pub max_contract_size_compressed: usize,
    #[serde(default = "defaults::max_calldata_size_compressed")]
    pub max_calldata_size_compressed: usize,

    #[serde(default = "defaults::fee_refresh_interval_secs")]
    pub fee_refresh_interval_secs: u64,
    #[serde(default = "defaults::block_watch_interval_secs")]
    pub block_watch_interval_secs: u64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            listen_addr: defaults::listen_addr(),
            log_level: defaults::log_level(),
            consensus_activation_height: defaults::consensus_activation_height(),
            expiration_blocks: defaults::expiration_blocks(),
            minimal_psbt_acceptance_fee_vb_per_sat: defaults::minimal_psbt_acceptance_fee_vb_per_sat(),
            max_subscriptions: defaults::max_subscriptions(),
            max_decompressed_size: defaults::max_decompressed_size(),
            max_contract_size_compressed: defaults::max_contract_size_compressed(),
            max_calldata_size_compressed: defaults::max_calldata_size_compressed(),
            fee_refresh_interval_secs: defaults::fee_refresh_interval_secs(),
            block_watch_interval_secs: defaults::block_watch_interval_secs(),
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed("OPNET_").from_env::<Self>()?)
    }

    pub fn fee_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.fee_refresh_interval_secs)
    }

    pub fn block_watch_interval(&self) -> Duration {
        Duration::from_secs(self.block_watch_interval_secs)
    }
}

mod defaults {
    use std::net::SocketAddr;

    pub fn listen_addr() -> SocketAddr {
        "127.0.0.1:9500".parse().expect("valid default listen addr")
    }
    pub fn log_level() -> String {
        "info".to_string()
    }
    pub fn consensus_activation_height() -> u64 {
        0
    }
    pub fn expiration_blocks() -> u64 {
        20_000
    }
    pub fn minimal_psbt_acceptance_fee_vb_per_sat() -> u64 {
        1
    }
    pub fn max_subscriptions() -> usize {
        16
    }
    pub fn max_decompressed_size() -> usize {
        32 * 1024 * 1024
    }
    pub fn max_contract_size_compressed() -> usize {
        128 * 1024
    }
    pub fn max_calldata_size_compressed() -> usize {
        64 * 1024
    }
    pub fn fee_refresh_interval_secs() -> u64 {
        30
    }
    pub fn block_watch_interval_secs() -> u64 {
        5
    }
}

/// Command-line overrides. Anything left unset falls back to `EnvConfig`.
#[derive(Parser, Debug)]
#[command(name = "opnet-node", about = "OP_NET block execution and mempool node")]
pub struct Cli {
    /// WebSocket listen address, overrides OPNET_LISTEN_ADDR.
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Tracing filter directive, overrides OPNET_LOG_LEVEL.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn apply(self, mut env: EnvConfig) -> EnvConfig {
        if let Some(listen_addr) = self.listen_addr {
            env.listen_addr = listen_addr;
        }
        if let Some(log_level) = self.log_level {
            env.log_level = log_level;
        }
        env
    }
}

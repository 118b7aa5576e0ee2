use clap::Parser;
use serde::{Deserialize, Serialize};

use pulse_common::{
    chain::{ChainId, WalletAddress},
    config::{
        DEFAULT_DISTRIBUTION_INTERVAL_SECS, DEFAULT_MAX_WITHDRAWAL, DEFAULT_MIN_WITHDRAWAL,
        DEFAULT_SIGNUP_BONUS, DEFAULT_SUBMIT_TIMEOUT_SECS, MAX_BATCH_SIZE,
    },
};

// Default bind address for the RPC server.
// Kept on loopback: the daemon sits behind the platform backend, and admin
// methods must not be reachable from the network. To expose it anyway, set
// --rpc-bind-address 0.0.0.0:8080 explicitly.
pub const DEFAULT_RPC_BIND_ADDRESS: &str = "127.0.0.1:8080";

// Default sled database directory
pub const DEFAULT_DB_PATH: &str = "pulse-ledger";

// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Address the JSON-RPC server binds to
    #[clap(long, default_value = DEFAULT_RPC_BIND_ADDRESS)]
    pub rpc_bind_address: String,

    /// Number of actix workers, 0 = one per core
    #[clap(long, default_value_t = 0)]
    pub rpc_workers: usize,
}

/// Settlement chain integration. Distribution is refused unless every field
/// is set: a partially configured chain is treated as not configured.
#[derive(Debug, Clone, Default, clap::Args, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the operator signer service
    #[clap(long)]
    pub chain_rpc_url: Option<String>,

    /// Reward token contract address
    #[clap(long)]
    pub contract_address: Option<WalletAddress>,

    /// Numeric chain id of the settlement chain
    #[clap(long)]
    pub chain_id: Option<ChainId>,

    /// Bearer token authenticating the daemon against the signer service
    #[clap(long)]
    pub operator_key: Option<String>,

    /// Base URL used to build explorer links for settled transactions
    #[clap(long)]
    pub explorer_url: Option<String>,
}

impl ChainConfig {
    pub fn is_configured(&self) -> bool {
        self.chain_rpc_url.is_some()
            && self.contract_address.is_some()
            && self.chain_id.is_some()
            && self.operator_key.is_some()
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Maximum withdrawals settled in one batch
    #[clap(long, default_value_t = MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Seconds between scheduled batch runs, 0 disables the scheduler
    #[clap(long, default_value_t = DEFAULT_DISTRIBUTION_INTERVAL_SECS)]
    pub distribution_interval_secs: u64,

    /// Timeout for a single on-chain submission, treated as failure on expiry
    #[clap(long, default_value_t = DEFAULT_SUBMIT_TIMEOUT_SECS)]
    pub submit_timeout_secs: u64,

    /// Minimum accepted withdrawal amount (atomic units)
    #[clap(long, default_value_t = DEFAULT_MIN_WITHDRAWAL)]
    pub min_withdrawal: u64,

    /// Maximum accepted withdrawal amount (atomic units)
    #[clap(long, default_value_t = DEFAULT_MAX_WITHDRAWAL)]
    pub max_withdrawal: u64,

    /// Settle each withdrawal synchronously instead of queueing for a batch
    #[clap(long)]
    pub instant_distribution: bool,

    /// Bonus credited to fresh accounts at registration (atomic units)
    #[clap(long, default_value_t = DEFAULT_SIGNUP_BONUS)]
    pub signup_bonus: u64,
}

/// Daemon configuration, from CLI flags or a JSON config file
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[clap(version = pulse_common::config::VERSION, about = "Pulse reward ledger daemon")]
pub struct Config {
    /// JSON config file to load instead of CLI flags
    #[clap(long)]
    #[serde(skip)]
    pub config_file: Option<String>,

    /// Write a config file template at --config-file path and exit
    #[clap(long)]
    #[serde(skip)]
    pub generate_config_template: bool,

    /// Sled database directory
    #[clap(long, default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Log level filter (error, warn, info, debug, trace)
    #[clap(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[clap(flatten)]
    pub rpc: RpcConfig,

    #[clap(flatten)]
    pub chain: ChainConfig,

    #[clap(flatten)]
    pub distribution: DistributionConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_config_requires_all_fields() {
        let mut config = ChainConfig::default();
        assert!(!config.is_configured());

        config.chain_rpc_url = Some("http://127.0.0.1:9000".to_string());
        config.contract_address = Some(WalletAddress::zero());
        config.chain_id = Some(137);
        assert!(!config.is_configured());

        config.operator_key = Some("secret".to_string());
        assert!(config.is_configured());
    }
}

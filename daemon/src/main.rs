use std::{
    fs::File,
    io::Write,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use tokio::signal;

use pulse_common::config::VERSION;
use pulse_daemon::{
    config::{ChainConfig, Config},
    core::{
        chain::HttpChainClient,
        distributor::start_distribution_scheduler,
        ledger::{ChainContext, Ledger},
        storage::SledStorage,
    },
    rpc::DaemonRpcServer,
};

fn build_chain_context(config: &ChainConfig) -> Option<ChainContext> {
    let client = HttpChainClient::from_config(config)?;
    Some(ChainContext {
        client: Arc::new(client),
        contract: config.contract_address?,
        chain_id: config.chain_id?,
        explorer_url: config.explorer_url.clone(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(());
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(());
        }

        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
    } else if config.generate_config_template {
        eprintln!("--config-file is required to generate a config template");
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_level.as_str()))
        .init();
    info!("Pulse reward ledger daemon v{}", VERSION);

    let storage = SledStorage::new(&config.db_path)
        .with_context(|| format!("Error while opening storage at {}", config.db_path))?;

    let chain = build_chain_context(&config.chain);
    if chain.is_none() {
        warn!("chain integration not configured: withdrawals will queue but never settle");
    }

    let ledger = Ledger::new(storage, chain, config.distribution.clone());

    let running = Arc::new(AtomicBool::new(true));
    let scheduler = start_distribution_scheduler(Arc::clone(&ledger), Arc::clone(&running));

    let rpc_server = DaemonRpcServer::new(
        Arc::clone(&ledger),
        config.rpc.rpc_bind_address.clone(),
        config.rpc.rpc_workers,
    )
    .await?;

    signal::ctrl_c()
        .await
        .context("Error while waiting for interrupt signal")?;
    info!("Shutting down...");

    running.store(false, Ordering::SeqCst);
    if let Some(handle) = scheduler {
        handle.abort();
    }
    rpc_server.stop().await;
    ledger.stop().await;
    info!("Bye");
    Ok(())
}

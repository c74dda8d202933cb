//! `opnet-node`: wires the block pipeline, mempool admission, and
//! WebSocket protocol crates together into one process. Structured after
//! `ethrex-dev`'s binary — parse CLI/env config, stand up an in-memory
//! store, start the server, shut down cleanly on Ctrl+C.

mod broadcaster;
mod config;
mod handler;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opnet_consensus::{ConsensusView, GasParams};
use opnet_mempool::{spawn_block_watcher, spawn_fee_refresher, FeeEstimate, MempoolAdmission};
use opnet_rpc::{AppState, NotificationManager, ServerConfig};
use opnet_storage::InMemoryStore;

use crate::broadcaster::UnconfiguredBroadcaster;
use crate::config::{Cli, EnvConfig};
use crate::handler::NodeRequestHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_config = EnvConfig::from_env().unwrap_or_else(|error| {
        eprintln!("falling back to OPNET_* defaults: {error}");
        EnvConfig::default()
    });
    let config = cli.apply(env_config);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::new(config.log_level.clone()))
        .init();

    let consensus = ConsensusView::new(
        GasParams::default(),
        config.max_decompressed_size,
        config.max_contract_size_compressed,
        config.max_calldata_size_compressed,
        config.expiration_blocks,
        config.minimal_psbt_acceptance_fee_vb_per_sat,
        config.max_subscriptions,
        config.consensus_activation_height,
    );

    let store: Arc<dyn opnet_storage::Store> = Arc::new(InMemoryStore::new());
    let broadcaster: Arc<dyn opnet_mempool::RpcBroadcaster> = Arc::new(UnconfiguredBroadcaster);
    let fee_estimate = FeeEstimate::new(config.minimal_psbt_acceptance_fee_vb_per_sat);

    let mempool = Arc::new(MempoolAdmission::new(
        store.clone(),
        consensus.clone(),
        broadcaster.clone(),
        true,
    ));

    let abort = CancellationToken::new();

    let fee_refresher = spawn_fee_refresher(
        broadcaster.clone(),
        consensus.clone(),
        fee_estimate.clone(),
        config.fee_refresh_interval(),
    );

    // Snapshot of the store's latest height, refreshed periodically and
    // read synchronously by both the block watcher and the handshake
    // response — a block pipeline driven by a live base-layer feed would
    // instead push height updates here directly.
    let height_snapshot = Arc::new(AtomicU64::new(0));
    let height_refresher = {
        let store = store.clone();
        let height_snapshot = height_snapshot.clone();
        let interval = config.block_watch_interval();
        let abort = abort.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = abort.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Ok(Some(height)) = store.get_latest_block_number().await {
                            height_snapshot.store(height, Ordering::Relaxed);
                        }
                    }
                }
            }
        })
    };

    let block_watcher = {
        let height_snapshot = height_snapshot.clone();
        spawn_block_watcher(
            store.clone(),
            consensus.clone(),
            move || height_snapshot.load(Ordering::Relaxed),
            config.block_watch_interval(),
        )
    };

    let handler = Arc::new(NodeRequestHandler {
        store: store.clone(),
        consensus: consensus.clone(),
        mempool,
        fee_estimate: fee_estimate.clone(),
    });
    let notifications = Arc::new(NotificationManager::new());
    let current_block_height: Arc<dyn Fn() -> u64 + Send + Sync> = {
        let consensus = consensus.clone();
        Arc::new(move || consensus.block_height())
    };

    let app_state = AppState::new(
        ServerConfig::default(),
        handler,
        notifications,
        current_block_height,
    );

    info!(addr = %config.listen_addr, "starting opnet-node");
    let serve_result = opnet_rpc::serve(config.listen_addr, app_state).await;

    abort.cancel();
    fee_refresher.abort();
    block_watcher.abort();
    height_refresher.abort();

    serve_result.map_err(anyhow::Error::from)
}

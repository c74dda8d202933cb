//! Background tasks that run alongside admission (§4.6): a timer that
//! refreshes the fee estimate and a block-change watcher that advances
//! `ConsensusView`'s height cursor and sweeps expired entries. Spawned as
//! plain `tokio::spawn` loops, the same shape `opnet-chain::pipeline` uses
//! for fire-and-forget generic-transaction writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opnet_consensus::ConsensusView;
use opnet_storage::Store;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::RpcBroadcaster;

/// Clamps the live fee estimate to `minimal_psbt_acceptance_fee_vb_per_sat`
/// and republishes it here for callers (the RPC layer's fee-estimate
/// opcode) to read.
pub struct FeeEstimate {
    value: AtomicU64,
}

impl FeeEstimate {
    pub fn new(floor: u64) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicU64::new(floor),
        })
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }
}

/// Re-fetches the base-layer fee estimate every `interval`, clamped to
/// `consensus.minimal_psbt_acceptance_fee_vb_per_sat` (§4.6).
pub fn spawn_fee_refresher(
    broadcaster: Arc<dyn RpcBroadcaster>,
    consensus: ConsensusView,
    estimate: Arc<FeeEstimate>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match broadcaster.estimate_fee_vb_sat().await {
                Ok(fee) => {
                    let clamped = fee.max(consensus.minimal_psbt_acceptance_fee_vb_per_sat);
                    estimate.set(clamped);
                }
                Err(error) => warn!(%error, "fee estimate refresh failed"),
            }
        }
    })
}

/// Polls `current_height` for changes, drives `consensus.set_block_height`,
/// and sweeps mempool entries older than `expiration_blocks` (§4.6).
pub fn spawn_block_watcher(
    store: Arc<dyn Store>,
    consensus: ConsensusView,
    current_height: impl Fn() -> u64 + Send + Sync + 'static,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last_seen = consensus.block_height();
        loop {
            ticker.tick().await;
            let height = current_height();
            if height == last_seen {
                continue;
            }
            last_seen = height;
            consensus.set_block_height(height);

            let floor = height.saturating_sub(consensus.expiration_blocks);
            match store.purge_mempool_before(floor).await {
                Ok(purged) if purged > 0 => {
                    info!(purged, floor, "swept expired mempool entries");
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "mempool expiration sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::stub::StubBroadcaster;
    use opnet_storage::InMemoryStore;

    #[tokio::test]
    async fn fee_estimate_starts_at_floor() {
        let estimate = FeeEstimate::new(5);
        assert_eq!(estimate.get(), 5);
    }

    #[tokio::test]
    async fn fee_refresher_updates_estimate() {
        let consensus = ConsensusView::default();
        let estimate = FeeEstimate::new(1);
        let broadcaster: Arc<dyn RpcBroadcaster> = Arc::new(StubBroadcaster {
            fee_result: std::sync::Mutex::new(Some(Ok(42))),
            ..Default::default()
        });
        let handle = spawn_fee_refresher(
            broadcaster,
            consensus,
            estimate.clone(),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(estimate.get(), 42);
    }

    #[tokio::test]
    async fn block_watcher_sweeps_expired_entries() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let consensus = ConsensusView::default();
        let height = Arc::new(AtomicU64::new(50_000));
        let height_clone = height.clone();
        let handle = spawn_block_watcher(
            store,
            consensus.clone(),
            move || height_clone.load(Ordering::Relaxed),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(consensus.block_height(), 50_000);
    }
}

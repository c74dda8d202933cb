//! Placeholder [`RpcBroadcaster`]. The base-layer RPC client is the
//! "thread-message bus" spec'd only by interface (§1) — a real deployment
//! swaps this for a client that actually talks to a Bitcoin node; this
//! binary exists to prove the rest of the system wires together.

use async_trait::async_trait;
use opnet_mempool::RpcBroadcaster;
use opnet_mempool::broadcast::RpcBroadcastError;

pub struct UnconfiguredBroadcaster;

#[async_trait]
impl RpcBroadcaster for UnconfiguredBroadcaster {
    async fn broadcast_raw_transaction(&self, _raw_hex: &str) -> Result<String, RpcBroadcastError> {
        Err(RpcBroadcastError::Unreachable(
            "no base-layer RPC client configured".to_string(),
        ))
    }

    async fn estimate_fee_vb_sat(&self) -> Result<u64, RpcBroadcastError> {
        Err(RpcBroadcastError::Unreachable(
            "no base-layer RPC client configured".to_string(),
        ))
    }
}

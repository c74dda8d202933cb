//! Base-layer RPC seam (§4.6 "thread bus"). `opnet-mempool` never talks to
//! a Bitcoin node directly — it goes through this trait, the same way
//! `opnet-chain::vm` never embeds an interpreter. Production wiring hangs a
//! JSON-RPC client off it; tests hang a canned stub.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcBroadcastError {
    #[error("base-layer RPC rejected the transaction: {0}")]
    Rejected(String),
    #[error("base-layer RPC unreachable: {0}")]
    Unreachable(String),
}

/// Narrow seam into the base-layer node: broadcasting raw transactions and
/// refreshing the fee-per-vbyte estimate used to clamp mempool acceptance.
#[async_trait]
pub trait RpcBroadcaster: Send + Sync {
    /// Submits `raw_hex` to the base layer, returning its txid on acceptance.
    async fn broadcast_raw_transaction(&self, raw_hex: &str) -> Result<String, RpcBroadcastError>;

    /// Current recommended fee, in sat/vB.
    async fn estimate_fee_vb_sat(&self) -> Result<u64, RpcBroadcastError>;
}

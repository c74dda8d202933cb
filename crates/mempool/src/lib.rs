//! Mempool admission (C8, §4.6): the pre-block gate a raw transaction
//! passes through before it reaches the base-layer RPC and the local
//! repository. Mirrors the split `opnet-chain` uses for the block pipeline —
//! a synchronous admission decision here, background refreshers running
//! alongside it — the same way `ethrex_blockchain::mempool` is a thin pool
//! plus a separate pruning task (`mempool_tx_pruner.rs`).

pub mod admission;
pub mod broadcast;
pub mod parse;
pub mod tasks;

pub use admission::{AdmissionOutcome, MempoolAdmission};
pub use broadcast::RpcBroadcaster;
pub use tasks::{spawn_block_watcher, spawn_fee_refresher, FeeEstimate};

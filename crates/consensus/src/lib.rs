//! Consensus-wide configuration (C4, §9 `OPNetConsensus`).
//!
//! Per the design note "pass an explicit `ConsensusView` into every
//! component; forbid process-wide mutable singletons", every parameter a
//! block or mempool operation needs is reached through a [`ConsensusView`]
//! value the caller threads in explicitly — there is no `static`/`OnceCell`
//! global here, only a single atomic height cursor that `set_block_height`
//! updates, which is the one piece of mutable shared state the spec
//! actually calls for.

pub mod gas;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use gas::{predict_next_base_gas, GasParams, GasState};

/// Size/behavior caps and gas-predictor parameters for one chain, passed by
/// value into every component that needs them (§4.5, §4.6).
#[derive(Debug, Clone)]
pub struct ConsensusView {
    pub gas: GasParams,
    pub max_decompressed_size: usize,
    pub max_contract_size_compressed: usize,
    pub max_calldata_size_compressed: usize,
    pub expiration_blocks: u64,
    pub minimal_psbt_acceptance_fee_vb_per_sat: u64,
    pub max_subscriptions: usize,
    pub consensus_activation_height: u64,
    height: Arc<AtomicU64>,
}

impl ConsensusView {
    pub fn new(
        gas: GasParams,
        max_decompressed_size: usize,
        max_contract_size_compressed: usize,
        max_calldata_size_compressed: usize,
        expiration_blocks: u64,
        minimal_psbt_acceptance_fee_vb_per_sat: u64,
        max_subscriptions: usize,
        consensus_activation_height: u64,
    ) -> Self {
        Self {
            gas,
            max_decompressed_size,
            max_contract_size_compressed,
            max_calldata_size_compressed,
            expiration_blocks,
            minimal_psbt_acceptance_fee_vb_per_sat,
            max_subscriptions,
            consensus_activation_height,
            height: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Single entry point for updating the live block height (§4.6); the
    /// block-change watcher is the only expected caller.
    pub fn set_block_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn block_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.block_height() >= self.consensus_activation_height
    }
}

impl Default for ConsensusView {
    fn default() -> Self {
        Self::new(
            GasParams::default(),
            32 * 1024 * 1024,
            128 * 1024,
            64 * 1024,
            20_000,
            1,
            16,
            0,
        )
    }
}

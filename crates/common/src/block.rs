use serde::{Deserialize, Serialize};

use crate::hash::Hash32;

/// `(height, hash)` identity pair for a block (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockIdentity {
    pub height: u64,
    pub hash: Hash32,
}

/// A Merkle proof: sibling hashes from leaf to root.
pub type MerkleProof = Vec<Hash32>;

/// Bit-exact field list per §6 "Stored block header". Fields computed
/// during execution (`storage_root` onward) start `None` and are filled in
/// exactly once by `sign_block`; a block that completed `execute`/`sign`
/// without fault has every computed field `Some`, a reverted block has none
/// persisted (the in-memory `Block` is simply dropped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: Hash32,
    pub previous_block_hash: Hash32,
    pub merkle_root: Hash32,
    pub time: u32,
    pub median_time: u32,
    pub size: u32,
    pub weight: u32,
    pub stripped_size: u32,
    pub bits: u32,
    pub nonce: u32,
    pub version: i32,
    pub tx_count: u32,

    pub previous_block_checksum: Option<Hash32>,

    // Computed by the block pipeline.
    pub storage_root: Option<Hash32>,
    pub receipt_root: Option<Hash32>,
    pub checksum_root: Option<Hash32>,
    pub checksum_proofs: Option<Vec<MerkleProof>>,
    pub ema: Option<i64>,
    pub base_gas: Option<i64>,
    pub gas_used: Option<i64>,
}

impl BlockHeader {
    pub fn identity(&self) -> BlockIdentity {
        BlockIdentity {
            height: self.height,
            hash: self.hash,
        }
    }

    /// True once every field computed by `execute`/`sign_block` is present.
    pub fn is_signed(&self) -> bool {
        self.storage_root.is_some()
            && self.receipt_root.is_some()
            && self.checksum_root.is_some()
            && self.checksum_proofs.is_some()
            && self.ema.is_some()
            && self.base_gas.is_some()
            && self.gas_used.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<crate::transaction::Transaction>,
}

impl Block {
    pub fn identity(&self) -> BlockIdentity {
        self.header.identity()
    }
}

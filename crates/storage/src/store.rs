use async_trait::async_trait;
use opnet_common::{Block, BlockHeader, Hash32, MempoolEntry};

use crate::error::StoreError;

/// Persistence seam for the block pipeline and mempool.
///
/// Mirrors `ethrex_storage::Store`'s role: the pipeline (C7) and mempool
/// admission path (C8) depend only on this trait, never on a concrete
/// backend. The Mongo-style repository implementation described in
/// spec.md §1 is explicitly out of scope here; [`crate::memory::InMemoryStore`]
/// is the reference implementation used by tests and the example binary.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_latest_block_number(&self) -> Result<Option<u64>, StoreError>;
    async fn get_block_header(&self, height: u64) -> Result<Option<BlockHeader>, StoreError>;
    async fn get_block_header_by_hash(
        &self,
        hash: Hash32,
    ) -> Result<Option<BlockHeader>, StoreError>;

    /// Persists a fully signed block. Called once from `finalize` (§4.1);
    /// never called for a block that was reverted.
    async fn add_block(&self, block: Block) -> Result<(), StoreError>;

    /// Drops any in-flight state for `height` — the counterpart to
    /// `revert_block` (§4.1): called when a block faults before `finalize`.
    async fn revert_block(&self, height: u64) -> Result<(), StoreError>;

    async fn add_mempool_entry(&self, entry: MempoolEntry) -> Result<(), StoreError>;
    async fn get_mempool_entry(&self, id: Hash32) -> Result<Option<MempoolEntry>, StoreError>;
    async fn contains_mempool_entry(&self, id: Hash32) -> Result<bool, StoreError>;
    /// Removes mempool entries seen before `min_height` (§4.6 expiration sweep).
    async fn purge_mempool_before(&self, min_height: u64) -> Result<u64, StoreError>;
}

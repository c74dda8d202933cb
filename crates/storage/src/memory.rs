use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use opnet_common::{Block, BlockHeader, Hash32, MempoolEntry};

use crate::error::StoreError;
use crate::store::Store;

/// In-memory reference [`Store`] implementation, the same role
/// `ethrex_storage`'s in-memory engine plays in tests: good enough to run
/// the pipeline and mempool end to end without a real repository.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    headers_by_height: RwLock<HashMap<u64, BlockHeader>>,
    headers_by_hash: RwLock<HashMap<Hash32, u64>>,
    blocks: RwLock<HashMap<u64, Block>>,
    latest_height: RwLock<Option<u64>>,
    mempool: RwLock<HashMap<Hash32, MempoolEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock_err(what: &str) -> StoreError {
        StoreError::LockPoisoned(what.to_string())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_latest_block_number(&self) -> Result<Option<u64>, StoreError> {
        Ok(*self
            .latest_height
            .read()
            .map_err(|_| Self::read_lock_err("latest_height"))?)
    }

    async fn get_block_header(&self, height: u64) -> Result<Option<BlockHeader>, StoreError> {
        Ok(self
            .headers_by_height
            .read()
            .map_err(|_| Self::read_lock_err("headers_by_height"))?
            .get(&height)
            .cloned())
    }

    async fn get_block_header_by_hash(
        &self,
        hash: Hash32,
    ) -> Result<Option<BlockHeader>, StoreError> {
        let height = *self
            .headers_by_hash
            .read()
            .map_err(|_| Self::read_lock_err("headers_by_hash"))?
            .get(&hash)
            .unwrap_or(&u64::MAX);
        if height == u64::MAX {
            return Ok(None);
        }
        self.get_block_header(height).await
    }

    async fn add_block(&self, block: Block) -> Result<(), StoreError> {
        let height = block.header.height;
        let hash = block.header.hash;

        self.headers_by_height
            .write()
            .map_err(|_| Self::read_lock_err("headers_by_height"))?
            .insert(height, block.header.clone());
        self.headers_by_hash
            .write()
            .map_err(|_| Self::read_lock_err("headers_by_hash"))?
            .insert(hash, height);
        self.blocks
            .write()
            .map_err(|_| Self::read_lock_err("blocks"))?
            .insert(height, block);

        let mut latest = self
            .latest_height
            .write()
            .map_err(|_| Self::read_lock_err("latest_height"))?;
        let should_advance = match *latest {
            Some(current) => height > current,
            None => true,
        };
        if should_advance {
            *latest = Some(height);
        }
        Ok(())
    }

    async fn revert_block(&self, height: u64) -> Result<(), StoreError> {
        if let Some(block) = self
            .blocks
            .write()
            .map_err(|_| Self::read_lock_err("blocks"))?
            .remove(&height)
        {
            self.headers_by_hash
                .write()
                .map_err(|_| Self::read_lock_err("headers_by_hash"))?
                .remove(&block.header.hash);
        }
        self.headers_by_height
            .write()
            .map_err(|_| Self::read_lock_err("headers_by_height"))?
            .remove(&height);
        Ok(())
    }

    async fn add_mempool_entry(&self, entry: MempoolEntry) -> Result<(), StoreError> {
        self.mempool
            .write()
            .map_err(|_| Self::read_lock_err("mempool"))?
            .insert(entry.id, entry);
        Ok(())
    }

    async fn get_mempool_entry(&self, id: Hash32) -> Result<Option<MempoolEntry>, StoreError> {
        Ok(self
            .mempool
            .read()
            .map_err(|_| Self::read_lock_err("mempool"))?
            .get(&id)
            .cloned())
    }

    async fn contains_mempool_entry(&self, id: Hash32) -> Result<bool, StoreError> {
        Ok(self
            .mempool
            .read()
            .map_err(|_| Self::read_lock_err("mempool"))?
            .contains_key(&id))
    }

    async fn purge_mempool_before(&self, min_height: u64) -> Result<u64, StoreError> {
        let mut pool = self
            .mempool
            .write()
            .map_err(|_| Self::read_lock_err("mempool"))?;
        let before = pool.len();
        pool.retain(|_, entry| entry.block_height_seen >= min_height);
        Ok((before - pool.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opnet_common::block::BlockHeader;

    fn header(height: u64, hash: Hash32) -> BlockHeader {
        BlockHeader {
            height,
            hash,
            previous_block_hash: Hash32::zero(),
            merkle_root: Hash32::zero(),
            time: 0,
            median_time: 0,
            size: 0,
            weight: 0,
            stripped_size: 0,
            bits: 0,
            nonce: 0,
            version: 1,
            tx_count: 0,
            previous_block_checksum: None,
            storage_root: None,
            receipt_root: None,
            checksum_root: None,
            checksum_proofs: None,
            ema: None,
            base_gas: None,
            gas_used: None,
        }
    }

    #[tokio::test]
    async fn add_then_fetch_by_height_and_hash() {
        let store = InMemoryStore::new();
        let hash = Hash32([7u8; 32]);
        let block = Block {
            header: header(5, hash),
            transactions: Vec::new(),
        };
        store.add_block(block).await.unwrap();

        assert_eq!(store.get_latest_block_number().await.unwrap(), Some(5));
        assert!(store.get_block_header(5).await.unwrap().is_some());
        assert!(store
            .get_block_header_by_hash(hash)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn revert_drops_all_in_flight_writes() {
        let store = InMemoryStore::new();
        let hash = Hash32([8u8; 32]);
        let block = Block {
            header: header(1, hash),
            transactions: Vec::new(),
        };
        store.add_block(block).await.unwrap();
        store.revert_block(1).await.unwrap();

        assert!(store.get_block_header(1).await.unwrap().is_none());
        assert!(store
            .get_block_header_by_hash(hash)
            .await
            .unwrap()
            .is_none());
    }
}

use thiserror::Error;

/// Storage-backend failures (§7 `StorageError`: block-level fatal, triggers
/// `revert_block`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("block {0} not found")]
    BlockNotFound(u64),
    #[error("{0}")]
    Custom(String),
}

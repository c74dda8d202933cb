use thiserror::Error;

/// Error kinds for the block pipeline (§7). Each variant has a distinct
/// propagation policy enforced by the caller (see `opnet-chain::pipeline`):
/// `Parse`/`Validation`/`ExecutionRevert`/`ExecutionPanic` let the block
/// continue, `BlockOutOfGas` stops admitting new transactions but still
/// signs the block, `BlockAborted`/`DataCorrupted`/`Storage` are block-level
/// fatal and trigger `revert_block`.
///
/// Mirrors the shape of `ethrex_blockchain::error::ChainError`: one flat
/// enum per subsystem, `#[from]` conversions from the crates it wraps.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed witness or opcode sequence: {0}")]
    Parse(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("execution reverted: {0}")]
    ExecutionRevert(String),
    #[error("execution panicked: {0}")]
    ExecutionPanic(String),
    #[error("block exceeded MAX_THEORETICAL_GAS")]
    BlockOutOfGas,
    #[error("block aborted: {0}")]
    BlockAborted(String),
    #[error("data corrupted: {0}")]
    DataCorrupted(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("block already processed")]
    AlreadyProcessed,
    #[error("invalid state transition: expected {expected}, found {found}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
}

/// Mempool admission failures (§7 `AdmissionRejected`). Kept separate from
/// [`CoreError`] because the propagation policy is different: these are
/// returned to the submitting client as a short reason string, never
/// surfaced as a block-level fault.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("consensus not yet active at this height")]
    ConsensusNotActive,
    #[error("node is not fully synchronized")]
    NotSynchronized,
    #[error("transaction exceeds the size cap for {0}")]
    TooLarge(&'static str),
    #[error("duplicate transaction")]
    Duplicate,
    #[error("base-layer RPC rejected the transaction: {0}")]
    RpcRejected(String),
    #[error("malformed transaction: {0}")]
    Malformed(String),
}

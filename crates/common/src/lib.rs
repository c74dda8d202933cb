//! Shared data model for the OP_NET block execution core.
//!
//! Mirrors the role `ethrex-common` plays for `ethrex`: every other crate in
//! the workspace depends on this one for the types that cross module
//! boundaries (blocks, transactions, receipts, addresses) so that no two
//! crates invent their own copy of the same struct.

pub mod address;
pub mod block;
pub mod constants;
pub mod error;
pub mod hash;
pub mod mempool;
pub mod receipt;
pub mod transaction;

pub use address::{CompressedPubKey33, XOnlyPubKey32};
pub use block::{Block, BlockHeader, BlockIdentity};
pub use error::{AdmissionError, CoreError};
pub use hash::Hash32;
pub use mempool::MempoolEntry;
pub use receipt::{Event, Receipt};
pub use transaction::{Transaction, TransactionType, TxInput, TxOutput};

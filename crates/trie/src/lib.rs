//! Commitment trees (C5): two independent sparse Merkle trees (storage,
//! receipts) and one fixed-shape checksum tree over block header fields.
//!
//! Grounded on `ethrex_common::merkle_tree` (commutative hashing over a
//! sorted leaf set) and `ethrex_trie::db` (the `TrieDB`-style storage
//! seam), generalized from Keccak256/RLP leaves to the OP_NET leaf shapes
//! of §3. The exact leaf hash function is an explicit Open Question in
//! spec.md §9; this implementation fixes it to `HASH256` (double SHA-256),
//! documented in `DESIGN.md`, since that is the hash already used
//! throughout the envelope format and keeps one hash primitive for the
//! whole chain.

pub mod checksum;
pub mod error;
pub mod sparse;

pub use checksum::ChecksumTree;
pub use error::TrieError;
pub use sparse::SparseCommitmentTree;

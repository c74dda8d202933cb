use opnet_common::hash::Hash32;

use crate::sparse::{merkle_proof, merkle_root};

/// Fixed 6-leaf Merkle tree over block header linkage fields (§3):
/// `[previous_block_hash, previous_block_checksum, current_hash,
/// base_merkle_root, storage_root, receipt_root]`.
///
/// Unlike [`crate::sparse::SparseCommitmentTree`] the shape never grows or
/// shrinks, so this is a thin wrapper rather than its own data structure —
/// it exists to keep the leaf ordering (which the header's `checksum_root`
/// is sensitive to, by §8) in exactly one place.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumTree {
    pub leaves: [Hash32; 6],
}

pub struct ChecksumLeaves {
    pub previous_block_hash: Hash32,
    pub previous_block_checksum: Hash32,
    pub current_hash: Hash32,
    pub base_merkle_root: Hash32,
    pub storage_root: Hash32,
    pub receipt_root: Hash32,
}

impl ChecksumTree {
    pub fn new(leaves: ChecksumLeaves) -> Self {
        Self {
            leaves: [
                leaves.previous_block_hash,
                leaves.previous_block_checksum,
                leaves.current_hash,
                leaves.base_merkle_root,
                leaves.storage_root,
                leaves.receipt_root,
            ],
        }
    }

    pub fn root(&self) -> Hash32 {
        merkle_root(&self.leaves)
    }

    /// One proof per leaf, in the same `[0..6)` order as `leaves`.
    pub fn proofs(&self) -> Vec<Vec<Hash32>> {
        (0..self.leaves.len())
            .map(|i| merkle_proof(&self.leaves, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: u8) -> Hash32 {
        Hash32([i; 32])
    }

    #[test]
    fn changing_any_leaf_changes_the_root() {
        let base = ChecksumTree::new(ChecksumLeaves {
            previous_block_hash: sample(1),
            previous_block_checksum: sample(2),
            current_hash: sample(3),
            base_merkle_root: sample(4),
            storage_root: sample(5),
            receipt_root: sample(6),
        });
        let base_root = base.root();

        let mutated = ChecksumTree::new(ChecksumLeaves {
            previous_block_hash: sample(1),
            previous_block_checksum: sample(2),
            current_hash: sample(3),
            base_merkle_root: sample(4),
            storage_root: sample(99),
            receipt_root: sample(6),
        });
        assert_ne!(base_root, mutated.root());
    }

    #[test]
    fn produces_six_proofs() {
        let tree = ChecksumTree::new(ChecksumLeaves {
            previous_block_hash: sample(1),
            previous_block_checksum: sample(2),
            current_hash: sample(3),
            base_merkle_root: sample(4),
            storage_root: sample(5),
            receipt_root: sample(6),
        });
        assert_eq!(tree.proofs().len(), 6);
    }
}

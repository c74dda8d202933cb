use std::collections::{BTreeMap, HashMap};

use opnet_common::address::XOnlyPubKey32;
use opnet_common::hash::Hash32;
use opnet_crypto::hash256;

/// A key half that can be deterministically serialized for hashing/ordering.
pub trait KeyBytes: Ord + Clone {
    fn key_bytes(&self) -> Vec<u8>;
}

impl KeyBytes for XOnlyPubKey32 {
    fn key_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl KeyBytes for Hash32 {
    fn key_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// A sparse Merkle commitment tree keyed by `(contract, slot)` (storage) or
/// `(contract, txid)` (receipts), per §3/§4.4.
///
/// The root and proofs are recomputed from the full sorted leaf set on
/// demand rather than maintained incrementally — `insert` is cheap and the
/// tree is rebuilt once per block at `sign_block` time, which keeps this
/// deterministic by construction: re-running `root()`/`proofs()` on an
/// identical leaf set always yields the identical result (§8).
#[derive(Debug, Clone, Default)]
pub struct SparseCommitmentTree<A: KeyBytes, B: KeyBytes> {
    leaves: BTreeMap<(A, B), Hash32>,
}

impl<A: KeyBytes, B: KeyBytes> SparseCommitmentTree<A, B> {
    pub fn new() -> Self {
        Self {
            leaves: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, contract: A, key: B, value: Hash32) {
        self.leaves.insert((contract, key), value);
    }

    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    fn leaf_hashes(&self) -> Vec<Hash32> {
        self.leaves
            .iter()
            .map(|((a, b), value)| {
                let mut buf = Vec::with_capacity(a.key_bytes().len() + b.key_bytes().len() + 32);
                buf.extend(a.key_bytes());
                buf.extend(b.key_bytes());
                buf.extend(value.as_bytes());
                Hash32(hash256(&buf))
            })
            .collect()
    }

    /// Root of the tree, or [`Hash32::zero`] if empty (§3: "Empty blocks use
    /// a canonical ZERO_HASH for storage and receipt roots").
    pub fn root(&self) -> Hash32 {
        merkle_root(&self.leaf_hashes())
    }

    /// Per-leaf Merkle proofs, grouped the way §3 describes:
    /// `map<contract, map<key, proof-path>>`.
    pub fn proofs(&self) -> HashMap<A, HashMap<B, Vec<Hash32>>> {
        let hashes = self.leaf_hashes();
        let mut out: HashMap<A, HashMap<B, Vec<Hash32>>> = HashMap::new();
        for (index, (a, b)) in self.leaves.keys().cloned().enumerate() {
            let proof = merkle_proof(&hashes, index);
            out.entry(a).or_default().insert(b, proof);
        }
        out
    }
}

/// Commutative-pairing Merkle root, grounded on
/// `ethrex_common::merkle_tree::compute_merkle_root` but using `HASH256`
/// instead of Keccak256 (see the crate-level doc comment for why).
pub fn merkle_root(hashes: &[Hash32]) -> Hash32 {
    match hashes {
        [] => Hash32::zero(),
        [single] => *single,
        _ => {
            let mut level: Vec<Hash32> = hashes.to_vec();
            while level.len() > 1 {
                level = next_level(&level);
            }
            level.first().copied().unwrap_or(Hash32::zero())
        }
    }
}

pub fn merkle_proof(hashes: &[Hash32], index: usize) -> Vec<Hash32> {
    if hashes.len() <= 1 {
        return Vec::new();
    }
    let mut level = hashes.to_vec();
    let mut proof = Vec::new();
    let mut idx = index;
    while level.len() > 1 {
        let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
        if let Some(sibling) = level.get(sibling_idx) {
            proof.push(*sibling);
        }
        level = next_level(&level);
        idx /= 2;
    }
    proof
}

fn next_level(level: &[Hash32]) -> Vec<Hash32> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        match pair {
            [left, right] => next.push(commutative_hash(left, right)),
            [single] => next.push(*single),
            _ => {}
        }
    }
    next
}

fn commutative_hash(a: &Hash32, b: &Hash32) -> Hash32 {
    let mut buf = [0u8; 64];
    if a.0 <= b.0 {
        buf[..32].copy_from_slice(&a.0);
        buf[32..].copy_from_slice(&b.0);
    } else {
        buf[..32].copy_from_slice(&b.0);
        buf[32..].copy_from_slice(&a.0);
    }
    Hash32(hash256(&buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_zero_root() {
        let tree: SparseCommitmentTree<XOnlyPubKey32, Hash32> = SparseCommitmentTree::new();
        assert_eq!(tree.root(), Hash32::zero());
        assert_eq!(tree.size(), 0);
    }

    #[test]
    fn single_leaf_insert_changes_root() {
        let mut tree: SparseCommitmentTree<XOnlyPubKey32, Hash32> = SparseCommitmentTree::new();
        let contract = XOnlyPubKey32([1u8; 32]);
        let slot = Hash32([2u8; 32]);
        let value = Hash32([3u8; 32]);
        tree.insert(contract, slot, value);
        assert_eq!(tree.size(), 1);
        assert_ne!(tree.root(), Hash32::zero());
    }

    #[test]
    fn root_is_deterministic_across_reruns() {
        let mut tree: SparseCommitmentTree<XOnlyPubKey32, Hash32> = SparseCommitmentTree::new();
        for i in 0..5u8 {
            tree.insert(
                XOnlyPubKey32([i; 32]),
                Hash32([i.wrapping_add(1); 32]),
                Hash32([i.wrapping_add(2); 32]),
            );
        }
        let root1 = tree.root();
        let root2 = tree.root();
        assert_eq!(root1, root2);
    }

    #[test]
    fn proofs_are_produced_per_contract_and_key() {
        let mut tree: SparseCommitmentTree<XOnlyPubKey32, Hash32> = SparseCommitmentTree::new();
        let contract = XOnlyPubKey32([9u8; 32]);
        let slot_a = Hash32([1u8; 32]);
        let slot_b = Hash32([2u8; 32]);
        tree.insert(contract, slot_a, Hash32([10u8; 32]));
        tree.insert(contract, slot_b, Hash32([20u8; 32]));

        let proofs = tree.proofs();
        let per_contract = proofs.get(&contract).expect("contract present");
        assert!(per_contract.contains_key(&slot_a));
        assert!(per_contract.contains_key(&slot_b));
        assert_eq!(per_contract[&slot_a].len(), 1);
    }
}

use serde::{Deserialize, Serialize};

use crate::address::XOnlyPubKey32;
use crate::hash::Hash32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub contract_address: XOnlyPubKey32,
    pub type_name: String,
    pub data: Vec<u8>,
}

/// A single storage write reported by the VM façade, keyed the same way the
/// storage Merkle tree keys its leaves (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageWrite {
    pub contract_address: XOnlyPubKey32,
    pub memory_slot_pointer: Hash32,
    pub value: Hash32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployedContract {
    pub address: XOnlyPubKey32,
    pub bytecode_hash: Hash32,
}

/// Per-transaction outcome of VM execution (§3).
///
/// Invariant: `revert_bytes.is_some()` implies `deployed_contracts.is_empty()`
/// — enforced by [`Receipt::new_success`]/[`Receipt::new_revert`] rather than
/// left to callers to remember.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub gas_used: u64,
    pub special_gas_used: u64,
    pub result_bytes: Option<Vec<u8>>,
    pub events: Vec<Event>,
    pub deployed_contracts: Vec<DeployedContract>,
    pub revert_bytes: Option<Vec<u8>>,
    pub storage_writes: Vec<StorageWrite>,
    pub access_list: Vec<XOnlyPubKey32>,
    pub loaded_storage: Vec<(XOnlyPubKey32, Hash32)>,
}

impl Receipt {
    #[allow(clippy::too_many_arguments)]
    pub fn new_success(
        gas_used: u64,
        special_gas_used: u64,
        result_bytes: Option<Vec<u8>>,
        events: Vec<Event>,
        deployed_contracts: Vec<DeployedContract>,
        storage_writes: Vec<StorageWrite>,
        access_list: Vec<XOnlyPubKey32>,
        loaded_storage: Vec<(XOnlyPubKey32, Hash32)>,
    ) -> Self {
        Self {
            gas_used,
            special_gas_used,
            result_bytes,
            events,
            deployed_contracts,
            revert_bytes: None,
            storage_writes,
            access_list,
            loaded_storage,
        }
    }

    pub fn new_revert(gas_used: u64, revert_bytes: Vec<u8>) -> Self {
        Self {
            gas_used,
            special_gas_used: 0,
            result_bytes: None,
            events: Vec::new(),
            deployed_contracts: Vec::new(),
            revert_bytes: Some(revert_bytes),
            storage_writes: Vec::new(),
            access_list: Vec::new(),
            loaded_storage: Vec::new(),
        }
    }

    pub fn is_reverted(&self) -> bool {
        self.revert_bytes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_receipt_has_no_deployed_contracts() {
        let receipt = Receipt::new_revert(100, b"E1".to_vec());
        assert!(receipt.is_reverted());
        assert!(receipt.deployed_contracts.is_empty());
    }
}

//! C6: VM façade. The pipeline treats contract execution as a black box
//! (§4.3, §1 "the contract VM internals... specified only by its inputs
//! and observable outputs") — this module only defines the contract
//! boundary, mirroring the way `ethrex_blockchain` programs against
//! `levm`/`revm` through a narrow `VM` trait rather than embedding an
//! interpreter.

use std::collections::HashMap;

use async_trait::async_trait;
use opnet_common::{CoreError, Event, Hash32, Receipt, Transaction, XOnlyPubKey32};

/// Inputs the façade needs beyond the transaction itself (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    pub block_hash: Hash32,
    pub height: u64,
    pub median_time: u32,
    pub prev_base_gas: i64,
    pub is_simulation: bool,
}

/// A deployed contract record, as returned by a successful execution.
#[derive(Debug, Clone)]
pub struct DeployedContract {
    pub address: XOnlyPubKey32,
    pub bytecode_hash: Hash32,
}

/// A single storage mutation produced by execution.
#[derive(Debug, Clone)]
pub struct StorageWrite {
    pub contract_address: XOnlyPubKey32,
    pub memory_slot_pointer: Hash32,
    pub value: Hash32,
}

/// The full result of evaluating one transaction (§4.3). `None` stands in
/// for the façade's "null evaluation" on panic: the pipeline still calls
/// `update_block_values_from_result` with `force_storage_check_disabled`
/// set so the storage trees treat the transaction as absent.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub gas_used: u64,
    pub special_gas_used: u64,
    pub result_bytes: Option<Vec<u8>>,
    pub events: HashMap<XOnlyPubKey32, Vec<Event>>,
    pub deployed_contracts: Vec<DeployedContract>,
    pub revert_bytes: Option<Vec<u8>>,
    pub storage_writes: Vec<StorageWrite>,
    pub access_list: Vec<XOnlyPubKey32>,
    pub loaded_storage: Vec<(XOnlyPubKey32, Hash32)>,
    pub transaction_id: Option<Hash32>,
}

impl Evaluation {
    pub fn is_reverted(&self) -> bool {
        self.revert_bytes.is_some()
    }

    /// Builds the receipt the pipeline stores; callers decide separately
    /// whether to also apply `storage_writes` to the storage tree.
    pub fn into_receipt(self) -> Receipt {
        if let Some(revert_bytes) = self.revert_bytes {
            return Receipt::new_revert(self.gas_used, revert_bytes);
        }
        Receipt::new_success(
            self.gas_used,
            self.special_gas_used,
            self.result_bytes,
            self.events.into_values().flatten().collect(),
            self.deployed_contracts
                .into_iter()
                .map(|c| opnet_common::receipt::DeployedContract {
                    address: c.address,
                    bytecode_hash: c.bytecode_hash,
                })
                .collect(),
            self.storage_writes
                .into_iter()
                .map(|w| opnet_common::receipt::StorageWrite {
                    contract_address: w.contract_address,
                    memory_slot_pointer: w.memory_slot_pointer,
                    value: w.value,
                })
                .collect(),
            self.access_list,
            self.loaded_storage,
        )
    }
}

/// Object-safe async seam the pipeline calls into per transaction.
/// Production wiring supplies a real interpreter; tests supply a stub
/// that returns canned evaluations.
#[async_trait]
pub trait VmFacade: Send + Sync {
    async fn evaluate(
        &self,
        ctx: ExecutionContext,
        transaction: &Transaction,
    ) -> Result<Evaluation, CoreError>;

    /// Drops any state staged for `block_hash` (§4.1 `revert_block`).
    async fn revert_block(&self, block_hash: Hash32) -> Result<(), CoreError>;
}

#[cfg(test)]
pub mod stub {
    use super::*;
    use std::sync::Mutex;

    /// A façade whose responses are queued up front, for pipeline tests.
    #[derive(Default)]
    pub struct StubVm {
        responses: Mutex<Vec<Result<Evaluation, CoreError>>>,
    }

    impl StubVm {
        pub fn with_responses(responses: Vec<Result<Evaluation, CoreError>>) -> Self {
            let mut reversed = responses;
            reversed.reverse();
            Self {
                responses: Mutex::new(reversed),
            }
        }
    }

    #[async_trait]
    impl VmFacade for StubVm {
        async fn evaluate(
            &self,
            _ctx: ExecutionContext,
            _transaction: &Transaction,
        ) -> Result<Evaluation, CoreError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(CoreError::ExecutionPanic("no stubbed response".into())))
        }

        async fn revert_block(&self, _block_hash: Hash32) -> Result<(), CoreError> {
            Ok(())
        }
    }

    pub fn empty_success(gas_used: u64) -> Evaluation {
        Evaluation {
            gas_used,
            special_gas_used: 0,
            result_bytes: None,
            events: HashMap::new(),
            deployed_contracts: Vec::new(),
            revert_bytes: None,
            storage_writes: Vec::new(),
            access_list: Vec::new(),
            loaded_storage: Vec::new(),
            transaction_id: None,
        }
    }
}

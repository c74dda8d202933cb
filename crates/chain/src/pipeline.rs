//! C7: block pipeline. Orders transactions, drives C2/C3/C6 per
//! transaction, accumulates gas, invokes C5/C4, signs the block, and
//! persists via the [`Store`] seam (§4.1).
//!
//! Mirrors `ethrex_blockchain`'s `add_block` shape: a single state machine
//! per block, fatal errors trigger an explicit revert path rather than
//! leaving partial writes behind.

use std::sync::atomic::{AtomicU64, Ordering};

use opnet_common::constants::MAX_THEORETICAL_GAS;
use opnet_common::{
    BlockHeader, CoreError, Hash32, Transaction, TransactionType, TxInput, TxOutput,
    XOnlyPubKey32,
};
use opnet_consensus::ConsensusView;
use opnet_storage::Store;
use opnet_trie::{ChecksumLeaves, ChecksumTree, SparseCommitmentTree};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::envelope::classify;
use crate::verify::verify;
use crate::vm::{Evaluation, ExecutionContext, VmFacade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Fresh,
    Deserialized,
    Executed,
    Signed,
    Finalized,
    Reverted,
}

/// A transaction exactly as observed in the base-layer block, before
/// classification. `original_index` is its position in that raw block.
#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub txid: Hash32,
    pub original_index: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub raw: Vec<u8>,
    pub priority_fee_sat: u64,
}

/// The block pipeline (§4.1). Owns exactly one block's worth of state;
/// two instances must never share a storage backend concurrently (§5).
pub struct BlockPipeline {
    header: BlockHeader,
    consensus: ConsensusView,
    abort: CancellationToken,
    process_all_as_generic: bool,
    state: BlockState,
    transactions_set: bool,
    transactions: Vec<Transaction>,
    storage_tree: SparseCommitmentTree<XOnlyPubKey32, Hash32>,
    receipt_tree: SparseCommitmentTree<XOnlyPubKey32, Hash32>,
    gas_used: AtomicU64,
}

impl BlockPipeline {
    pub fn new(
        header: BlockHeader,
        consensus: ConsensusView,
        abort: CancellationToken,
        process_all_as_generic: bool,
    ) -> Self {
        Self {
            header,
            consensus,
            abort,
            process_all_as_generic,
            state: BlockState::Fresh,
            transactions_set: false,
            transactions: Vec::new(),
            storage_tree: SparseCommitmentTree::new(),
            receipt_tree: SparseCommitmentTree::new(),
            gas_used: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn txids(&self) -> Vec<Hash32> {
        self.transactions.iter().map(|tx| tx.txid).collect()
    }

    fn check_cancelled(&self) -> Result<(), CoreError> {
        if self.abort.is_cancelled() {
            return Err(CoreError::BlockAborted(
                "abort signal set at suspension point".into(),
            ));
        }
        Ok(())
    }

    /// Classifies and verifies each raw transaction (§4.2). Idempotent:
    /// a second call fails with `AlreadyProcessed`.
    #[instrument(skip(self, raw_transactions), fields(height = self.header.height))]
    pub fn set_raw_transactions(
        &mut self,
        raw_transactions: Vec<RawTransaction>,
    ) -> Result<(), CoreError> {
        if self.transactions_set {
            return Err(CoreError::AlreadyProcessed);
        }

        self.transactions = raw_transactions
            .into_iter()
            .map(|raw| self.classify_one(raw))
            .collect();
        self.transactions_set = true;
        Ok(())
    }

    fn classify_one(&self, raw: RawTransaction) -> Transaction {
        let is_coinbase = raw
            .inputs
            .first()
            .is_some_and(|input| input.prev_txid.is_none());

        if self.process_all_as_generic || is_coinbase {
            return generic_transaction(raw);
        }

        let matched = raw
            .inputs
            .iter()
            .find_map(|input| classify(&input.witness).ok());

        let Some(captures) = matched else {
            return generic_transaction(raw);
        };

        let kind = captures.kind;
        let captures_for_failure = captures.clone();
        match verify(captures, &raw.inputs, &raw.outputs, raw.priority_fee_sat, &self.consensus) {
            Ok(protocol) => Transaction {
                txid: raw.txid,
                hash: raw.txid,
                block_height: self.header.height,
                block_hash: self.header.hash,
                index: 0,
                original_index: raw.original_index,
                inputs: raw.inputs,
                outputs: raw.outputs,
                raw: raw.raw,
                kind,
                protocol: Some(protocol),
            },
            Err(error) => {
                warn!(%error, "protocol transaction failed validation, marking reverted");
                Transaction {
                    txid: raw.txid,
                    hash: raw.txid,
                    block_height: self.header.height,
                    block_hash: self.header.hash,
                    index: 0,
                    original_index: raw.original_index,
                    inputs: raw.inputs,
                    outputs: raw.outputs,
                    raw: raw.raw,
                    kind,
                    protocol: Some(crate::verify::validation_failed_placeholder(
                        &captures_for_failure,
                        &error,
                    )),
                }
            }
        }
    }

    /// Computes canonical ordering (§4.1 "Ordering"). `explicit_order`
    /// (reorg replay) pins an exact txid sequence; otherwise protocol
    /// transactions sort before generic ones, stable by original index
    /// within each bucket.
    pub fn deserialize(
        &mut self,
        explicit_order: Option<&[Hash32]>,
    ) -> Result<(), CoreError> {
        if self.state != BlockState::Fresh {
            return Err(CoreError::InvalidState {
                expected: "Fresh",
                found: state_name(self.state),
            });
        }
        if !self.transactions_set {
            return Err(CoreError::InvalidState {
                expected: "transactions set",
                found: "no transactions",
            });
        }

        if let Some(order) = explicit_order {
            self.transactions.sort_by_key(|tx| {
                order
                    .iter()
                    .position(|txid| *txid == tx.txid)
                    .unwrap_or(usize::MAX)
            });
        } else {
            self.transactions.sort_by_key(|tx| {
                let priority_bucket = if tx.is_protocol() { 0 } else { 1 };
                (priority_bucket, tx.original_index)
            });
        }

        for (index, tx) in self.transactions.iter_mut().enumerate() {
            tx.index = index as u32;
        }

        self.state = BlockState::Deserialized;
        Ok(())
    }

    /// Runs every transaction, accumulates gas, and builds commitments
    /// (§4.1 "Gas accounting", "Commitments"). Generic transactions need no
    /// further work here — they're already carried in `self.transactions`
    /// and persisted wholesale by `finalize`'s `add_block` call; protocol
    /// transactions run sequentially through `vm`.
    #[instrument(skip(self, vm, store), fields(height = self.header.height))]
    pub async fn execute(
        &mut self,
        vm: &dyn VmFacade,
        store: &dyn Store,
    ) -> Result<bool, CoreError> {
        if self.state != BlockState::Deserialized {
            return Err(CoreError::InvalidState {
                expected: "Deserialized",
                found: state_name(self.state),
            });
        }

        let mut out_of_gas = false;
        let indices: Vec<usize> = (0..self.transactions.len()).collect();

        for index in indices {
            self.check_cancelled()?;

            if out_of_gas {
                continue;
            }

            let is_protocol = self.transactions[index].is_protocol();
            if !is_protocol {
                continue;
            }

            self.run_protocol_transaction(index, vm).await?;

            if self.gas_used.load(Ordering::SeqCst) > MAX_THEORETICAL_GAS {
                out_of_gas = true;
                warn!(height = self.header.height, "block exceeded MAX_THEORETICAL_GAS");
            }
        }

        self.state = BlockState::Executed;
        self.sign_block(store).await?;
        Ok(true)
    }

    async fn run_protocol_transaction(
        &mut self,
        index: usize,
        vm: &dyn VmFacade,
    ) -> Result<(), CoreError> {
        let ctx = ExecutionContext {
            block_hash: self.header.hash,
            height: self.header.height,
            median_time: self.header.median_time,
            prev_base_gas: self.header.base_gas.unwrap_or(0),
            is_simulation: false,
        };

        let txid = self.transactions[index].txid;
        let evaluation = vm.evaluate(ctx, &self.transactions[index]).await;

        let receipt_hash = match evaluation {
            Ok(eval) => self.apply_successful_evaluation(index, eval),
            Err(CoreError::ExecutionPanic(reason)) | Err(CoreError::ExecutionRevert(reason)) => {
                self.gas_used
                    .fetch_add(opnet_common::constants::PANIC_GAS_COST, Ordering::SeqCst);
                if let Some(protocol) = self.transactions[index].protocol_mut() {
                    protocol.revert = Some(reason.clone().into_bytes());
                }
                Hash32(opnet_crypto::hash256(reason.as_bytes()))
            }
            Err(other) => return Err(other),
        };

        self.receipt_tree.insert(
            self.transactions[index]
                .protocol()
                .map(|p| p.from_tweaked)
                .unwrap_or(XOnlyPubKey32([0u8; 32])),
            txid,
            receipt_hash,
        );
        Ok(())
    }

    fn apply_successful_evaluation(&mut self, index: usize, evaluation: Evaluation) -> Hash32 {
        self.gas_used
            .fetch_add(evaluation.gas_used, Ordering::SeqCst);

        if !evaluation.is_reverted() {
            for write in &evaluation.storage_writes {
                self.storage_tree.insert(
                    write.contract_address,
                    write.memory_slot_pointer,
                    write.value,
                );
            }
        }

        let receipt_bytes = evaluation
            .result_bytes
            .clone()
            .or_else(|| evaluation.revert_bytes.clone())
            .unwrap_or_default();
        let receipt_hash = Hash32(opnet_crypto::hash256(&receipt_bytes));

        if let Some(protocol) = self.transactions[index].protocol_mut() {
            protocol.receipt = Some(evaluation.into_receipt());
        }

        receipt_hash
    }

    /// §4.1 "Commitments": storage/receipt roots, then the 6-leaf checksum
    /// tree over inter-block linkage, fetching the previous block's
    /// checksum (fatal `DataCorrupted` if missing past genesis).
    async fn sign_block(&mut self, store: &dyn Store) -> Result<(), CoreError> {
        let storage_root = self.storage_tree.root();
        let receipt_root = self.receipt_tree.root();

        let (previous_checksum, previous_hash) = if self.header.height == 0 {
            (Hash32::zero(), Hash32::zero())
        } else {
            let previous = store
                .get_block_header(self.header.height - 1)
                .await
                .map_err(|e| CoreError::Storage(e.to_string()))?
                .ok_or_else(|| {
                    CoreError::DataCorrupted(format!(
                        "missing header for height {}",
                        self.header.height - 1
                    ))
                })?;
            let checksum = previous.checksum_root.ok_or_else(|| {
                CoreError::DataCorrupted("previous block has no checksum_root".into())
            })?;
            (checksum, previous.hash)
        };

        let gas_used = self.gas_used.load(Ordering::SeqCst);
        let prev_base_gas = self
            .header
            .base_gas
            .unwrap_or_else(|| opnet_consensus::gas::default_base_gas(&self.consensus.gas));
        let prev_ema = self.header.ema.unwrap_or(self.consensus.gas.u_target);
        let gas_state = opnet_consensus::predict_next_base_gas(
            &self.consensus.gas,
            prev_base_gas,
            prev_ema,
            gas_used,
        );

        let checksum_tree = ChecksumTree::new(ChecksumLeaves {
            previous_block_hash: previous_hash,
            previous_block_checksum: previous_checksum,
            current_hash: self.header.hash,
            base_merkle_root: self.header.merkle_root,
            storage_root,
            receipt_root,
        });

        self.header.storage_root = Some(storage_root);
        self.header.receipt_root = Some(receipt_root);
        self.header.checksum_root = Some(checksum_tree.root());
        self.header.checksum_proofs = Some(checksum_tree.proofs());
        self.header.previous_block_checksum = Some(previous_checksum);
        self.header.ema = Some(gas_state.ema_next);
        self.header.base_gas = Some(gas_state.base_gas_next);
        self.header.gas_used = Some(gas_used as i64);

        self.state = BlockState::Signed;
        info!(height = self.header.height, gas_used, "block signed");
        Ok(())
    }

    /// Persists the signed block (§4.1 "finalize").
    #[instrument(skip(self, store), fields(height = self.header.height))]
    pub async fn finalize(&mut self, store: &dyn Store) -> Result<bool, CoreError> {
        if self.state != BlockState::Signed {
            return Err(CoreError::InvalidState {
                expected: "Signed",
                found: state_name(self.state),
            });
        }

        let block = opnet_common::Block {
            header: self.header.clone(),
            transactions: self.transactions.clone(),
        };
        store
            .add_block(block)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;

        self.state = BlockState::Finalized;
        Ok(true)
    }

    /// Tells `vm` to drop any staged state and marks the block terminally
    /// reverted (§4.1).
    pub async fn revert_block(&mut self, vm: &dyn VmFacade) -> Result<(), CoreError> {
        vm.revert_block(self.header.hash).await?;
        self.state = BlockState::Reverted;
        Ok(())
    }
}

fn generic_transaction(raw: RawTransaction) -> Transaction {
    Transaction {
        txid: raw.txid,
        hash: raw.txid,
        block_height: 0,
        block_hash: Hash32::zero(),
        index: 0,
        original_index: raw.original_index,
        inputs: raw.inputs,
        outputs: raw.outputs,
        raw: raw.raw,
        kind: TransactionType::Generic,
        protocol: None,
    }
}

fn state_name(state: BlockState) -> &'static str {
    match state {
        BlockState::Fresh => "Fresh",
        BlockState::Deserialized => "Deserialized",
        BlockState::Executed => "Executed",
        BlockState::Signed => "Signed",
        BlockState::Finalized => "Finalized",
        BlockState::Reverted => "Reverted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opnet_common::transaction::{ProtocolData, ProtocolPayload};
    use opnet_common::CompressedPubKey33;
    use opnet_storage::InMemoryStore;
    use crate::vm::stub::{empty_success, StubVm};
    use crate::vm::{Evaluation, StorageWrite};

    fn header(height: u64) -> BlockHeader {
        BlockHeader {
            height,
            hash: Hash32([height as u8 + 1; 32]),
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

    fn generic_raw(index: u32) -> RawTransaction {
        RawTransaction {
            txid: Hash32([index as u8 + 10; 32]),
            original_index: index,
            inputs: vec![TxInput {
                prev_txid: Some(Hash32([1u8; 32])),
                prev_index: 0,
                witness: vec![],
            }],
            outputs: vec![],
            raw: vec![index as u8],
            priority_fee_sat: 0,
        }
    }

    #[tokio::test]
    async fn empty_block_signs_with_zero_roots() {
        let store = InMemoryStore::new();
        let consensus = ConsensusView::default();
        let mut block = BlockPipeline::new(header(0), consensus, CancellationToken::new(), false);
        block.set_raw_transactions(vec![]).unwrap();
        block.deserialize(None).unwrap();

        let vm = StubVm::with_responses(vec![]);
        block.execute(&vm, &store).await.unwrap();
        block.finalize(&store).await.unwrap();

        assert_eq!(block.state(), BlockState::Finalized);
        assert_eq!(block.header().storage_root, Some(Hash32::zero()));
        assert_eq!(block.header().receipt_root, Some(Hash32::zero()));
        assert_eq!(block.header().gas_used, Some(0));
    }

    #[tokio::test]
    async fn second_set_raw_transactions_fails() {
        let consensus = ConsensusView::default();
        let mut block = BlockPipeline::new(header(0), consensus, CancellationToken::new(), false);
        block.set_raw_transactions(vec![generic_raw(0)]).unwrap();
        assert!(matches!(
            block.set_raw_transactions(vec![]),
            Err(CoreError::AlreadyProcessed)
        ));
    }

    #[tokio::test]
    async fn abort_before_execute_is_observed() {
        let store = InMemoryStore::new();
        let consensus = ConsensusView::default();
        let abort = CancellationToken::new();
        let mut block = BlockPipeline::new(header(0), consensus, abort.clone(), false);
        block.set_raw_transactions(vec![generic_raw(0)]).unwrap();
        block.deserialize(None).unwrap();
        abort.cancel();

        let vm = StubVm::with_responses(vec![]);
        let result = block.execute(&vm, &store).await;
        assert!(matches!(result, Err(CoreError::BlockAborted(_))));
    }

    #[tokio::test]
    async fn generic_only_block_still_signs() {
        let store = InMemoryStore::new();
        let consensus = ConsensusView::default();
        let mut block = BlockPipeline::new(header(0), consensus, CancellationToken::new(), true);
        block
            .set_raw_transactions(vec![generic_raw(0), generic_raw(1)])
            .unwrap();
        block.deserialize(None).unwrap();

        let vm = StubVm::with_responses(vec![Ok(empty_success(0))]);
        block.execute(&vm, &store).await.unwrap();
        assert_eq!(block.state(), BlockState::Executed);
    }

    fn protocol_tx(index: u32) -> Transaction {
        Transaction {
            txid: Hash32([index as u8 + 20; 32]),
            hash: Hash32([index as u8 + 20; 32]),
            block_height: 0,
            block_hash: Hash32::zero(),
            index: 0,
            original_index: index,
            inputs: vec![],
            outputs: vec![],
            raw: vec![],
            kind: TransactionType::Deployment,
            protocol: Some(ProtocolData {
                from_tweaked: XOnlyPubKey32([1u8; 32]),
                from_legacy: CompressedPubKey33([2u8; 33]),
                payload: ProtocolPayload::Deployment { bytecode: vec![1] },
                calldata: vec![],
                preimage: vec![],
                miner_pubkey: CompressedPubKey33([3u8; 33]),
                priority_fee_sat: 0,
                gas_sat_fee: 0,
                burned_fee: 330,
                reward: 0,
                receipt: None,
                revert: None,
            }),
        }
    }

    /// Builds a pipeline already past classification, so tests can drive
    /// `execute` against hand-picked stubbed evaluations without needing a
    /// real witness/control-block fixture.
    fn pipeline_with_transactions(transactions: Vec<Transaction>) -> BlockPipeline {
        let consensus = ConsensusView::default();
        let mut block = BlockPipeline::new(header(0), consensus, CancellationToken::new(), false);
        block.transactions = transactions;
        block.transactions_set = true;
        block.state = BlockState::Deserialized;
        block
    }

    /// Seed scenario 3 (§8): a VM façade that legitimately returns
    /// `storage_writes` alongside a reverted evaluation must not see those
    /// writes land in the storage tree.
    #[tokio::test]
    async fn reverted_evaluation_does_not_apply_storage_writes() {
        let store = InMemoryStore::new();
        let mut block = pipeline_with_transactions(vec![protocol_tx(0)]);

        let reverted = Evaluation {
            gas_used: 100,
            special_gas_used: 0,
            result_bytes: None,
            events: std::collections::HashMap::new(),
            deployed_contracts: vec![],
            revert_bytes: Some(b"reverted".to_vec()),
            storage_writes: vec![StorageWrite {
                contract_address: XOnlyPubKey32([1u8; 32]),
                memory_slot_pointer: Hash32([2u8; 32]),
                value: Hash32([3u8; 32]),
            }],
            access_list: vec![],
            loaded_storage: vec![],
            transaction_id: None,
        };
        let vm = StubVm::with_responses(vec![Ok(reverted)]);

        block.execute(&vm, &store).await.unwrap();

        assert!(block.storage_tree.is_empty());
    }

    /// Seed scenario 4 (§8): a façade panic charges the flat panic gas cost,
    /// marks the transaction reverted, and lets the block keep signing.
    #[tokio::test]
    async fn execution_panic_charges_gas_and_marks_revert() {
        let store = InMemoryStore::new();
        let mut block = pipeline_with_transactions(vec![protocol_tx(0)]);
        let vm = StubVm::with_responses(vec![Err(CoreError::ExecutionPanic("boom".into()))]);

        block.execute(&vm, &store).await.unwrap();

        assert_eq!(
            block.gas_used.load(Ordering::SeqCst),
            opnet_common::constants::PANIC_GAS_COST
        );
        assert_eq!(
            block.transactions[0].protocol().unwrap().revert,
            Some(b"boom".to_vec())
        );
    }

    /// A façade-reported `ExecutionRevert` is a per-transaction outcome like
    /// `ExecutionPanic`, not a block-level fault — the block keeps signing
    /// and later transactions still run.
    #[tokio::test]
    async fn execution_revert_error_continues_block_and_marks_revert() {
        let store = InMemoryStore::new();
        let mut block = pipeline_with_transactions(vec![protocol_tx(0), protocol_tx(1)]);
        let vm = StubVm::with_responses(vec![
            Err(CoreError::ExecutionRevert("insufficient balance".into())),
            Ok(empty_success(10)),
        ]);

        let result = block.execute(&vm, &store).await;

        assert!(result.is_ok());
        assert_eq!(
            block.transactions[0].protocol().unwrap().revert,
            Some(b"insufficient balance".to_vec())
        );
        assert_eq!(
            block.gas_used.load(Ordering::SeqCst),
            opnet_common::constants::PANIC_GAS_COST + 10
        );
    }
}

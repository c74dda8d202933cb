//! C8: mempool admission pipeline (§4.6). `submit` runs the six checks in
//! order and stops at the first rejection; nothing past that point runs,
//! mirroring the "reject early, never partially admit" shape the block
//! pipeline uses for classification.

use std::sync::Arc;

use opnet_common::constants::{MAX_PSBT_SIZE_BYTES, MAX_RAW_TX_SIZE_BYTES};
use opnet_common::mempool::MempoolEntry;
use opnet_common::{AdmissionError, Hash32};
use opnet_consensus::ConsensusView;
use opnet_storage::Store;
use tracing::info;

use crate::broadcast::RpcBroadcaster;
use crate::parse::parse_structural;

/// Result of a successful `submit` (§4.6 `{success, reason?, id}` minus the
/// `success` discriminant, which the `Result` itself carries).
#[derive(Debug, Clone)]
pub struct AdmissionOutcome {
    pub id: Hash32,
    pub base_layer_txid: String,
}

/// Owns the dependencies `submit` needs: the repository, the consensus
/// view (for the active-height and synchronization gates), and the
/// base-layer RPC seam.
pub struct MempoolAdmission {
    store: Arc<dyn Store>,
    consensus: ConsensusView,
    broadcaster: Arc<dyn RpcBroadcaster>,
    fully_synchronized: bool,
}

impl MempoolAdmission {
    pub fn new(
        store: Arc<dyn Store>,
        consensus: ConsensusView,
        broadcaster: Arc<dyn RpcBroadcaster>,
        fully_synchronized: bool,
    ) -> Self {
        Self {
            store,
            consensus,
            broadcaster,
            fully_synchronized,
        }
    }

    /// Flips the synchronization gate (checked in step 2). Expected to be
    /// driven by whatever component tracks base-layer sync status.
    pub fn set_fully_synchronized(&mut self, synchronized: bool) {
        self.fully_synchronized = synchronized;
    }

    #[tracing::instrument(skip(self, raw_bytes))]
    pub async fn submit(
        &self,
        raw_bytes: Vec<u8>,
        is_psbt: bool,
    ) -> Result<AdmissionOutcome, AdmissionError> {
        if !self.consensus.is_active() {
            return Err(AdmissionError::ConsensusNotActive);
        }
        if !self.fully_synchronized {
            return Err(AdmissionError::NotSynchronized);
        }

        let cap = if is_psbt {
            MAX_PSBT_SIZE_BYTES
        } else {
            MAX_RAW_TX_SIZE_BYTES
        };
        if raw_bytes.len() > cap {
            return Err(AdmissionError::TooLarge(if is_psbt { "psbt" } else { "raw" }));
        }

        let parsed = parse_structural(&raw_bytes)
            .ok_or_else(|| AdmissionError::Malformed("transaction did not decode".into()))?;

        if self
            .store
            .contains_mempool_entry(parsed.txid)
            .await
            .map_err(|e| AdmissionError::Malformed(e.to_string()))?
        {
            return Err(AdmissionError::Duplicate);
        }

        let raw_hex = hex::encode(&raw_bytes);
        let base_layer_txid = self
            .broadcaster
            .broadcast_raw_transaction(&raw_hex)
            .await
            .map_err(|e| AdmissionError::RpcRejected(e.to_string()))?;

        let height = self.consensus.block_height();
        let entry = MempoolEntry {
            id: parsed.txid,
            raw_bytes,
            psbt: is_psbt,
            first_seen: height,
            block_height_seen: height,
            inputs: parsed.inputs,
            outputs: parsed.outputs,
            priority_fee: 0,
            theoretical_gas_limit: 0,
            is_op_net: parsed.is_op_net,
        };
        self.store
            .add_mempool_entry(entry)
            .await
            .map_err(|e| AdmissionError::Malformed(e.to_string()))?;

        info!(txid = %parsed.txid, "admitted transaction to mempool");
        Ok(AdmissionOutcome {
            id: parsed.txid,
            base_layer_txid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::stub::StubBroadcaster;
    use opnet_consensus::ConsensusView;
    use opnet_storage::InMemoryStore;

    fn dummy_raw_tx() -> Vec<u8> {
        // Minimal valid non-segwit transaction: version, 0 inputs is
        // actually ambiguous with segwit marker, so use 1 dummy input/output.
        bitcoin::consensus::serialize(&bitcoin::Transaction {
            version: bitcoin::transaction::Version::non_standard(2),
            lock_time: bitcoin::absolute::LockTime::ZERO,
            input: vec![bitcoin::TxIn {
                previous_output: bitcoin::OutPoint::null(),
                script_sig: bitcoin::ScriptBuf::new(),
                sequence: bitcoin::Sequence::MAX,
                witness: bitcoin::Witness::new(),
            }],
            output: vec![bitcoin::TxOut {
                value: bitcoin::Amount::from_sat(1000),
                script_pubkey: bitcoin::ScriptBuf::new(),
            }],
        })
    }

    #[tokio::test]
    async fn rejects_when_consensus_not_active() {
        let consensus = ConsensusView::new(
            opnet_consensus::GasParams::default(),
            1024,
            1024,
            1024,
            100,
            1,
            16,
            1_000_000,
        );
        let admission = MempoolAdmission::new(
            Arc::new(InMemoryStore::new()),
            consensus,
            Arc::new(StubBroadcaster::default()),
            true,
        );
        let result = admission.submit(dummy_raw_tx(), false).await;
        assert!(matches!(result, Err(AdmissionError::ConsensusNotActive)));
    }

    #[tokio::test]
    async fn admits_well_formed_transaction() {
        let consensus = ConsensusView::default();
        let admission = MempoolAdmission::new(
            Arc::new(InMemoryStore::new()),
            consensus,
            Arc::new(StubBroadcaster::default()),
            true,
        );
        let outcome = admission.submit(dummy_raw_tx(), false).await.unwrap();
        assert_eq!(outcome.base_layer_txid, "stub-txid");
    }

    #[tokio::test]
    async fn rejects_oversized_raw_transaction() {
        let consensus = ConsensusView::default();
        let admission = MempoolAdmission::new(
            Arc::new(InMemoryStore::new()),
            consensus,
            Arc::new(StubBroadcaster::default()),
            true,
        );
        let oversized = vec![0u8; MAX_RAW_TX_SIZE_BYTES + 1];
        let result = admission.submit(oversized, false).await;
        assert!(matches!(result, Err(AdmissionError::TooLarge("raw"))));
    }
}

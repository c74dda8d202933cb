//! Concrete [`RequestHandler`]: wires the handful of opcodes this binary
//! can answer from the pieces built here (the store, the mempool, the live
//! fee estimate) straight through. Everything else — the indexer reads and
//! VM `Call` execution that a full node would serve — is business logic
//! this core doesn't own, so it comes back as `BadRequest`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use opnet_common::AdmissionError;
use opnet_consensus::ConsensusView;
use opnet_mempool::{FeeEstimate, MempoolAdmission};
use opnet_rpc::{HandlerError, Opcode, RequestHandler};
use opnet_storage::Store;

pub struct NodeRequestHandler {
    pub store: Arc<dyn Store>,
    pub consensus: ConsensusView,
    pub mempool: Arc<MempoolAdmission>,
    pub fee_estimate: Arc<FeeEstimate>,
}

#[async_trait]
impl RequestHandler for NodeRequestHandler {
    async fn handle(
        &self,
        opcode: Opcode,
        _client_id: [u8; 16],
        payload: Bytes,
    ) -> Result<Bytes, HandlerError> {
        match opcode {
            Opcode::GetBlockNumber => {
                let height = self
                    .store
                    .get_latest_block_number()
                    .await
                    .map_err(|error| HandlerError::Internal(error.to_string()))?
                    .unwrap_or(0);
                Ok(Bytes::from(height.to_le_bytes().to_vec()))
            }
            Opcode::GetChainId => Ok(Bytes::from(0u32.to_le_bytes().to_vec())),
            Opcode::GetGas => Ok(Bytes::from(self.fee_estimate.get().to_le_bytes().to_vec())),
            Opcode::BroadcastTransaction => {
                let is_psbt = payload.first().copied().unwrap_or(0) == 1;
                let raw_bytes = payload.get(1..).unwrap_or_default().to_vec();
                match self.mempool.submit(raw_bytes, is_psbt).await {
                    Ok(outcome) => Ok(Bytes::from(outcome.id.0.to_vec())),
                    Err(AdmissionError::ConsensusNotActive) => {
                        Err(HandlerError::BadRequest("consensus not active".into()))
                    }
                    Err(AdmissionError::NotSynchronized) => {
                        Err(HandlerError::BadRequest("node not fully synchronized".into()))
                    }
                    Err(AdmissionError::TooLarge(kind)) => {
                        Err(HandlerError::BadRequest(format!("{kind} transaction too large")))
                    }
                    Err(AdmissionError::Duplicate) => {
                        Err(HandlerError::BadRequest("duplicate transaction".into()))
                    }
                    Err(AdmissionError::Malformed(reason)) => {
                        Err(HandlerError::BadRequest(format!("malformed transaction: {reason}")))
                    }
                    Err(AdmissionError::RpcRejected(reason)) => {
                        Err(HandlerError::BadRequest(format!("rejected by base layer: {reason}")))
                    }
                }
            }
            other => Err(HandlerError::BadRequest(format!(
                "{other:?} is not served by this node"
            ))),
        }
    }
}

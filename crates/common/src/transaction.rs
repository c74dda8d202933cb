use serde::{Deserialize, Serialize};

use crate::address::{CompressedPubKey33, XOnlyPubKey32};
use crate::hash::Hash32;
use crate::receipt::Receipt;

/// Classification a transaction is tagged with (§3). A plain sum type, not
/// runtime reflection, per the design note on "dynamic classification over
/// variants" — the classifier in `opnet-chain` returns `Option<ProtocolData>`
/// and the pipeline matches on `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Generic,
    Deployment,
    Interaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    /// `None` only for a coinbase input (input 0 with no previous output).
    pub prev_txid: Option<Hash32>,
    pub prev_index: u32,
    /// Raw witness stack items, as they appear on the base layer.
    pub witness: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
    pub address: Option<String>,
}

/// Envelope payload specific to the protocol variant (§3): a deployment
/// carries bytecode, an interaction carries a target contract address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolPayload {
    Deployment { bytecode: Vec<u8> },
    Interaction { contract_address: XOnlyPubKey32 },
}

/// Fields present only for `Deployment`/`Interaction` transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolData {
    /// Reconstructed sender address, tweaked (x-only) form.
    pub from_tweaked: XOnlyPubKey32,
    /// Reconstructed sender address, legacy (compressed) form.
    pub from_legacy: CompressedPubKey33,
    pub payload: ProtocolPayload,
    pub calldata: Vec<u8>,
    /// Miner challenge solution bound into the control block.
    pub preimage: Vec<u8>,
    pub miner_pubkey: CompressedPubKey33,
    pub priority_fee_sat: u64,
    pub gas_sat_fee: u64,
    pub burned_fee: u64,
    pub reward: u64,
    pub receipt: Option<Receipt>,
    /// Serialized revert reason, set on `ExecutionRevert`/`ExecutionPanic`.
    pub revert: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: Hash32,
    pub hash: Hash32,
    pub block_height: u64,
    pub block_hash: Hash32,
    /// Canonical sort position within the block.
    pub index: u32,
    /// Position as seen in the raw base-layer block, before sorting.
    pub original_index: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub raw: Vec<u8>,
    pub kind: TransactionType,
    pub protocol: Option<ProtocolData>,
}

impl Transaction {
    pub fn is_protocol(&self) -> bool {
        !matches!(self.kind, TransactionType::Generic)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs
            .first()
            .is_some_and(|input| input.prev_txid.is_none())
    }

    pub fn protocol(&self) -> Option<&ProtocolData> {
        self.protocol.as_ref()
    }

    pub fn protocol_mut(&mut self) -> Option<&mut ProtocolData> {
        self.protocol.as_mut()
    }
}

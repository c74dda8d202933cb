use serde::{Deserialize, Serialize};

use crate::hash::Hash32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolInput {
    pub prev_txid: Hash32,
    pub out_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolOutput {
    pub index: u32,
    pub value: u64,
    pub address: Option<String>,
    pub script_bytes: Vec<u8>,
}

/// Mempool entry (§3): a candidate raw transaction accepted by [`opnet_mempool`]
/// and recorded with its parsed inputs/outputs for later inclusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub id: Hash32,
    pub raw_bytes: Vec<u8>,
    pub psbt: bool,
    pub first_seen: u64,
    pub block_height_seen: u64,
    pub inputs: Vec<MempoolInput>,
    pub outputs: Vec<MempoolOutput>,
    pub priority_fee: u64,
    pub theoretical_gas_limit: u64,
    pub is_op_net: bool,
}

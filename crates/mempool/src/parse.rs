//! Structural parse step of admission (§4.6 step 5): the same shape C2
//! recognizes, but non-fatal here — a transaction that doesn't decode as a
//! well-formed Bitcoin transaction is simply rejected from the mempool, and
//! one that decodes but isn't an OP_NET envelope is still admitted (its
//! `is_op_net` flag is just `false`).

use bitcoin::consensus::deserialize;
use bitcoin::hashes::Hash as _;
use bitcoin::Transaction as BtcTransaction;
use opnet_chain::envelope::classify;
use opnet_common::mempool::{MempoolInput, MempoolOutput};
use opnet_common::Hash32;

pub struct ParsedTransaction {
    pub txid: Hash32,
    pub inputs: Vec<MempoolInput>,
    pub outputs: Vec<MempoolOutput>,
    pub is_op_net: bool,
}

/// Decodes `raw_bytes` as a Bitcoin transaction and extracts the fields the
/// mempool entry needs for indexing. Returns `None` on any decode failure —
/// callers turn that into `AdmissionError::Malformed`.
pub fn parse_structural(raw_bytes: &[u8]) -> Option<ParsedTransaction> {
    let tx: BtcTransaction = deserialize(raw_bytes).ok()?;

    let txid = Hash32(tx.compute_txid().to_byte_array());

    let is_op_net = tx
        .input
        .iter()
        .any(|input| {
            let witness: Vec<Vec<u8>> = input.witness.iter().map(|item| item.to_vec()).collect();
            classify(&witness).is_ok()
        });

    let inputs = tx
        .input
        .iter()
        .map(|input| MempoolInput {
            prev_txid: Hash32(input.previous_output.txid.to_byte_array()),
            out_index: input.previous_output.vout,
        })
        .collect();

    let outputs = tx
        .output
        .iter()
        .enumerate()
        .map(|(index, output)| MempoolOutput {
            index: index as u32,
            value: output.value.to_sat(),
            // Address reconstruction from a bare script is the RPC layer's
            // job (it knows the active network); left unresolved here.
            address: None,
            script_bytes: output.script_pubkey.to_bytes(),
        })
        .collect();

    Some(ParsedTransaction {
        txid,
        inputs,
        outputs,
        is_op_net,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_bytes() {
        assert!(parse_structural(&[0xde, 0xad, 0xbe, 0xef]).is_none());
    }
}

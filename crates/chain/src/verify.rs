//! C3: challenge/address verifier. Runs checks 4-10 of §4.2 against the
//! raw captures C2 produced: hash commitments, control-block shape, fee
//! accounting, size caps and input/output count limits. Every 32-byte hash
//! comparison here goes through [`opnet_crypto::timing_safe_eq`] (§9).

use bitcoin::blockdata::script::Script;
use bitcoin::secp256k1::{Secp256k1, XOnlyPublicKey};
use bitcoin::taproot::ControlBlock;
use opnet_common::constants::{
    CURRENT_DEPLOYMENT_VERSION, MAXIMUM_INPUTS, MAXIMUM_OUTPUTS, MAX_BURNED_FEE_SAT,
    SALT_MAX_LEN, SALT_MIN_LEN,
};
use opnet_common::{CompressedPubKey33, CoreError, TxInput, TxOutput, XOnlyPubKey32};
use opnet_common::transaction::{ProtocolData, ProtocolPayload};
use opnet_consensus::ConsensusView;
use opnet_crypto::{hash256, timing_safe_eq};

use crate::decoder::decode_payload;
use crate::envelope::EnvelopeCaptures;

fn to_array32(bytes: &[u8]) -> Option<[u8; 32]> {
    bytes.try_into().ok()
}

fn timing_safe_hash_eq(actual: &[u8], expected: &[u8]) -> bool {
    match (to_array32(actual), to_array32(expected)) {
        (Some(a), Some(b)) => timing_safe_eq(&a, &b),
        _ => false,
    }
}

/// Extracts the 32-byte witness-v1 program from a P2TR `scriptPubKey`
/// (`OP_1 OP_PUSHBYTES_32 <program>`), or `None` if `outputs[0]` isn't taproot.
fn p2tr_output_key(script_pubkey: &[u8]) -> Option<[u8; 32]> {
    if script_pubkey.len() == 34 && script_pubkey[0] == 0x51 && script_pubkey[1] == 0x20 {
        script_pubkey[2..34].try_into().ok()
    } else {
        None
    }
}

/// Verifies and fully materializes a classified envelope into the protocol
/// fields the pipeline stores on the transaction. Any failure here marks
/// the transaction reverted with a `ValidationError` (§7); it does not
/// demote the transaction back to `Generic` (that only happens in C2).
#[allow(clippy::too_many_arguments)]
pub fn verify(
    captures: EnvelopeCaptures,
    inputs: &[TxInput],
    outputs: &[TxOutput],
    priority_fee_sat: u64,
    consensus: &ConsensusView,
) -> Result<ProtocolData, CoreError> {
    check_input_output_limits(inputs, outputs)?;

    let sender_key = captures
        .header
        .get(..32)
        .ok_or_else(|| CoreError::Validation("header capture shorter than 32 bytes".into()))?;
    if !timing_safe_hash_eq(&hash256(sender_key), &captures.sender_commitment) {
        return Err(CoreError::Validation("sender key commitment mismatch".into()));
    }

    let salt = &captures.salt;
    if !(SALT_MIN_LEN..=SALT_MAX_LEN).contains(&salt.len()) {
        return Err(CoreError::Validation(format!(
            "salt length {} out of [{SALT_MIN_LEN}, {SALT_MAX_LEN}]",
            salt.len()
        )));
    }
    if !timing_safe_hash_eq(&hash256(salt), &captures.salt_commitment) {
        return Err(CoreError::Validation("salt commitment mismatch".into()));
    }

    let control_block = ControlBlock::decode(&captures.control_block)
        .map_err(|e| CoreError::Validation(format!("invalid control block: {e}")))?;

    // Check #6: rebuild the tapleaf from the witness script whose hash
    // commitments were just verified above, and confirm the control block
    // ties that script to `outputs[0]`'s taproot key, byte for byte.
    let output = outputs
        .first()
        .ok_or_else(|| CoreError::Validation("missing burned-fee output".into()))?;
    let output_key_bytes = p2tr_output_key(&output.script_pubkey)
        .ok_or_else(|| CoreError::Validation("outputs[0] is not a taproot output".into()))?;
    let output_key = XOnlyPublicKey::from_slice(&output_key_bytes)
        .map_err(|e| CoreError::Validation(format!("invalid outputs[0] taproot key: {e}")))?;
    let tapscript = Script::from_bytes(&captures.script);
    let secp = Secp256k1::verification_only();
    if !control_block.verify_taproot_commitment(&secp, output_key, tapscript) {
        return Err(CoreError::Validation(
            "reconstructed control-block tapleaf does not commit to outputs[0]".into(),
        ));
    }

    let from_tweaked = XOnlyPubKey32::try_from(sender_key)
        .map_err(|e| CoreError::Validation(e.to_string()))?;
    let miner_pubkey = CompressedPubKey33::try_from(
        captures
            .miner_key
            .get(..33)
            .ok_or_else(|| CoreError::Validation("miner key capture shorter than 33 bytes".into()))?,
    )
    .map_err(|e| CoreError::Validation(e.to_string()))?;
    let from_legacy = miner_pubkey;

    let calldata = decode_payload(&captures.calldata, consensus.max_decompressed_size)
        .map_err(|e| CoreError::Validation(format!("calldata decompression failed: {e}")))?;
    if captures.calldata.len() > consensus.max_calldata_size_compressed {
        return Err(CoreError::Validation("compressed calldata exceeds cap".into()));
    }

    if captures.payload.len() > consensus.max_contract_size_compressed {
        return Err(CoreError::Validation("compressed payload exceeds cap".into()));
    }
    let decoded_payload = decode_payload(&captures.payload, consensus.max_decompressed_size)
        .map_err(|e| CoreError::Validation(format!("payload decompression failed: {e}")))?;

    let payload = match captures.kind {
        opnet_common::TransactionType::Deployment => {
            let version = *decoded_payload
                .first()
                .ok_or_else(|| CoreError::Validation("empty bytecode payload".into()))?;
            if version > CURRENT_DEPLOYMENT_VERSION {
                return Err(CoreError::Validation(format!(
                    "deployment format version {version} newer than supported {CURRENT_DEPLOYMENT_VERSION}"
                )));
            }
            ProtocolPayload::Deployment {
                bytecode: decoded_payload,
            }
        }
        opnet_common::TransactionType::Interaction => {
            let contract_address = XOnlyPubKey32::try_from(decoded_payload.as_slice())
                .map_err(|e| CoreError::Validation(e.to_string()))?;
            ProtocolPayload::Interaction { contract_address }
        }
        opnet_common::TransactionType::Generic => {
            unreachable!("classify() never returns Generic captures")
        }
    };

    let (burned_fee, reward) = check_fee_accounting(outputs, priority_fee_sat)?;
    let total_fee_fund = burned_fee + reward;
    let gas_sat_fee = total_fee_fund.saturating_sub(priority_fee_sat);

    Ok(ProtocolData {
        from_tweaked,
        from_legacy,
        payload,
        calldata,
        preimage: captures.preimage,
        miner_pubkey,
        priority_fee_sat,
        gas_sat_fee,
        burned_fee,
        reward,
        receipt: None,
        revert: None,
    })
}

/// Best-effort `ProtocolData` for a transaction that classified cleanly in
/// C2 but failed one of C3's checks. The transaction stays protocol-typed
/// (§7: a `ValidationError` reverts, it does not demote to `Generic`), so
/// callers still need a `ProtocolData` to hang the revert reason off of —
/// this reconstructs whatever `captures` still has on hand and zero-fills
/// the rest.
pub fn validation_failed_placeholder(captures: &EnvelopeCaptures, reason: &CoreError) -> ProtocolData {
    let from_tweaked = captures
        .header
        .get(..32)
        .and_then(|bytes| XOnlyPubKey32::try_from(bytes).ok())
        .unwrap_or(XOnlyPubKey32([0u8; 32]));
    let miner_pubkey = captures
        .miner_key
        .get(..33)
        .and_then(|bytes| CompressedPubKey33::try_from(bytes).ok())
        .unwrap_or(CompressedPubKey33([0u8; 33]));

    let payload = match captures.kind {
        opnet_common::TransactionType::Interaction => ProtocolPayload::Interaction {
            contract_address: XOnlyPubKey32([0u8; 32]),
        },
        _ => ProtocolPayload::Deployment { bytecode: Vec::new() },
    };

    ProtocolData {
        from_tweaked,
        from_legacy: miner_pubkey,
        payload,
        calldata: Vec::new(),
        preimage: captures.preimage.clone(),
        miner_pubkey,
        priority_fee_sat: 0,
        gas_sat_fee: 0,
        burned_fee: 0,
        reward: 0,
        receipt: None,
        revert: Some(reason.to_string().into_bytes()),
    }
}

fn check_input_output_limits(inputs: &[TxInput], outputs: &[TxOutput]) -> Result<(), CoreError> {
    if inputs.len() > MAXIMUM_INPUTS {
        return Err(CoreError::Validation(format!(
            "{} inputs exceeds MAXIMUM_INPUTS",
            inputs.len()
        )));
    }
    if outputs.len() > MAXIMUM_OUTPUTS {
        return Err(CoreError::Validation(format!(
            "{} outputs exceeds MAXIMUM_OUTPUTS",
            outputs.len()
        )));
    }
    if inputs.first().is_some_and(|input| input.prev_txid.is_none()) {
        return Err(CoreError::Validation(
            "coinbase input not allowed on a protocol transaction".into(),
        ));
    }
    Ok(())
}

/// `outputs[0].value` is the burned fee, capped at `MAX_BURNED_FEE_SAT`
/// (address reconstruction against `outputs[0]` itself happens earlier, in
/// `verify`). An optional `outputs[1]` is the miner's timelocked reward
/// UTXO (§4.2 #8); reconstructing *that* challenge lives with the VM/RPC
/// signing manager (out of scope, §1) — here we only record its value.
fn check_fee_accounting(outputs: &[TxOutput], priority_fee_sat: u64) -> Result<(u64, u64), CoreError> {
    let burned_fee = outputs
        .first()
        .map(|output| output.value)
        .ok_or_else(|| CoreError::Validation("missing burned-fee output".into()))?;
    if burned_fee > MAX_BURNED_FEE_SAT {
        return Err(CoreError::Validation(format!(
            "burned fee {burned_fee} exceeds MAX_BURNED_FEE_SAT"
        )));
    }
    let reward = outputs.get(1).map(|output| output.value).unwrap_or(0);
    if priority_fee_sat > burned_fee + reward {
        return Err(CoreError::Validation(
            "priority fee exceeds total fee fund".into(),
        ));
    }
    Ok((burned_fee, reward))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_burned_fee_over_cap() {
        let outputs = vec![TxOutput {
            value: MAX_BURNED_FEE_SAT + 1,
            script_pubkey: vec![],
            address: None,
        }];
        assert!(check_fee_accounting(&outputs, 0).is_err());
    }

    #[test]
    fn accepts_burned_fee_at_cap_with_reward() {
        let outputs = vec![
            TxOutput {
                value: MAX_BURNED_FEE_SAT,
                script_pubkey: vec![],
                address: None,
            },
            TxOutput {
                value: 500,
                script_pubkey: vec![],
                address: None,
            },
        ];
        let (burned, reward) = check_fee_accounting(&outputs, 100).unwrap();
        assert_eq!(burned, MAX_BURNED_FEE_SAT);
        assert_eq!(reward, 500);
    }

    #[test]
    fn rejects_priority_fee_over_total_fund() {
        let outputs = vec![TxOutput {
            value: 100,
            script_pubkey: vec![],
            address: None,
        }];
        assert!(check_fee_accounting(&outputs, 200).is_err());
    }

    #[test]
    fn rejects_too_many_inputs() {
        let inputs: Vec<TxInput> = (0..MAXIMUM_INPUTS + 1)
            .map(|_| TxInput {
                prev_txid: Some(opnet_common::Hash32::zero()),
                prev_index: 0,
                witness: vec![],
            })
            .collect();
        assert!(check_input_output_limits(&inputs, &[]).is_err());
    }
}

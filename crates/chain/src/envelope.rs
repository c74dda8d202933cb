//! C2: envelope parser. Recognizes Deployment/Interaction witness shapes
//! (§4.2) and extracts the raw captures C3 needs to verify and reconstruct
//! an address. Classification failures demote the transaction to `Generic`
//! rather than rejecting it outright (§4.2 "If classification fails...").

use std::sync::OnceLock;

use bitcoin::blockdata::opcodes::all as opc;
use bitcoin::blockdata::script::Script;
use opnet_common::constants::{
    CONTROL_BLOCK_BYTE_LEN, SIGNATURE_HEX_LEN, WITNESS_ITEM_COUNT,
};
use opnet_common::TransactionType;

use crate::pattern::{match_script, opcode_only_bytes, Captures, Expect};

/// Witness-stack layout this implementation assumes for a protocol
/// transaction: two signatures, the tapscript, a reserved item, and the
/// control block, in that fixed order. The spec pins the item count (5)
/// and the signature/control-block lengths but not positions; this layout
/// is this implementation's resolution of that gap.
pub const WITNESS_SIG_A: usize = 0;
pub const WITNESS_SIG_B: usize = 1;
pub const WITNESS_SCRIPT: usize = 2;
pub const WITNESS_RESERVED: usize = 3;
pub const WITNESS_CONTROL_BLOCK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    WrongItemCount(usize),
    SignatureLength { index: usize, len: usize },
    ControlBlockLength(usize),
    ScriptDidNotDecompile,
    MissingMagic,
    ChecksumMismatch,
    PatternMismatch,
}

impl std::fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongItemCount(n) => write!(f, "witness has {n} items, expected {WITNESS_ITEM_COUNT}"),
            Self::SignatureLength { index, len } => {
                write!(f, "witness item {index} is {len} bytes, expected a signature")
            }
            Self::ControlBlockLength(len) => write!(f, "control block is {len} bytes, expected {CONTROL_BLOCK_BYTE_LEN}"),
            Self::ScriptDidNotDecompile => write!(f, "tapscript did not decompile"),
            Self::MissingMagic => write!(f, "magic sentinel not present"),
            Self::ChecksumMismatch => write!(f, "opcode checksum matched no known shape"),
            Self::PatternMismatch => write!(f, "script did not match the expected envelope shape"),
        }
    }
}

impl std::error::Error for ClassifyError {}

/// Raw captures pulled out of a matched envelope script plus the witness
/// stack, before C3's semantic verification (hash checks, address
/// reconstruction, fee caps).
#[derive(Debug, Clone)]
pub struct EnvelopeCaptures {
    pub kind: TransactionType,
    pub header: Vec<u8>,
    pub miner_key: Vec<u8>,
    pub preimage: Vec<u8>,
    /// Raw salt bytes, taken from the reserved witness slot — the script
    /// itself only ever carries the salt's *hash* (§9 open question on
    /// exact byte layout; this is this implementation's resolution).
    pub salt: Vec<u8>,
    /// `HASH256(salt)` as embedded in the script.
    pub salt_commitment: Vec<u8>,
    /// `HASH256(sender_key)` as embedded in the script.
    pub sender_commitment: Vec<u8>,
    pub features: Vec<u8>,
    pub calldata: Vec<u8>,
    /// Bytecode for a Deployment, contract address bytes for an Interaction.
    pub payload: Vec<u8>,
    pub control_block: Vec<u8>,
    /// Raw tapscript bytes (the witness script item itself), kept so C3 can
    /// rebuild the control-block tapleaf and reconstruct the output address.
    pub script: Vec<u8>,
}

fn deployment_pattern() -> &'static [Expect] {
    static PATTERN: OnceLock<Vec<Expect>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        vec![
            Expect::Capture("header"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Capture("miner_key"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Capture("preimage"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Op(opc::OP_DUP),
            Expect::Op(opc::OP_HASH256),
            Expect::Capture("salt_hash"),
            Expect::Op(opc::OP_EQUALVERIFY),
            Expect::Op(opc::OP_CHECKSIGVERIFY),
            Expect::Op(opc::OP_CHECKSIGVERIFY),
            Expect::Op(opc::OP_HASH256),
            Expect::Capture("sender_hash"),
            Expect::Op(opc::OP_EQUALVERIFY),
            Expect::Op(opc::OP_DEPTH),
            Expect::Op(opc::OP_PUSHNUM_1),
            Expect::Op(opc::OP_NUMEQUAL),
            Expect::Op(opc::OP_IF),
            Expect::Capture("magic"),
            Expect::Capture("features"),
            Expect::Op(opc::OP_PUSHBYTES_0),
            Expect::Capture("calldata"),
            Expect::Op(opc::OP_PUSHNUM_NEG1),
            Expect::Capture("payload"),
            Expect::Op(opc::OP_ELSE),
            Expect::Op(opc::OP_PUSHNUM_1),
            Expect::Op(opc::OP_ENDIF),
        ]
    })
}

fn interaction_pattern() -> &'static [Expect] {
    static PATTERN: OnceLock<Vec<Expect>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        vec![
            Expect::Capture("header"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Capture("miner_key"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Capture("preimage"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Op(opc::OP_DUP),
            Expect::Op(opc::OP_HASH160),
            Expect::Capture("salt_hash"),
            Expect::Op(opc::OP_EQUALVERIFY),
            Expect::Op(opc::OP_CHECKSIGVERIFY),
            Expect::Op(opc::OP_CHECKSIGVERIFY),
            Expect::Op(opc::OP_HASH160),
            Expect::Capture("sender_hash"),
            Expect::Op(opc::OP_EQUALVERIFY),
            Expect::Op(opc::OP_DEPTH),
            Expect::Op(opc::OP_PUSHNUM_1),
            Expect::Op(opc::OP_NUMEQUAL),
            Expect::Op(opc::OP_IF),
            Expect::Capture("magic"),
            Expect::Capture("features"),
            Expect::Op(opc::OP_PUSHBYTES_0),
            Expect::Capture("calldata"),
            Expect::Op(opc::OP_PUSHNUM_NEG1),
            Expect::Capture("payload"),
            Expect::Op(opc::OP_ELSE),
            Expect::Op(opc::OP_PUSHNUM_1),
            Expect::Op(opc::OP_ENDIF),
        ]
    })
}

fn checksum_table() -> &'static [(TransactionType, Vec<u8>)] {
    static TABLE: OnceLock<Vec<(TransactionType, Vec<u8>)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            (
                TransactionType::Deployment,
                pattern_checksum(deployment_pattern()),
            ),
            (
                TransactionType::Interaction,
                pattern_checksum(interaction_pattern()),
            ),
        ]
    })
}

/// A pattern's checksum is the concatenation of the opcodes it expects, in
/// order (data pushes contribute nothing). Computed once from the pattern
/// tables themselves rather than hardcoded, so the two can never drift.
fn pattern_checksum(pattern: &[Expect]) -> Vec<u8> {
    pattern
        .iter()
        .filter_map(|item| match item {
            Expect::Op(op) => Some(op.to_u8()),
            _ => None,
        })
        .collect()
}

/// Runs structural checks 1-3 and §4.2's pattern match, returning the raw
/// captures for C3 to verify, or `None` if the transaction should be
/// treated as `Generic`.
pub fn classify(witness: &[Vec<u8>]) -> Result<EnvelopeCaptures, ClassifyError> {
    if witness.len() != WITNESS_ITEM_COUNT {
        return Err(ClassifyError::WrongItemCount(witness.len()));
    }
    for index in [WITNESS_SIG_A, WITNESS_SIG_B] {
        let len = witness[index].len();
        if len * 2 != SIGNATURE_HEX_LEN {
            return Err(ClassifyError::SignatureLength { index, len });
        }
    }
    let control_block = &witness[WITNESS_CONTROL_BLOCK];
    if control_block.len() != CONTROL_BLOCK_BYTE_LEN {
        return Err(ClassifyError::ControlBlockLength(control_block.len()));
    }

    let script = Script::from_bytes(&witness[WITNESS_SCRIPT]);
    let opcodes = opcode_only_bytes(script).ok_or(ClassifyError::ScriptDidNotDecompile)?;

    if !script_contains_magic(script) {
        return Err(ClassifyError::MissingMagic);
    }

    let kind = checksum_table()
        .iter()
        .find(|(_, checksum)| checksum == &opcodes)
        .map(|(kind, _)| *kind)
        .ok_or(ClassifyError::ChecksumMismatch)?;

    let pattern = match kind {
        TransactionType::Deployment => deployment_pattern(),
        TransactionType::Interaction => interaction_pattern(),
        TransactionType::Generic => unreachable!("checksum table only holds protocol shapes"),
    };

    let mut captures: Captures =
        match_script(script, pattern).ok_or(ClassifyError::PatternMismatch)?;

    Ok(EnvelopeCaptures {
        kind,
        header: captures.take("header").unwrap_or_default(),
        miner_key: captures.take("miner_key").unwrap_or_default(),
        preimage: captures.take("preimage").unwrap_or_default(),
        salt: witness[WITNESS_RESERVED].clone(),
        salt_commitment: captures.take("salt_hash").unwrap_or_default(),
        sender_commitment: captures.take("sender_hash").unwrap_or_default(),
        features: captures.take("features").unwrap_or_default(),
        calldata: captures.take("calldata").unwrap_or_default(),
        payload: captures.take("payload").unwrap_or_default(),
        control_block: control_block.clone(),
        script: witness[WITNESS_SCRIPT].clone(),
    })
}

fn script_contains_magic(script: &Script) -> bool {
    use opnet_common::constants::MAGIC;
    script
        .instructions()
        .filter_map(|i| i.ok())
        .any(|instruction| matches!(instruction, bitcoin::blockdata::script::Instruction::PushBytes(bytes) if bytes.as_bytes() == MAGIC))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::script::Builder;

    fn deployment_script(magic: &[u8]) -> Vec<u8> {
        Builder::new()
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"header00".as_slice()).unwrap())
            .push_opcode(opc::OP_TOALTSTACK)
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"minerkey".as_slice()).unwrap())
            .push_opcode(opc::OP_TOALTSTACK)
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"preimage".as_slice()).unwrap())
            .push_opcode(opc::OP_TOALTSTACK)
            .push_opcode(opc::OP_DUP)
            .push_opcode(opc::OP_HASH256)
            .push_slice(<&bitcoin::script::PushBytes>::try_from([0u8; 32].as_slice()).unwrap())
            .push_opcode(opc::OP_EQUALVERIFY)
            .push_opcode(opc::OP_CHECKSIGVERIFY)
            .push_opcode(opc::OP_CHECKSIGVERIFY)
            .push_opcode(opc::OP_HASH256)
            .push_slice(<&bitcoin::script::PushBytes>::try_from([1u8; 32].as_slice()).unwrap())
            .push_opcode(opc::OP_EQUALVERIFY)
            .push_opcode(opc::OP_DEPTH)
            .push_opcode(opc::OP_PUSHNUM_1)
            .push_opcode(opc::OP_NUMEQUAL)
            .push_opcode(opc::OP_IF)
            .push_slice(<&bitcoin::script::PushBytes>::try_from(magic).unwrap())
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"f".as_slice()).unwrap())
            .push_opcode(opc::OP_PUSHBYTES_0)
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"calldata".as_slice()).unwrap())
            .push_opcode(opc::OP_PUSHNUM_NEG1)
            .push_slice(<&bitcoin::script::PushBytes>::try_from(b"bytecode".as_slice()).unwrap())
            .push_opcode(opc::OP_ELSE)
            .push_opcode(opc::OP_PUSHNUM_1)
            .push_opcode(opc::OP_ENDIF)
            .into_script()
            .into_bytes()
    }

    fn witness_with_script(script: Vec<u8>) -> Vec<Vec<u8>> {
        vec![
            vec![0u8; 64],
            vec![0u8; 64],
            script,
            vec![0u8; 1],
            vec![0u8; CONTROL_BLOCK_BYTE_LEN],
        ]
    }

    #[test]
    fn classifies_well_formed_deployment() {
        let witness = witness_with_script(deployment_script(b"op"));
        let captures = classify(&witness).expect("should classify");
        assert_eq!(captures.kind, TransactionType::Deployment);
        assert_eq!(captures.payload, b"bytecode");
        assert_eq!(captures.calldata, b"calldata");
    }

    #[test]
    fn rejects_missing_magic() {
        let witness = witness_with_script(deployment_script(b"xx"));
        assert_eq!(classify(&witness).unwrap_err(), ClassifyError::MissingMagic);
    }

    #[test]
    fn rejects_wrong_witness_item_count() {
        let mut witness = witness_with_script(deployment_script(b"op"));
        witness.pop();
        assert_eq!(
            classify(&witness).unwrap_err(),
            ClassifyError::WrongItemCount(4)
        );
    }

    #[test]
    fn rejects_bad_control_block_length() {
        let mut witness = witness_with_script(deployment_script(b"op"));
        witness[WITNESS_CONTROL_BLOCK] = vec![0u8; 10];
        assert_eq!(
            classify(&witness).unwrap_err(),
            ClassifyError::ControlBlockLength(10)
        );
    }
}

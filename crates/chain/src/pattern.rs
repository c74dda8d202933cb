//! Witness-script pattern matcher (§9 design note): "implement as a small
//! pattern-matcher (sequence of `ExpectOp(op) | ExpectData(len) |
//! Capture(name, len)`) rather than hand-rolled shift/assert chains". Adding
//! a future envelope version is then a new table, not new control flow.

use std::collections::HashMap;

use bitcoin::blockdata::opcodes::Opcode;
use bitcoin::blockdata::script::{Instruction, Script};

/// One element of an expected witness-script shape.
#[derive(Debug, Clone)]
pub enum Expect {
    /// A specific opcode must appear here.
    Op(Opcode),
    /// A data push of any length, discarded.
    AnyPush,
    /// A data push of any length, captured under `name`.
    Capture(&'static str),
    /// A data push of an exact byte length, captured under `name`.
    CaptureExact(&'static str, usize),
}

#[derive(Debug, Default)]
pub struct Captures(HashMap<&'static str, Vec<u8>>);

impl Captures {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name).map(|v| v.as_slice())
    }

    pub fn take(&mut self, name: &str) -> Option<Vec<u8>> {
        self.0.remove(name)
    }
}

/// Matches `script`'s instructions against `pattern` in strict order. On
/// success returns the named captures; any opcode/length mismatch, or a
/// decompilation failure, yields `None`.
pub fn match_script(script: &Script, pattern: &[Expect]) -> Option<Captures> {
    let instructions: Vec<Instruction<'_>> = script.instructions().collect::<Result<_, _>>().ok()?;
    if instructions.len() != pattern.len() {
        return None;
    }

    let mut captures = Captures::default();
    for (instruction, expected) in instructions.iter().zip(pattern.iter()) {
        match (instruction, expected) {
            (Instruction::Op(op), Expect::Op(expected_op)) if op == expected_op => {}
            (Instruction::PushBytes(bytes), Expect::AnyPush) => {
                let _ = bytes;
            }
            (Instruction::PushBytes(bytes), Expect::Capture(name)) => {
                captures.0.insert(name, bytes.as_bytes().to_vec());
            }
            (Instruction::PushBytes(bytes), Expect::CaptureExact(name, len))
                if bytes.len() == *len =>
            {
                captures.0.insert(name, bytes.as_bytes().to_vec());
            }
            _ => return None,
        }
    }
    Some(captures)
}

/// Concatenation of just the opcode bytes in `script` (data pushes
/// excluded), used by the classifier's "opcode checksum" step (§4.2 step 3).
pub fn opcode_only_bytes(script: &Script) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for instruction in script.instructions() {
        if let Instruction::Op(op) = instruction.ok()? {
            out.push(op.to_u8());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::opcodes::all as opc;
    use bitcoin::script::Builder;

    #[test]
    fn matches_fixed_and_captured_elements() {
        let script = Builder::new()
            .push_slice(*b"header!!")
            .push_opcode(opc::OP_TOALTSTACK)
            .push_opcode(opc::OP_DUP)
            .into_script();

        let pattern = [
            Expect::Capture("header"),
            Expect::Op(opc::OP_TOALTSTACK),
            Expect::Op(opc::OP_DUP),
        ];

        let captures = match_script(&script, &pattern).expect("pattern should match");
        assert_eq!(captures.get("header"), Some(b"header!!".as_slice()));
    }

    #[test]
    fn rejects_wrong_opcode() {
        let script = Builder::new().push_opcode(opc::OP_DUP).into_script();
        let pattern = [Expect::Op(opc::OP_TOALTSTACK)];
        assert!(match_script(&script, &pattern).is_none());
    }

    #[test]
    fn rejects_wrong_length() {
        let script = Builder::new()
            .push_opcode(opc::OP_DUP)
            .push_opcode(opc::OP_DUP)
            .into_script();
        let pattern = [Expect::Op(opc::OP_DUP)];
        assert!(match_script(&script, &pattern).is_none());
    }
}

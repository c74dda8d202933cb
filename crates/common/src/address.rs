use std::fmt;

use serde::{Deserialize, Serialize};

/// A "legacy" 33-byte compressed secp256k1 public key.
///
/// Kept as a distinct type from [`XOnlyPubKey32`] per the design note in
/// §9: legacy and tweaked keys must never be accidentally cross-assigned,
/// since a deployment's sender key and a contract's tweaked address key
/// occupy similar positions in the envelope but are not interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompressedPubKey33(pub [u8; 33]);

/// A "tweaked" 32-byte x-only public key, derived from a taproot script
/// path. Acts as a contract's (or deployment sender's) address key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct XOnlyPubKey32(pub [u8; 32]);

impl CompressedPubKey33 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl XOnlyPubKey32 {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CompressedPubKey33 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPubKey33({})", self.to_hex())
    }
}

impl fmt::Debug for XOnlyPubKey32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XOnlyPubKey32({})", self.to_hex())
    }
}

impl TryFrom<&[u8]> for CompressedPubKey33 {
    type Error = &'static str;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 33] = value.try_into().map_err(|_| "expected 33 bytes")?;
        Ok(Self(arr))
    }
}

impl TryFrom<&[u8]> for XOnlyPubKey32 {
    type Error = &'static str;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = value.try_into().map_err(|_| "expected 32 bytes")?;
        Ok(Self(arr))
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-byte hash. Used for txids, block hashes, Merkle roots and checksums.
///
/// Comparisons used for on-chain validation (sender key, salt, address) must
/// go through [`opnet_crypto::timing_safe_eq`] rather than the derived
/// `PartialEq`, which is why the derive is kept for map keys / test
/// assertions but callers in the validation path are expected to use the
/// constant-time primitive explicitly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

/// Canonical zero hash used for empty storage/receipt roots.
pub const ZERO_HASH: Hash32 = Hash32([0u8; 32]);

impl Hash32 {
    pub const fn zero() -> Self {
        ZERO_HASH
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Hash32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Single SHA-256.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Double SHA-256, as used throughout the Bitcoin envelope format (`HASH256`).
pub fn hash256(input: &[u8]) -> [u8; 32] {
    sha256(&sha256(input))
}

/// RIPEMD-160, zero-padded on the left is *not* applied here — callers that
/// need the Bitcoin `HASH160` (`RIPEMD160(SHA256(x))`) compose it explicitly.
pub fn ripemd160(input: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// `HASH160`: `RIPEMD160(SHA256(x))`.
pub fn hash160(input: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(input))
}

/// Constant-time equality for 32-byte hashes. Every validation comparison in
/// the envelope parser (sender-key integrity, salt, address reconstruction)
/// must go through this rather than `==`.
pub fn timing_safe_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash256_is_double_sha256() {
        let input = b"op_net";
        let once = sha256(input);
        let twice = sha256(&once);
        assert_eq!(hash256(input), twice);
    }

    #[test]
    fn timing_safe_eq_matches_plain_eq() {
        let a = [1u8; 32];
        let b = [1u8; 32];
        let mut c = [1u8; 32];
        c[31] = 0;
        assert!(timing_safe_eq(&a, &b));
        assert!(!timing_safe_eq(&a, &c));
    }
}

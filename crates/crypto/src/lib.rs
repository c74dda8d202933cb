//! Hashing, timing-safe comparison and bounded GZIP (de)compression.
//!
//! Kept as its own crate, grounded on `ethrex_crypto`'s role: every other
//! crate depends on this one for primitives instead of reaching for `sha2`
//! or `flate2` directly, so the hash/compression choices stay in one place.

pub mod compress;
pub mod hash;

pub use compress::{decompress_bounded, DecompressError};
pub use hash::{hash160, hash256, ripemd160, sha256, timing_safe_eq};

//! Protocol-fixed constants (§6 of the spec). Consensus-tunable parameters
//! that vary by chain/height (gas predictor knobs, size caps that might be
//! bumped by a future deployment version) live in `opnet-consensus`'s
//! `ConsensusView` instead, per the "no global mutable singleton" design
//! note — these here are the ones that never vary.

/// 2-byte sentinel inside protocol scripts (ASCII `"op"`).
pub const MAGIC: [u8; 2] = *b"op";

/// Exactly this many witness items are expected for a protocol transaction.
pub const WITNESS_ITEM_COUNT: usize = 5;

/// Hex-encoded length of a 64-byte Schnorr/ECDSA signature witness item.
pub const SIGNATURE_HEX_LEN: usize = 128;

/// Hex-encoded length of a 65-byte taproot control block.
pub const CONTROL_BLOCK_HEX_LEN: usize = 130;
pub const CONTROL_BLOCK_BYTE_LEN: usize = 65;

/// Inclusive salt length bounds in bytes.
pub const SALT_MIN_LEN: usize = 32;
pub const SALT_MAX_LEN: usize = 128;

/// `outputs[0].value` (the burned fee) must never exceed this, in satoshis.
pub const MAX_BURNED_FEE_SAT: u64 = 2000;

/// Deployment bytecode format versions at or below this are accepted.
pub const CURRENT_DEPLOYMENT_VERSION: u8 = 0;

/// Gas charged to a transaction whose VM execution panics.
pub const PANIC_GAS_COST: u64 = 1_000_000;

/// Hard ceiling on a block's accumulated gas usage.
pub const MAX_THEORETICAL_GAS: u64 = 400_000_000;

/// Upper bound on the number of inputs/outputs a protocol transaction may have.
pub const MAXIMUM_INPUTS: usize = 256;
pub const MAXIMUM_OUTPUTS: usize = 256;

/// Mempool admission size caps (§4.6), in bytes. A PSBT carries more
/// bookkeeping per input than a finalized raw transaction, hence the
/// larger cap.
pub const MAX_RAW_TX_SIZE_BYTES: usize = 400_000;
pub const MAX_PSBT_SIZE_BYTES: usize = 1_000_000;

//! Error types for decoding and retargeting.
//!
//! Consensus failures (wrong bits, a hash above target, a bad solution) are
//! not errors: they surface as `Ok(false)` from the proof-of-work check.
//! These types only cover caller contract violations.

use thiserror::Error;

/// Errors raised while reading a block from raw bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A read would run past the end of the input.
    #[error("buffer too small: needed {needed} bytes, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
    /// A varint used a wider encoding than its value requires.
    #[error("non-canonical varint encoding")]
    NonCanonicalVarInt,
    /// A segwit-flagged transaction carried no witness data.
    #[error("transaction has superfluous witness data")]
    SuperfluousWitness,
    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Errors raised by the LWMA retargeter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetargetError {
    /// Fewer than `averaging_window + 1` previous headers were supplied.
    #[error("LWMA needs the last {required} blocks to determine the next target, got {available}")]
    InsufficientWindow { required: usize, available: usize },
    /// The supplied window has a gap at this height.
    #[error("block with height {0} is missing, cannot calculate next target")]
    MissingWindowHeight(u32),
    /// The window for this height would start below the genesis block.
    #[error("height {height} is too low for an averaging window of {window}")]
    WindowBeforeGenesis { height: u32, window: u32 },
    /// A retarget parameter that is used as a divisor is zero.
    #[error("LWMA parameter `{0}` must be non-zero")]
    InvalidParameter(&'static str),
}

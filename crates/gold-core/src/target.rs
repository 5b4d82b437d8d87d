//! Difficulty target conversion between compact "bits" and 256-bit values.
//!
//! The compact format is `[exponent (1 byte)][mantissa (3 bytes)]` with
//! `target = mantissa * 256^(exponent - 3)`. Bit 23 of the mantissa is the
//! sign bit of the original encoding and is masked off when decoding.

use primitive_types::{U256, U512};
use tracing::trace;

/// Convert compact "bits" to a 256-bit target.
///
/// Encodings whose value does not fit in 256 bits saturate at `U256::MAX`,
/// which keeps "every hash is below this target" true for them.
pub fn bits_to_target(bits: u32) -> U256 {
    let size = bits >> 24;
    let mantissa = U512::from(bits & 0x007f_ffff);

    let wide = if size <= 3 {
        mantissa >> (8 * (3 - size) as usize)
    } else {
        let shift = 8 * (size - 3) as usize;
        if mantissa.is_zero() {
            U512::zero()
        } else if shift > 256 {
            trace!(bits, "compact target overflows 256 bits");
            return U256::MAX;
        } else {
            mantissa << shift
        }
    };

    U256::try_from(wide).unwrap_or_else(|_| {
        trace!(bits, "compact target overflows 256 bits");
        U256::MAX
    })
}

/// Convert a 256-bit target back to compact "bits".
///
/// Only the top three significant bytes survive; the rest is truncated.
pub fn target_to_bits(target: &U256) -> u32 {
    let mut size = (target.bits() + 7) / 8;

    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (*target >> (8 * (size - 3))).low_u32()
    };

    // A set high bit would read back as a negative value.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | ((size as u32) << 24)
}

/// Check a big-endian hash against a target.
///
/// Returns true if `hash <= target`.
#[inline]
pub fn hash_meets_target(hash_be: &[u8; 32], target: &U256) -> bool {
    U256::from_big_endian(hash_be) <= *target
}

/// Big-endian bytes of a target.
pub fn target_to_be_bytes(target: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    target.to_big_endian(&mut bytes);
    bytes
}

//! SHA256 double-hashing and byte-order helpers.

use sha2::{Digest, Sha256};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// Used for block header hashes and transaction ids.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Reverse the byte order of a 32-byte array.
///
/// Hashes are stored in wire order and displayed reversed.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a wire-order hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256() {
        // Known result for double SHA256 of "hello"
        let hash = double_sha256(b"hello");
        let expected = hex::decode(
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        ).unwrap();

        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_reverse_bytes() {
        let mut original = [0u8; 32];
        for (i, byte) in original.iter_mut().enumerate() {
            *byte = i as u8 + 1;
        }
        let reversed = reverse_bytes(&original);

        assert_eq!(reversed[0], 0x20);
        assert_eq!(reversed[31], 0x01);
    }

    #[test]
    fn test_display_hex_round_trip() {
        let mut hash = [0u8; 32];
        hash[31] = 0xab;
        let display = hash_to_display_hex(&hash);
        assert!(display.starts_with("ab00"));
        assert!(display.ends_with("00"));
    }
}

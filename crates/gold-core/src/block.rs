//! Bitcoin Gold block header and block serialization.
//!
//! Since the fork the header carries the block height, a reserved area, a
//! 32-byte nonce and a variable-length Equihash solution. Blocks mined
//! before the fork are identified by the original 80-byte Bitcoin header,
//! so the same in-memory header can be written in either layout:
//!
//! ```text
//! Extended: version | prev_hash | merkle_root | height | reserved(28)
//!           | timestamp | bits | nonce(32) | varint sol_len | solution
//! Legacy:   version | prev_hash | merkle_root | timestamp | bits | nonce(4)
//! ```
//!
//! A full block appends `varint tx_count | tx...` to either layout.

use crate::cursor::{encode_varint, varint_len, Cursor};
use crate::error::DecodeError;
use crate::hash::{double_sha256, hash_to_display_hex};
use crate::network::NetworkProfile;
use crate::transaction::{Transaction, TransactionCodec};

/// Block version with BIP9 versionbits signaling.
pub const BLOCK_VERSION: i32 = 0x20000000;

/// Size of a legacy block header in bytes.
pub const LEGACY_HEADER_SIZE: usize = 80;

/// Size of an extended header without the solution and its length prefix.
pub const EXTENDED_HEADER_BASE_SIZE: usize = 140;

/// Wire layout used to encode or hash a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFormat {
    /// Original 80-byte Bitcoin header.
    Legacy,
    /// Post-fork header with height, reserved area and Equihash solution.
    Extended,
}

impl HeaderFormat {
    /// Layout that identifies a block at `height` on `profile`.
    pub fn for_height(height: u32, profile: &NetworkProfile) -> Self {
        if height < profile.fork_height {
            HeaderFormat::Legacy
        } else {
            HeaderFormat::Extended
        }
    }
}

/// A Bitcoin Gold block header.
///
/// The extended fields are always kept; the legacy layout simply does not
/// write them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_hash: [u8; 32],
    /// Merkle root of all transactions (internal byte order).
    pub merkle_root: [u8; 32],
    pub height: u32,
    pub reserved: [u8; 28],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Legacy headers use only the first four bytes.
    pub nonce: [u8; 32],
    /// Equihash solution; its length is written as a varint prefix.
    pub solution: Vec<u8>,
}

impl BlockHeader {
    /// Create a header with an empty nonce, reserved area and solution.
    pub fn new(
        height: u32,
        prev_hash: [u8; 32],
        merkle_root: [u8; 32],
        timestamp: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version: BLOCK_VERSION,
            prev_hash,
            merkle_root,
            height,
            reserved: [0u8; 28],
            timestamp,
            bits,
            nonce: [0u8; 32],
            solution: Vec::new(),
        }
    }

    /// Value of the solution length prefix.
    pub fn solution_length(&self) -> u64 {
        self.solution.len() as u64
    }

    /// The 32-bit nonce written by the legacy layout.
    pub fn legacy_nonce(&self) -> u32 {
        let mut nonce = [0u8; 4];
        nonce.copy_from_slice(&self.nonce[..4]);
        u32::from_le_bytes(nonce)
    }

    /// Encoded size of the header alone.
    pub fn byte_length(&self, format: HeaderFormat) -> usize {
        match format {
            HeaderFormat::Legacy => LEGACY_HEADER_SIZE,
            HeaderFormat::Extended => {
                EXTENDED_HEADER_BASE_SIZE
                    + varint_len(self.solution_length())
                    + self.solution.len()
            }
        }
    }

    /// Serialize the header alone.
    pub fn encode(&self, format: HeaderFormat) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.byte_length(format));
        self.write(format, &mut output);
        output
    }

    /// Double SHA256 of the header in the given layout (internal byte order).
    pub fn hash(&self, format: HeaderFormat) -> [u8; 32] {
        double_sha256(&self.encode(format))
    }

    /// Identity hash of the block: legacy layout before the fork, extended after.
    pub fn block_hash(&self, profile: &NetworkProfile) -> [u8; 32] {
        self.hash(HeaderFormat::for_height(self.height, profile))
    }

    /// Block hash in display (reversed hex) format.
    pub fn block_hash_hex(&self, profile: &NetworkProfile) -> String {
        hash_to_display_hex(&self.block_hash(profile))
    }

    fn write(&self, format: HeaderFormat, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.version.to_le_bytes());
        output.extend_from_slice(&self.prev_hash);
        output.extend_from_slice(&self.merkle_root);

        match format {
            HeaderFormat::Legacy => {
                output.extend_from_slice(&self.timestamp.to_le_bytes());
                output.extend_from_slice(&self.bits.to_le_bytes());
                output.extend_from_slice(&self.nonce[..4]);
            }
            HeaderFormat::Extended => {
                output.extend_from_slice(&self.height.to_le_bytes());
                output.extend_from_slice(&self.reserved);
                output.extend_from_slice(&self.timestamp.to_le_bytes());
                output.extend_from_slice(&self.bits.to_le_bytes());
                output.extend_from_slice(&self.nonce);
                encode_varint(self.solution_length(), output);
                output.extend_from_slice(&self.solution);
            }
        }
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let version = cursor.read_i32_le()?;
        let prev_hash = cursor.read_array()?;
        let merkle_root = cursor.read_array()?;
        let height = cursor.read_u32_le()?;
        let reserved = cursor.read_array()?;
        let timestamp = cursor.read_u32_le()?;
        let bits = cursor.read_u32_le()?;
        let nonce = cursor.read_array()?;
        let solution = cursor.read_var_bytes()?.to_vec();

        Ok(BlockHeader {
            version,
            prev_hash,
            merkle_root,
            height,
            reserved,
            timestamp,
            bits,
            nonce,
            solution,
        })
    }
}

impl AsRef<BlockHeader> for BlockHeader {
    fn as_ref(&self) -> &BlockHeader {
        self
    }
}

/// A header plus, optionally, its transactions.
///
/// `transactions: None` is a header-only view and is distinct from a block
/// with zero transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<T = Transaction> {
    pub header: BlockHeader,
    pub transactions: Option<Vec<T>>,
}

impl<T: TransactionCodec> Block<T> {
    /// Wrap a header without transactions.
    pub fn header_only(header: BlockHeader) -> Self {
        Block { header, transactions: None }
    }

    pub fn with_transactions(header: BlockHeader, transactions: Vec<T>) -> Self {
        Block { header, transactions: Some(transactions) }
    }

    /// Decode a block in the extended layout.
    ///
    /// Input that ends right after the solution yields a header-only block.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < EXTENDED_HEADER_BASE_SIZE {
            return Err(DecodeError::BufferTooSmall {
                needed: EXTENDED_HEADER_BASE_SIZE,
                available: bytes.len(),
            });
        }

        let mut cursor = Cursor::new(bytes);
        let header = BlockHeader::read(&mut cursor)?;

        if cursor.is_empty() {
            return Ok(Block::header_only(header));
        }

        let count = cursor.read_varint()?;
        let mut transactions = Vec::new();
        for _ in 0..count {
            let (tx, _) = T::decode(cursor.rest())?;
            cursor.skip(tx.byte_length())?;
            transactions.push(tx);
        }

        Ok(Block::with_transactions(header, transactions))
    }

    /// Decode a block from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, DecodeError> {
        Self::decode(&hex::decode(hex_str)?)
    }

    /// Exact size of [`Block::encode`] for the same arguments.
    pub fn byte_length(&self, headers_only: bool, format: HeaderFormat) -> usize {
        let header_size = self.header.byte_length(format);
        match &self.transactions {
            Some(transactions) if !headers_only => {
                header_size
                    + varint_len(transactions.len() as u64)
                    + transactions.iter().map(|tx| tx.byte_length()).sum::<usize>()
            }
            _ => header_size,
        }
    }

    /// Serialize the block, or only its header when `headers_only` is set.
    pub fn encode(&self, headers_only: bool, format: HeaderFormat) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.byte_length(headers_only, format));
        self.header.write(format, &mut output);

        if let (false, Some(transactions)) = (headers_only, &self.transactions) {
            encode_varint(transactions.len() as u64, &mut output);
            for tx in transactions {
                tx.encode_to(&mut output);
            }
        }

        output
    }

    pub fn to_hex(&self, headers_only: bool, format: HeaderFormat) -> String {
        hex::encode(self.encode(headers_only, format))
    }
}

impl<T> AsRef<BlockHeader> for Block<T> {
    fn as_ref(&self) -> &BlockHeader {
        &self.header
    }
}

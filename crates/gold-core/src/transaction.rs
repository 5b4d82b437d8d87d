//! Transaction codec contract and a Bitcoin-style transaction.
//!
//! The block codec only needs three things from a transaction: decode it
//! from the front of a byte slice, encode it, and report its encoded size.
//! [`TransactionCodec`] captures exactly that, so any transaction model can
//! be plugged into [`Block`](crate::block::Block).

use crate::cursor::{encode_varint, varint_len, Cursor};
use crate::error::DecodeError;

/// Decode/encode entrypoints a block needs from its transactions.
pub trait TransactionCodec: Sized {
    /// Decode one transaction from the front of `bytes`.
    ///
    /// Returns the transaction and the number of bytes it consumed.
    fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError>;

    /// Append the wire encoding to `output`.
    fn encode_to(&self, output: &mut Vec<u8>);

    /// Exact size of the wire encoding.
    fn byte_length(&self) -> usize;

    fn encode(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(self.byte_length());
        self.encode_to(&mut output);
        output
    }
}

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPoint {
    /// Transaction id (internal byte order).
    pub txid: [u8; 32],
    /// Output index.
    pub vout: u32,
}

impl OutPoint {
    /// The null outpoint spent by coinbase inputs.
    pub fn null() -> Self {
        OutPoint { txid: [0u8; 32], vout: 0xFFFFFFFF }
    }
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack; empty for non-segwit inputs.
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A Bitcoin-style transaction with optional segwit witness data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Size of the encoding without witness data.
    pub fn base_length(&self) -> usize {
        let inputs: usize = self
            .inputs
            .iter()
            .map(|input| 36 + var_bytes_len(&input.script_sig) + 4)
            .sum();
        let outputs: usize = self
            .outputs
            .iter()
            .map(|output| 8 + var_bytes_len(&output.script_pubkey))
            .sum();

        4 + varint_len(self.inputs.len() as u64)
            + inputs
            + varint_len(self.outputs.len() as u64)
            + outputs
            + 4
    }

    fn witness_length(&self) -> usize {
        self.inputs
            .iter()
            .map(|input| {
                varint_len(input.witness.len() as u64)
                    + input.witness.iter().map(|item| var_bytes_len(item)).sum::<usize>()
            })
            .sum()
    }

    fn write(&self, output: &mut Vec<u8>, with_witness: bool) {
        output.extend_from_slice(&self.version.to_le_bytes());

        if with_witness {
            // Marker and flag
            output.push(0x00);
            output.push(0x01);
        }

        encode_varint(self.inputs.len() as u64, output);
        for input in &self.inputs {
            output.extend_from_slice(&input.previous_output.txid);
            output.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            write_var_bytes(&input.script_sig, output);
            output.extend_from_slice(&input.sequence.to_le_bytes());
        }

        encode_varint(self.outputs.len() as u64, output);
        for tx_out in &self.outputs {
            output.extend_from_slice(&tx_out.value.to_le_bytes());
            write_var_bytes(&tx_out.script_pubkey, output);
        }

        if with_witness {
            for input in &self.inputs {
                encode_varint(input.witness.len() as u64, output);
                for item in &input.witness {
                    write_var_bytes(item, output);
                }
            }
        }

        output.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let version = cursor.read_i32_le()?;

        let rest = cursor.rest();
        let segwit = rest.len() >= 2 && rest[0] == 0x00 && rest[1] == 0x01;
        if segwit {
            cursor.skip(2)?;
        }

        let input_count = cursor.read_varint()?;
        let mut inputs = Vec::new();
        for _ in 0..input_count {
            let txid = cursor.read_array::<32>()?;
            let vout = cursor.read_u32_le()?;
            let script_sig = cursor.read_var_bytes()?.to_vec();
            let sequence = cursor.read_u32_le()?;
            inputs.push(TxInput {
                previous_output: OutPoint { txid, vout },
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }

        let output_count = cursor.read_varint()?;
        let mut outputs = Vec::new();
        for _ in 0..output_count {
            let value = cursor.read_u64_le()?;
            let script_pubkey = cursor.read_var_bytes()?.to_vec();
            outputs.push(TxOutput { value, script_pubkey });
        }

        if segwit {
            for input in inputs.iter_mut() {
                let items = cursor.read_varint()?;
                for _ in 0..items {
                    input.witness.push(cursor.read_var_bytes()?.to_vec());
                }
            }
        }

        let lock_time = cursor.read_u32_le()?;

        let tx = Transaction { version, inputs, outputs, lock_time };
        if segwit && !tx.has_witness() {
            return Err(DecodeError::SuperfluousWitness);
        }
        Ok(tx)
    }
}

impl TransactionCodec for Transaction {
    fn decode(bytes: &[u8]) -> Result<(Self, usize), DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let tx = Transaction::read(&mut cursor)?;
        Ok((tx, cursor.position()))
    }

    fn encode_to(&self, output: &mut Vec<u8>) {
        self.write(output, self.has_witness());
    }

    fn byte_length(&self) -> usize {
        if self.has_witness() {
            self.base_length() + 2 + self.witness_length()
        } else {
            self.base_length()
        }
    }
}

fn var_bytes_len(bytes: &[u8]) -> usize {
    varint_len(bytes.len() as u64) + bytes.len()
}

fn write_var_bytes(bytes: &[u8], output: &mut Vec<u8>) {
    encode_varint(bytes.len() as u64, output);
    output.extend_from_slice(bytes);
}

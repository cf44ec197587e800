//! # Transaction Model and Wire Codec
//!
//! Legacy Bitcoin transaction serialization:
//!
//! ```text
//! version(4 LE) | varint n_in | inputs... | varint n_out | outputs... | lock_time(4 LE)
//! input  = prev_txid(32) | prev_vout(4 LE) | varint len | unlocking_script | sequence(4 LE)
//! output = satoshis(8 LE) | varint len | locking_script
//! ```
//!
//! The transaction id is the double SHA-256 of exactly these bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entities::{hex_bytes, Hash, Outpoint, TxId};
use crate::errors::TypesError;

/// One input of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    /// Output being spent.
    pub source: Outpoint,
    #[serde(with = "hex_bytes")]
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
}

/// One output of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub satoshis: u64,
    #[serde(with = "hex_bytes")]
    pub locking_script: Vec<u8>,
}

/// A parsed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Parse a transaction from wire bytes.
    ///
    /// Rejects truncated input and trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let mut reader = Reader::new(bytes);

        let version = reader.read_u32()?;

        let input_count = reader.read_len()?;
        let mut inputs = Vec::with_capacity(input_count.min(bytes.len()));
        for _ in 0..input_count {
            let txid = TxId(reader.read_hash()?);
            let vout = reader.read_u32()?;
            let script_len = reader.read_len()?;
            let unlocking_script = reader.read_bytes(script_len)?.to_vec();
            let sequence = reader.read_u32()?;
            inputs.push(TransactionInput {
                source: Outpoint::new(txid, vout),
                unlocking_script,
                sequence,
            });
        }

        let output_count = reader.read_len()?;
        let mut outputs = Vec::with_capacity(output_count.min(bytes.len()));
        for _ in 0..output_count {
            let satoshis = reader.read_u64()?;
            let script_len = reader.read_len()?;
            let locking_script = reader.read_bytes(script_len)?.to_vec();
            outputs.push(TransactionOutput {
                satoshis,
                locking_script,
            });
        }

        let lock_time = reader.read_u32()?;

        if reader.remaining() > 0 {
            return Err(TypesError::TrailingData {
                remaining: reader.remaining(),
            });
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Parse a transaction from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::new();

        data.extend_from_slice(&self.version.to_le_bytes());

        write_varint(&mut data, self.inputs.len() as u64);
        for input in &self.inputs {
            data.extend_from_slice(input.source.txid.as_bytes());
            data.extend_from_slice(&input.source.vout.to_le_bytes());
            write_varint(&mut data, input.unlocking_script.len() as u64);
            data.extend_from_slice(&input.unlocking_script);
            data.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_varint(&mut data, self.outputs.len() as u64);
        for output in &self.outputs {
            data.extend_from_slice(&output.satoshis.to_le_bytes());
            write_varint(&mut data, output.locking_script.len() as u64);
            data.extend_from_slice(&output.locking_script);
        }

        data.extend_from_slice(&self.lock_time.to_le_bytes());
        data
    }

    /// Compute the transaction id.
    pub fn txid(&self) -> TxId {
        TxId(double_sha256(&self.to_bytes()))
    }

    /// Outpoints consumed by this transaction, in input order.
    pub fn input_outpoints(&self) -> Vec<Outpoint> {
        self.inputs.iter().map(|input| input.source).collect()
    }
}

/// SHA-256 applied twice.
pub fn double_sha256(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// Append a Bitcoin varint.
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Cursor over wire bytes.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], TypesError> {
        if self.remaining() < len {
            return Err(TypesError::UnexpectedEof {
                offset: self.offset,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TypesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, TypesError> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32, TypesError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, TypesError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    fn read_hash(&mut self) -> Result<Hash, TypesError> {
        self.read_array()
    }

    /// Only the shortest encoding is accepted, so re-serializing a parsed
    /// transaction reproduces the bytes its txid was computed over.
    fn read_varint(&mut self) -> Result<u64, TypesError> {
        let offset = self.offset;
        let (value, min) = match self.read_u8()? {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < min {
            return Err(TypesError::NonCanonicalVarint { offset });
        }
        Ok(value)
    }

    fn read_len(&mut self) -> Result<usize, TypesError> {
        let offset = self.offset;
        let value = self.read_varint()?;
        usize::try_from(value).map_err(|_| TypesError::LengthOverflow { offset })
    }
}

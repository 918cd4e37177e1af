//! Rollback log record types and payload codec.

use crate::error::{LogError, LogResult};

/// Magic bytes identifying a rollback log record.
pub const LOG_MAGIC: [u8; 4] = *b"YGRL";

/// Current rollback log format version.
pub const LOG_VERSION: u16 = 1;

/// Maximum size of a record payload. The envelope length field is 4 bytes.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Type of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// A committed transaction with its resulting configuration.
    Commit = 1,
    /// A confirmation window was armed for the preceding commit.
    PendingArm = 2,
    /// The open confirmation window was closed (confirmed or reverted).
    Resolve = 3,
}

impl RecordType {
    /// Converts a byte to a record type.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Commit),
            2 => Some(Self::PendingArm),
            3 => Some(Self::Resolve),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// The kind of edit a commit applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationKind {
    /// Patch subtree merged into the running configuration.
    Merge = 1,
    /// Submitted tree superseded the running configuration wholesale.
    Replace = 2,
    /// Ordered change patch applied step by step.
    Change = 3,
}

impl OperationKind {
    /// Converts a byte to an operation kind.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Merge),
            2 => Some(Self::Replace),
            3 => Some(Self::Change),
            _ => None,
        }
    }

    /// Converts the operation kind to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A fully-decoded committed-transaction record.
///
/// Immutable once written: this is the audit trail the rollback history is
/// built from. `tree` holds the resulting configuration in the binary tree
/// encoding; the log does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Transaction ID, strictly increasing across the log's lifetime.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// The kind of edit that produced this configuration.
    pub operation: OperationKind,
    /// Free-text comment supplied by the committer.
    pub comment: String,
    /// The full resulting configuration, binary tree encoding.
    pub tree: Vec<u8>,
}

/// A rollback log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A committed transaction.
    Commit(CommitRecord),
    /// A confirmation window armed for `txid`; on expiry the configuration
    /// reverts to the tree committed by `revert_txid` (0 = empty baseline).
    PendingArm {
        /// The unconfirmed transaction.
        txid: u64,
        /// Expiry deadline, nanoseconds since the Unix epoch.
        deadline_ns: u64,
        /// Transaction whose tree is the revert target.
        revert_txid: u64,
    },
    /// The confirmation window opened for `txid` was closed.
    Resolve {
        /// The transaction whose window closed.
        txid: u64,
    },
}

impl LogRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Commit(_) => RecordType::Commit,
            Self::PendingArm { .. } => RecordType::PendingArm,
            Self::Resolve { .. } => RecordType::Resolve,
        }
    }

    /// Serializes the record payload (without envelope).
    ///
    /// # Errors
    ///
    /// Fails if a commit's tree bytes exceed [`MAX_PAYLOAD_SIZE`].
    pub fn encode_payload(&self) -> LogResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Commit(record) => {
                if record.tree.len() > MAX_PAYLOAD_SIZE || record.comment.len() > MAX_PAYLOAD_SIZE {
                    return Err(LogError::corruption("commit record exceeds payload limit"));
                }
                buf.extend_from_slice(&record.txid.to_le_bytes());
                buf.extend_from_slice(&record.timestamp_ns.to_le_bytes());
                buf.push(record.operation.as_byte());
                buf.extend_from_slice(&(record.comment.len() as u32).to_le_bytes());
                buf.extend_from_slice(record.comment.as_bytes());
                buf.extend_from_slice(&(record.tree.len() as u32).to_le_bytes());
                buf.extend_from_slice(&record.tree);
            }
            Self::PendingArm {
                txid,
                deadline_ns,
                revert_txid,
            } => {
                buf.extend_from_slice(&txid.to_le_bytes());
                buf.extend_from_slice(&deadline_ns.to_le_bytes());
                buf.extend_from_slice(&revert_txid.to_le_bytes());
            }
            Self::Resolve { txid } => {
                buf.extend_from_slice(&txid.to_le_bytes());
            }
        }
        Ok(buf)
    }

    /// Deserializes a record payload of the given type.
    ///
    /// # Errors
    ///
    /// Fails with [`LogError::Corruption`] on short or malformed payloads.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> LogResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let record = match record_type {
            RecordType::Commit => {
                let txid = reader.read_u64()?;
                let timestamp_ns = reader.read_u64()?;
                let op_byte = reader.read_u8()?;
                let operation = OperationKind::from_byte(op_byte).ok_or_else(|| {
                    LogError::corruption(format!("unknown operation kind {op_byte}"))
                })?;
                let comment_len = reader.read_u32()? as usize;
                let comment = String::from_utf8(reader.read_bytes(comment_len)?.to_vec())
                    .map_err(|_| LogError::corruption("comment is not valid UTF-8"))?;
                let tree_len = reader.read_u32()? as usize;
                let tree = reader.read_bytes(tree_len)?.to_vec();
                Self::Commit(CommitRecord {
                    txid,
                    timestamp_ns,
                    operation,
                    comment,
                    tree,
                })
            }
            RecordType::PendingArm => Self::PendingArm {
                txid: reader.read_u64()?,
                deadline_ns: reader.read_u64()?,
                revert_txid: reader.read_u64()?,
            },
            RecordType::Resolve => Self::Resolve {
                txid: reader.read_u64()?,
            },
        };
        if !reader.at_end() {
            return Err(LogError::corruption("trailing bytes in record payload"));
        }
        Ok(record)
    }
}

struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_bytes(&mut self, len: usize) -> LogResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| LogError::corruption("record payload truncated"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> LogResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> LogResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> LogResult<u64> {
        let b = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }
}

/// Computes the CRC32 (IEEE polynomial) over `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

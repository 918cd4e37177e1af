//! The append-only rollback log.

use crate::error::{LogError, LogResult};
use crate::record::{
    compute_crc32, CommitRecord, LogRecord, OperationKind, RecordType, LOG_MAGIC, LOG_VERSION,
};
use crate::store::LogStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Header size for log records.
/// magic (4) + version (2) + type (1) + length (4) = 11 bytes
const HEADER_SIZE: usize = 11;

/// CRC size.
const CRC_SIZE: usize = 4;

/// Metadata for one committed transaction, without the tree bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Transaction ID.
    pub txid: u64,
    /// Commit time, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// The kind of edit that produced this configuration.
    pub operation: OperationKind,
    /// Free-text comment supplied by the committer.
    pub comment: String,
}

/// An armed-but-unresolved confirmation window recovered from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMarker {
    /// The unconfirmed transaction.
    pub txid: u64,
    /// Expiry deadline, nanoseconds since the Unix epoch.
    pub deadline_ns: u64,
    /// Transaction whose tree is the revert target (0 = empty baseline).
    pub revert_txid: u64,
}

/// Index entry: where a commit record lives and what it is.
#[derive(Debug, Clone)]
struct IndexEntry {
    offset: u64,
    summary: CommitSummary,
}

struct Inner {
    store: Box<dyn LogStore>,
    /// Commit index, ordered by transaction ID.
    index: BTreeMap<u64, IndexEntry>,
    /// Next transaction ID to hand out.
    next_txid: u64,
    /// Open confirmation window, if any survived the scan.
    pending: Option<PendingMarker>,
}

/// The durable rollback log: one record per committed transaction, plus
/// confirmation-window markers.
///
/// All reads of record payloads go back to the store; only summaries and
/// offsets are held in memory, so memory use stays proportional to the
/// number of commits rather than to configuration size.
pub struct RollbackLog {
    inner: Mutex<Inner>,
}

impl RollbackLog {
    /// Opens a log over the given store, scanning it to rebuild the commit
    /// index, the ID counter, and any unresolved confirmation window.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or if the store's contents are corrupt. A
    /// truncated final record is not corruption; it is discarded as a
    /// crashed append that was never acknowledged.
    pub fn open(store: Box<dyn LogStore>) -> LogResult<Self> {
        let mut index = BTreeMap::new();
        let mut max_txid = 0u64;
        let mut pending: Option<PendingMarker> = None;

        let total = store.len()?;
        let mut offset = 0u64;
        while offset < total {
            let remaining = total - offset;
            if remaining < HEADER_SIZE as u64 {
                warn!(offset, remaining, "truncated record header at log tail, discarding");
                break;
            }
            let header = store.read_at(offset, HEADER_SIZE)?;
            if header[0..4] != LOG_MAGIC {
                return Err(LogError::corruption(format!(
                    "bad record magic at offset {offset}"
                )));
            }
            let version = u16::from_le_bytes([header[4], header[5]]);
            if version != LOG_VERSION {
                return Err(LogError::UnsupportedVersion { found: version });
            }
            let type_byte = header[6];
            let record_type = RecordType::from_byte(type_byte).ok_or_else(|| {
                LogError::corruption(format!("unknown record type {type_byte} at offset {offset}"))
            })?;
            let payload_len =
                u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as u64;

            let record_len = HEADER_SIZE as u64 + payload_len + CRC_SIZE as u64;
            if remaining < record_len {
                warn!(offset, remaining, record_len, "truncated record at log tail, discarding");
                break;
            }

            let body = store.read_at(
                offset + HEADER_SIZE as u64,
                payload_len as usize + CRC_SIZE,
            )?;
            let (payload, crc_bytes) = body.split_at(payload_len as usize);

            let mut covered = header;
            covered.extend_from_slice(payload);
            let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
            let actual = compute_crc32(&covered);
            if actual != expected {
                return Err(LogError::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
            }

            match LogRecord::decode_payload(record_type, payload)? {
                LogRecord::Commit(record) => {
                    if record.txid <= max_txid && max_txid != 0 {
                        return Err(LogError::corruption(format!(
                            "non-increasing transaction ID {} at offset {offset}",
                            record.txid
                        )));
                    }
                    max_txid = record.txid;
                    index.insert(
                        record.txid,
                        IndexEntry {
                            offset,
                            summary: CommitSummary {
                                txid: record.txid,
                                timestamp_ns: record.timestamp_ns,
                                operation: record.operation,
                                comment: record.comment,
                            },
                        },
                    );
                }
                LogRecord::PendingArm {
                    txid,
                    deadline_ns,
                    revert_txid,
                } => {
                    pending = Some(PendingMarker {
                        txid,
                        deadline_ns,
                        revert_txid,
                    });
                }
                LogRecord::Resolve { txid } => {
                    if pending.map_or(false, |p| p.txid == txid) {
                        pending = None;
                    }
                }
            }

            offset += record_len;
        }

        debug!(
            commits = index.len(),
            next_txid = max_txid + 1,
            pending = pending.is_some(),
            "rollback log opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                index,
                next_txid: max_txid + 1,
                pending,
            }),
        })
    }

    /// Appends a commit record and returns the transaction ID it was
    /// assigned. The ID is allocated only once the record is durably on
    /// the store, so a failed append consumes no ID.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or when the 64-bit ID space is exhausted.
    pub fn append_commit(
        &self,
        timestamp_ns: u64,
        operation: OperationKind,
        comment: &str,
        tree: Vec<u8>,
    ) -> LogResult<u64> {
        let mut inner = self.inner.lock();
        if inner.next_txid == u64::MAX {
            return Err(LogError::IdExhausted);
        }
        let txid = inner.next_txid;
        let record = LogRecord::Commit(CommitRecord {
            txid,
            timestamp_ns,
            operation,
            comment: comment.to_string(),
            tree,
        });
        let offset = append_record(&mut *inner.store, &record)?;
        inner.next_txid = txid + 1;
        let LogRecord::Commit(record) = record else {
            unreachable!()
        };
        inner.index.insert(
            txid,
            IndexEntry {
                offset,
                summary: CommitSummary {
                    txid,
                    timestamp_ns,
                    operation,
                    comment: record.comment,
                },
            },
        );
        debug!(txid, ?operation, "commit record appended");
        Ok(txid)
    }

    /// Durably records that a confirmation window was armed for `txid`.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn append_pending(&self, txid: u64, deadline_ns: u64, revert_txid: u64) -> LogResult<()> {
        let mut inner = self.inner.lock();
        append_record(
            &mut *inner.store,
            &LogRecord::PendingArm {
                txid,
                deadline_ns,
                revert_txid,
            },
        )?;
        inner.pending = Some(PendingMarker {
            txid,
            deadline_ns,
            revert_txid,
        });
        debug!(txid, deadline_ns, revert_txid, "confirmation window armed");
        Ok(())
    }

    /// Durably records that the confirmation window for `txid` was closed.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn append_resolve(&self, txid: u64) -> LogResult<()> {
        let mut inner = self.inner.lock();
        append_record(&mut *inner.store, &LogRecord::Resolve { txid })?;
        if inner.pending.map_or(false, |p| p.txid == txid) {
            inner.pending = None;
        }
        debug!(txid, "confirmation window resolved");
        Ok(())
    }

    /// Returns the full record for a transaction, re-read and re-verified
    /// from the store.
    ///
    /// # Errors
    ///
    /// Fails with [`LogError::NotFound`] for unknown IDs, or on I/O or
    /// corruption errors.
    pub fn get(&self, txid: u64) -> LogResult<CommitRecord> {
        let inner = self.inner.lock();
        let entry = inner.index.get(&txid).ok_or(LogError::NotFound { txid })?;
        let record = read_record_at(&*inner.store, entry.offset)?;
        match record {
            LogRecord::Commit(commit) if commit.txid == txid => Ok(commit),
            _ => Err(LogError::corruption(format!(
                "index offset for transaction {txid} does not hold its commit record"
            ))),
        }
    }

    /// Returns summaries of all committed transactions, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<CommitSummary> {
        let inner = self.inner.lock();
        inner.index.values().map(|e| e.summary.clone()).collect()
    }

    /// Summary of the most recent commit, if any.
    #[must_use]
    pub fn latest(&self) -> Option<CommitSummary> {
        let inner = self.inner.lock();
        inner.index.values().next_back().map(|e| e.summary.clone())
    }

    /// The unresolved confirmation window, if one survived the open scan or
    /// was armed since.
    #[must_use]
    pub fn pending(&self) -> Option<PendingMarker> {
        self.inner.lock().pending
    }

    /// Number of committed transactions in the log.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.inner.lock().index.len()
    }

    /// The transaction ID the next successful commit will receive.
    #[must_use]
    pub fn next_txid(&self) -> u64 {
        self.inner.lock().next_txid
    }
}

impl std::fmt::Debug for RollbackLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RollbackLog")
            .field("commits", &inner.index.len())
            .field("next_txid", &inner.next_txid)
            .field("pending", &inner.pending)
            .finish()
    }
}

/// Encodes a record with its envelope and appends it durably.
fn append_record(store: &mut dyn LogStore, record: &LogRecord) -> LogResult<u64> {
    let payload = record.encode_payload()?;
    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    data.extend_from_slice(&LOG_MAGIC);
    data.extend_from_slice(&LOG_VERSION.to_le_bytes());
    data.push(record.record_type().as_byte());
    let len = u32::try_from(payload.len())
        .map_err(|_| LogError::corruption("record payload too large"))?;
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(&payload);
    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());

    let offset = store.append(&data)?;
    store.flush()?;
    Ok(offset)
}

/// Reads and verifies one record at a known offset.
fn read_record_at(store: &dyn LogStore, offset: u64) -> LogResult<LogRecord> {
    let header = store.read_at(offset, HEADER_SIZE)?;
    if header[0..4] != LOG_MAGIC {
        return Err(LogError::corruption(format!(
            "bad record magic at offset {offset}"
        )));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != LOG_VERSION {
        return Err(LogError::UnsupportedVersion { found: version });
    }
    let record_type = RecordType::from_byte(header[6]).ok_or_else(|| {
        LogError::corruption(format!("unknown record type at offset {offset}"))
    })?;
    let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;

    let body = store.read_at(offset + HEADER_SIZE as u64, payload_len + CRC_SIZE)?;
    let (payload, crc_bytes) = body.split_at(payload_len);
    let mut covered = header;
    covered.extend_from_slice(payload);
    let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    let actual = compute_crc32(&covered);
    if actual != expected {
        return Err(LogError::ChecksumMismatch {
            offset,
            expected,
            actual,
        });
    }
    LogRecord::decode_payload(record_type, payload)
}

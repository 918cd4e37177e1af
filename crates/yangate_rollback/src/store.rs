//! Byte stores underlying the rollback log.
//!
//! Stores are opaque append-only byte sinks with positional reads; the log
//! owns all record framing and interpretation.

use crate::error::{LogError, LogResult};
use fs2::FileExt;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Low-level storage for the rollback log.
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_at` returns exactly the bytes previously appended there
/// - after `flush` returns, appended data survives process termination
pub trait LogStore: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`LogError::ReadPastEnd`] if the range is not fully
    /// within the store, or with an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> LogResult<Vec<u8>>;

    /// Appends data, returning the offset it was written at.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn append(&mut self, data: &[u8]) -> LogResult<u64>;

    /// Flushes appended data to durable storage.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    fn flush(&mut self) -> LogResult<()>;

    /// Current size in bytes (the offset of the next append).
    ///
    /// # Errors
    ///
    /// Fails if the size cannot be determined.
    fn len(&self) -> LogResult<u64>;

    /// True if the store holds no bytes.
    ///
    /// # Errors
    ///
    /// Fails if the size cannot be determined.
    fn is_empty(&self) -> LogResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// File-backed store with an exclusive advisory lock.
///
/// The lock is taken at open and held for the store's lifetime, so two
/// processes can never append to the same rollback log.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FileStore {
    /// Opens or creates the log file at `path`, creating parent directories
    /// as needed.
    ///
    /// # Errors
    ///
    /// Fails with [`LogError::Locked`] if another process holds the file,
    /// or with an I/O error.
    pub fn open(path: &Path) -> LogResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.try_lock_exclusive().map_err(|_| LogError::Locked)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            size: RwLock::new(size),
        })
    }

    /// The path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for FileStore {
    fn read_at(&self, offset: u64, len: usize) -> LogResult<Vec<u8>> {
        let size = *self.size.read();
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(LogError::ReadPastEnd { offset, len, size });
        }
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> LogResult<u64> {
        let mut file = self.file.write();
        let mut size = self.size.write();
        file.seek(SeekFrom::Start(*size))?;
        file.write_all(data)?;
        let offset = *size;
        *size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> LogResult<()> {
        let file = self.file.write();
        file.sync_data()?;
        Ok(())
    }

    fn len(&self) -> LogResult<u64> {
        Ok(*self.size.read())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&*self.file.read());
    }
}

/// In-memory store for tests and ephemeral engines.
#[derive(Debug, Default)]
pub struct MemStore {
    data: RwLock<Vec<u8>>,
}

impl MemStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with bytes, for recovery tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// A copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogStore for MemStore {
    fn read_at(&self, offset: u64, len: usize) -> LogResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);
        if offset > size || end > data.len() {
            return Err(LogError::ReadPastEnd { offset, len, size });
        }
        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> LogResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> LogResult<()> {
        Ok(())
    }

    fn len(&self) -> LogResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_store_append_read() {
        let mut store = MemStore::new();
        let offset = store.append(b"hello").unwrap();
        assert_eq!(offset, 0);
        assert_eq!(store.append(b" log").unwrap(), 5);
        assert_eq!(store.read_at(0, 9).unwrap(), b"hello log");
        assert_eq!(store.len().unwrap(), 9);
    }

    #[test]
    fn mem_store_read_past_end() {
        let store = MemStore::with_data(b"xy".to_vec());
        assert!(matches!(
            store.read_at(1, 5).unwrap_err(),
            LogError::ReadPastEnd { .. }
        ));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("rollback.log");
        {
            let mut store = FileStore::open(&path).unwrap();
            store.append(b"record one").unwrap();
            store.flush().unwrap();
        }
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.read_at(0, 10).unwrap(), b"record one");
    }

    #[test]
    fn file_store_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollback.log");
        let _first = FileStore::open(&path).unwrap();
        assert!(matches!(
            FileStore::open(&path).unwrap_err(),
            LogError::Locked
        ));
    }
}

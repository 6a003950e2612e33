//! Synchronous positioned file I/O.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::StoreResult;

/// A read/write handle on the store's single backing file.
///
/// All access is positioned: every read and write seeks to an absolute
/// byte offset first, so the adapter carries no cursor state of its own.
pub struct StoreFile {
    /// The underlying file, wrapped in a mutex so reads can run on `&self`.
    file: Mutex<File>,
    /// The file path, kept for diagnostics.
    path: PathBuf,
}

impl StoreFile {
    /// Creates (or truncates) the file at `path` for read/write access.
    pub fn create(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Opens an existing file at `path` for read/write access.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Fills `buf` from the file starting at `offset`, failing on a short
    /// read.
    pub fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> StoreResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Writes all of `buf` to the file starting at `offset`.
    pub fn write_all_at(&self, buf: &[u8], offset: u64) -> StoreResult<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    /// Forces all prior writes to stable storage before returning.
    pub fn sync(&self) -> StoreResult<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }

    /// Returns the current file length in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        let file = self.file.lock();
        Ok(file.metadata()?.len())
    }

    /// Grows or shrinks the file to `len` bytes; new bytes read as zero.
    pub fn set_len(&self, len: u64) -> StoreResult<()> {
        let file = self.file.lock();
        file.set_len(len)?;
        Ok(())
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for StoreFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreFile").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.pgv");

        let file = StoreFile::create(&path).unwrap();
        assert_eq!(file.path(), path);
        assert_eq!(file.size().unwrap(), 0);
        drop(file);

        let file = StoreFile::open(&path).unwrap();
        assert_eq!(file.size().unwrap(), 0);
    }

    #[test]
    fn test_open_missing_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(StoreFile::open(tmp.path().join("missing.pgv")).is_err());
    }

    #[test]
    fn test_positioned_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let file = StoreFile::create(tmp.path().join("rw.pgv")).unwrap();

        file.write_all_at(b"0123456789", 100).unwrap();
        file.sync().unwrap();
        assert_eq!(file.size().unwrap(), 110);

        let mut buf = [0u8; 10];
        file.read_exact_at(&mut buf, 100).unwrap();
        assert_eq!(&buf, b"0123456789");

        // The gap before the write reads as zeros.
        let mut gap = [0xFFu8; 4];
        file.read_exact_at(&mut gap, 0).unwrap();
        assert_eq!(gap, [0u8; 4]);
    }

    #[test]
    fn test_short_read_fails() {
        let tmp = TempDir::new().unwrap();
        let file = StoreFile::create(tmp.path().join("short.pgv")).unwrap();
        file.write_all_at(b"abc", 0).unwrap();

        let mut buf = [0u8; 8];
        assert!(file.read_exact_at(&mut buf, 0).is_err());
    }

    #[test]
    fn test_set_len_zero_fills() {
        let tmp = TempDir::new().unwrap();
        let file = StoreFile::create(tmp.path().join("len.pgv")).unwrap();

        file.set_len(64).unwrap();
        assert_eq!(file.size().unwrap(), 64);

        let mut buf = [0xFFu8; 64];
        file.read_exact_at(&mut buf, 0).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }
}

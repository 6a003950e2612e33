//! Store error types.

use std::io;

use thiserror::Error;

use pagevault_common::constants::{FORMAT_VERSION, HEADER_PAGES, MIN_PAGE_SIZE};
use pagevault_common::types::PageId;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during page store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the backing file.
    #[error("store I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Page size rejected at creation.
    #[error("invalid page size {page_size}: must be a power of two of at least {MIN_PAGE_SIZE} bytes")]
    InvalidPageSize {
        /// The rejected page size.
        page_size: u32,
    },

    /// Neither header slot holds a usable record, or the file is not a store.
    #[error("corrupt page store: {reason}")]
    Corrupt {
        /// Description of what failed validation.
        reason: String,
    },

    /// Header record does not start with the store magic.
    #[error("invalid header magic: {found:02x?}")]
    InvalidMagic {
        /// The bytes found where the magic was expected.
        found: [u8; 4],
    },

    /// Header checksum does not match its contents.
    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        stored: u32,
        /// Checksum computed over the header bytes.
        computed: u32,
    },

    /// Header carries a format version this build cannot read.
    #[error("unsupported format version: expected {FORMAT_VERSION}, found {found}")]
    UnsupportedVersion {
        /// The version found in the header.
        found: u32,
    },

    /// Page id outside the valid data range.
    #[error("page {page_id} out of bounds (page count {page_count})")]
    PageOutOfBounds {
        /// The offending page id.
        page_id: PageId,
        /// Current page count of the store.
        page_count: u32,
    },

    /// Operation targeted one of the reserved header pages.
    #[error("page {page_id} is a reserved header page (ids below {HEADER_PAGES})")]
    ReservedPage {
        /// The offending page id.
        page_id: PageId,
    },

    /// Buffer handed to a page write has the wrong length.
    #[error("page buffer is {actual} bytes, page size is {expected}")]
    WrongBufferLength {
        /// The store's page size.
        expected: u32,
        /// Length of the rejected buffer.
        actual: usize,
    },

    /// A single batch freed more pages than one header can record.
    #[error("pending-free capacity exceeded: at most {max} pages may be freed per commit")]
    PendingFreeOverflow {
        /// Maximum pending entries for this page size.
        max: usize,
    },
}

impl StoreError {
    /// Creates a corruption error with the given reason.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }

    /// Returns true if this error reports on-disk corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. }
                | Self::InvalidMagic { .. }
                | Self::ChecksumMismatch { .. }
                | Self::UnsupportedVersion { .. }
        )
    }

    /// Returns true if this error reports a caller precondition violation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::PageOutOfBounds { .. }
                | Self::ReservedPage { .. }
                | Self::WrongBufferLength { .. }
                | Self::PendingFreeOverflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = StoreError::corrupt("both header slots invalid");
        assert!(err.is_corruption());
        assert!(!err.is_precondition());

        let err = StoreError::ChecksumMismatch {
            stored: 0x1234,
            computed: 0x5678,
        };
        assert!(err.is_corruption());

        let err = StoreError::ReservedPage {
            page_id: PageId::new(1),
        };
        assert!(err.is_precondition());
        assert!(!err.is_corruption());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::PageOutOfBounds {
            page_id: PageId::new(9),
            page_count: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains('9'));
        assert!(msg.contains('4'));

        let err = StoreError::InvalidPageSize { page_size: 100 };
        assert!(format!("{}", err).contains("100"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!err.is_corruption());
    }
}

//! Page-level disk format for PageVault.
//!
//! This module implements the header record that lives in pages `0` and
//! `1` of every store file, plus the checksum routine that guards it.
//!
//! # Header Record Layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       4   magic ("PGST")
//!   4       4   version
//!   8       4   page_size
//!  12       4   page_count
//!  16       8   epoch
//!  24       4   meta_root
//!  28       4   free_list_head
//!  32       2   pending_count
//!  34      4n   pending_free[0..n]
//! 34+4n     4   checksum (CRC-32 of all preceding bytes)
//! ```
//!
//! All integers are big-endian. Bytes past the checksum are zero padding
//! and are not covered by it.

mod checksum;
mod header;

pub use checksum::{compute_checksum, compute_checksum_range, verify_checksum};
pub use header::{max_pending_free, StoreHeader, PAGE_SIZE_FIELD_OFFSET};

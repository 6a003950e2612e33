//! On-disk format constants for PageVault.
//!
//! These values define the container layout and must never change for a
//! given format version.

// =============================================================================
// Container Layout
// =============================================================================

/// Magic bytes at the start of every header record (`PGST` in ASCII).
pub const STORE_MAGIC: [u8; 4] = *b"PGST";

/// On-disk format version written into every header.
pub const FORMAT_VERSION: u32 = 1;

/// Number of reserved header pages at the front of the file.
///
/// Pages `0` and `1` hold the two alternating header slots; data pages
/// start at index `2`.
pub const HEADER_PAGES: u32 = 2;

/// Minimum supported page size in bytes.
///
/// A page must also be a power of two. The minimum guarantees a header
/// record with its checksum always fits in one page.
pub const MIN_PAGE_SIZE: u32 = 64;

// =============================================================================
// Header Record Layout
// =============================================================================

/// Size of the fixed header prefix in bytes.
///
/// magic (4) + version (4) + page_size (4) + page_count (4) + epoch (8)
/// + meta_root (4) + free_list_head (4) + pending_count (2) = 34 bytes.
pub const HEADER_FIXED_SIZE: usize = 34;

/// Size of the CRC-32 trailer that follows the pending-free array.
pub const HEADER_CHECKSUM_SIZE: usize = 4;

/// Size of one pending-free entry in the header.
pub const PENDING_ENTRY_SIZE: usize = 4;

/// Size of the next-link prefix stored in every free page.
pub const FREE_LINK_SIZE: usize = 4;

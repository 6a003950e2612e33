//! Header record codec.
//!
//! A header record describes one committed state of the store: the page
//! count, the commit epoch, the caller's root page, the head of the
//! on-disk free list, and the ids freed by the commit that wrote it
//! (the pending-free array). Two records alternate between pages `0` and
//! `1`; see the module docs of [`crate::page`] for the byte layout.

use bytes::{Buf, BufMut};

use pagevault_common::constants::{
    FORMAT_VERSION, HEADER_CHECKSUM_SIZE, HEADER_FIXED_SIZE, HEADER_PAGES, PENDING_ENTRY_SIZE,
    STORE_MAGIC,
};
use pagevault_common::types::{Epoch, PageId};

use super::checksum::compute_checksum;
use crate::error::{StoreError, StoreResult};

/// Byte offset of the page-size field within a serialized header.
///
/// Open reads this field from slot 0 before it knows how large a header
/// page is.
pub const PAGE_SIZE_FIELD_OFFSET: u64 = 8;

/// Maximum number of pending-free entries a header of the given page size
/// can record.
#[inline]
#[must_use]
pub fn max_pending_free(page_size: u32) -> usize {
    (page_size as usize).saturating_sub(HEADER_FIXED_SIZE + HEADER_CHECKSUM_SIZE)
        / PENDING_ENTRY_SIZE
}

/// A parsed header record.
///
/// Encoding always produces a buffer of exactly `page_size` bytes with
/// zero padding past the checksum; decoding validates magic, pending-count
/// bounds, and the CRC-32 trailer before returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    /// On-disk format version.
    pub version: u32,
    /// Page size in bytes, repeated in every header.
    pub page_size: u32,
    /// Total pages in the file, including the two header pages.
    pub page_count: u32,
    /// Commit counter; strictly increases across committed headers.
    pub epoch: Epoch,
    /// Caller-defined root page, `PageId::NONE` if unset.
    pub meta_root: PageId,
    /// Head of the on-disk free list, `PageId::NONE` if empty.
    pub free_list_head: PageId,
    /// Pages freed by the commit that wrote this header, not yet linked
    /// into the free list.
    pub pending_free: Vec<PageId>,
}

impl StoreHeader {
    /// Returns the initial header of a freshly created store: two header
    /// pages, epoch zero, no root, no free pages.
    #[must_use]
    pub fn initial(page_size: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            page_size,
            page_count: HEADER_PAGES,
            epoch: Epoch::ZERO,
            meta_root: PageId::NONE,
            free_list_head: PageId::NONE,
            pending_free: Vec::new(),
        }
    }

    /// Byte offset of the checksum within the serialized record.
    #[must_use]
    pub fn checksum_offset(&self) -> usize {
        HEADER_FIXED_SIZE + self.pending_free.len() * PENDING_ENTRY_SIZE
    }

    /// Serializes the record into a buffer of exactly `page_size` bytes.
    ///
    /// Fails if the pending-free array does not fit the page.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let max = max_pending_free(self.page_size);
        if self.pending_free.len() > max {
            return Err(StoreError::PendingFreeOverflow { max });
        }

        let page_size = self.page_size as usize;
        let mut buf = Vec::with_capacity(page_size);
        buf.put_slice(&STORE_MAGIC);
        buf.put_u32(self.version);
        buf.put_u32(self.page_size);
        buf.put_u32(self.page_count);
        buf.put_u64(self.epoch.as_u64());
        buf.put_u32(self.meta_root.as_u32());
        buf.put_u32(self.free_list_head.as_u32());
        buf.put_u16(self.pending_free.len() as u16);
        for id in &self.pending_free {
            buf.put_u32(id.as_u32());
        }

        let checksum = compute_checksum(&buf);
        buf.put_u32(checksum);
        buf.resize(page_size, 0);
        Ok(buf)
    }

    /// Parses a record from a serialized header page.
    ///
    /// Fails on a short buffer, wrong magic, a pending count beyond the
    /// page's capacity, a checksum region running past the buffer, or a
    /// checksum mismatch. Callers treat any failure as "this slot holds no
    /// valid header".
    pub fn decode(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.len() < HEADER_FIXED_SIZE + HEADER_CHECKSUM_SIZE {
            return Err(StoreError::corrupt(format!(
                "header buffer too short: {} bytes",
                bytes.len()
            )));
        }
        if bytes[..4] != STORE_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&bytes[..4]);
            return Err(StoreError::InvalidMagic { found });
        }

        let mut cur = &bytes[4..];
        let version = cur.get_u32();
        let page_size = cur.get_u32();
        let page_count = cur.get_u32();
        let epoch = Epoch::new(cur.get_u64());
        let meta_root = PageId::new(cur.get_u32());
        let free_list_head = PageId::new(cur.get_u32());
        let pending_count = cur.get_u16() as usize;

        let max = max_pending_free(page_size);
        if pending_count > max {
            return Err(StoreError::corrupt(format!(
                "pending count {pending_count} exceeds capacity {max}"
            )));
        }
        let checksum_offset = HEADER_FIXED_SIZE + pending_count * PENDING_ENTRY_SIZE;
        if checksum_offset + HEADER_CHECKSUM_SIZE > bytes.len() {
            return Err(StoreError::corrupt(
                "header checksum region runs past the buffer",
            ));
        }

        let mut pending_free = Vec::with_capacity(pending_count);
        for _ in 0..pending_count {
            pending_free.push(PageId::new(cur.get_u32()));
        }
        let stored = cur.get_u32();

        let computed = compute_checksum(&bytes[..checksum_offset]);
        if stored != computed {
            return Err(StoreError::ChecksumMismatch { stored, computed });
        }

        Ok(Self {
            version,
            page_size,
            page_count,
            epoch,
            meta_root,
            free_list_head,
            pending_free,
        })
    }
}

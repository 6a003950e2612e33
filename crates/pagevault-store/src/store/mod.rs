//! The page store core.
//!
//! A [`PageStore`] owns one backing file and an in-memory view of its
//! committed state: the active header record, the index of the slot it
//! came from, and a deque mirroring the on-disk free-page chain. All
//! mutation flows through a [`Transaction`] and lands in a single atomic
//! commit:
//!
//! 1. write the batch's data pages, sync;
//! 2. write the next header (epoch + 1) into the slot that is *not*
//!    active, sync;
//! 3. flip the in-memory active slot.
//!
//! A crash before step 2 completes leaves the previous header
//! authoritative and the half-written pages unreferenced; a crash after
//! it presents the new state to the next open.
//!
//! # Free-page reclamation
//!
//! Freeing is deferred by one commit. The commit that observes `free(p)`
//! records `p` in its header's pending-free array and leaves the on-disk
//! free chain untouched; only once that header is durable may `p`'s bytes
//! be reused. The next transaction (or the next open, whichever comes
//! first) links the pending pages into the chain and makes them
//! allocatable. Because the links are recomputed from the header's
//! pending array, the linking step is idempotent across crashes.

mod transaction;

use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, trace};

use pagevault_common::constants::{FORMAT_VERSION, FREE_LINK_SIZE, MIN_PAGE_SIZE};
use pagevault_common::types::{Epoch, PageId};

use crate::error::{StoreError, StoreResult};
use crate::file::StoreFile;
use crate::page::{StoreHeader, PAGE_SIZE_FIELD_OFFSET};

pub use transaction::Transaction;
use transaction::WriteBatch;

/// A crash-safe, atomic, durable page store over a single file.
///
/// See the [module docs](self) for the commit and reclamation protocol.
/// The store is single-threaded: at most one transaction is outstanding
/// at a time, which the borrow checker enforces because a transaction
/// mutably borrows its store.
#[derive(Debug)]
pub struct PageStore {
    /// The backing file, exclusively owned.
    file: StoreFile,
    /// The committed header this session considers authoritative.
    header: StoreHeader,
    /// Slot index (0 or 1) the authoritative header came from.
    active_slot: u32,
    /// In-memory mirror of the allocatable free pages, chain order.
    free_list: VecDeque<PageId>,
    /// Whether this session already linked the active header's pending
    /// frees into the chain. Reset on every installed header.
    pending_linked: bool,
}

impl PageStore {
    /// Creates a new store at `path` with the given page size.
    ///
    /// The page size must be a power of two of at least 64 bytes and is
    /// immutable for the life of the file. Any existing file at `path` is
    /// truncated. The new store holds only the two header pages.
    pub fn create(path: impl AsRef<Path>, page_size: u32) -> StoreResult<Self> {
        if page_size < MIN_PAGE_SIZE || !page_size.is_power_of_two() {
            return Err(StoreError::InvalidPageSize { page_size });
        }

        let file = StoreFile::create(path)?;
        let header = StoreHeader::initial(page_size);
        let buf = header.encode()?;
        file.write_all_at(&buf, 0)?;
        file.write_all_at(&buf, u64::from(page_size))?;
        file.sync()?;

        debug!(path = %file.path().display(), page_size, "created page store");
        Ok(Self {
            file,
            header,
            active_slot: 0,
            free_list: VecDeque::new(),
            pending_linked: false,
        })
    }

    /// Opens an existing store at `path`.
    ///
    /// Reads the page size from slot 0, parses both header slots, and
    /// selects the valid one with the higher epoch (slot 0 on a tie). If
    /// the selected header carries pending frees from an interrupted
    /// session, their reclamation is completed before the store is
    /// returned.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let file = StoreFile::open(path)?;

        let mut probe = [0u8; 4];
        file.read_exact_at(&mut probe, PAGE_SIZE_FIELD_OFFSET)?;
        let page_size = u32::from_be_bytes(probe);
        if page_size < MIN_PAGE_SIZE || !page_size.is_power_of_two() {
            return Err(StoreError::corrupt(format!(
                "implausible page size {page_size}"
            )));
        }

        let slot0 = Self::read_slot(&file, 0, page_size);
        let slot1 = Self::read_slot(&file, 1, page_size);
        let (header, active_slot) = match (slot0, slot1) {
            (Some(h0), Some(h1)) => {
                if h1.epoch > h0.epoch {
                    (h1, 1)
                } else {
                    (h0, 0)
                }
            }
            (Some(h0), None) => (h0, 0),
            (None, Some(h1)) => (h1, 1),
            (None, None) => {
                return Err(StoreError::corrupt("no valid header in either slot"));
            }
        };
        if header.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: header.version,
            });
        }

        debug!(
            path = %file.path().display(),
            slot = active_slot,
            epoch = %header.epoch,
            "opened page store"
        );

        let mut store = Self {
            file,
            header,
            active_slot,
            free_list: VecDeque::new(),
            pending_linked: false,
        };
        if store.header.pending_free.is_empty() {
            store.free_list =
                store.walk_free_chain(store.header.free_list_head, store.header.page_count)?;
        } else {
            store.reclaim_pending_at_open()?;
        }
        Ok(store)
    }

    /// Returns the store's page size in bytes.
    #[inline]
    pub fn page_size(&self) -> u32 {
        self.header.page_size
    }

    /// Returns the committed caller-defined root page id.
    #[inline]
    pub fn meta_root(&self) -> PageId {
        self.header.meta_root
    }

    /// Returns the committed epoch.
    #[inline]
    pub fn epoch(&self) -> Epoch {
        self.header.epoch
    }

    /// Returns the committed page count, including the two header pages.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.header.page_count
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads the committed contents of a data page.
    ///
    /// Returns a freshly owned copy of the on-disk bytes. Fails with a
    /// precondition error for header pages and ids at or beyond the
    /// committed page count.
    pub fn read(&self, id: PageId) -> StoreResult<Vec<u8>> {
        check_data_page(id, self.header.page_count)?;
        let mut buf = vec![0u8; self.header.page_size as usize];
        self.file.read_exact_at(&mut buf, id.offset(self.header.page_size))?;
        Ok(buf)
    }

    /// Begins an explicit transaction.
    ///
    /// If the active header carries pending frees not yet linked in this
    /// session, they are linked into the free chain first, making them
    /// available to this transaction's allocations.
    pub fn begin_transaction(&mut self) -> StoreResult<Transaction<'_>> {
        self.link_pending_frees()?;
        Ok(Transaction::new(self))
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back
    /// on `Err`.
    ///
    /// On rollback the error is propagated unchanged and the store's
    /// committed state is untouched. A panic inside `f` also rolls the
    /// transaction back (in memory) while the panic unwinds.
    pub fn modify<T, F>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> StoreResult<T>,
    {
        let mut txn = self.begin_transaction()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.rollback();
                Err(err)
            }
        }
    }

    /// Closes the store, dropping the backing file handle.
    ///
    /// Nothing is committed or synced: an unlinked pending-free array is
    /// left for the next open's reclamation pass.
    pub fn close(self) -> StoreResult<()> {
        Ok(())
    }

    // =========================================================================
    // Header slots
    // =========================================================================

    fn read_slot(file: &StoreFile, slot: u32, page_size: u32) -> Option<StoreHeader> {
        let mut buf = vec![0u8; page_size as usize];
        file.read_exact_at(&mut buf, u64::from(slot) * u64::from(page_size))
            .ok()?;
        StoreHeader::decode(&buf).ok()
    }

    /// Writes `next` into the stale slot, syncs, and flips the in-memory
    /// active slot. The data this header references must already be
    /// durable.
    fn install_header(&mut self, next: StoreHeader) -> StoreResult<()> {
        let buf = next.encode()?;
        let stale = 1 - self.active_slot;
        self.file
            .write_all_at(&buf, u64::from(stale) * u64::from(self.header.page_size))?;
        self.file.sync()?;

        self.header = next;
        self.active_slot = stale;
        self.pending_linked = false;
        Ok(())
    }

    // =========================================================================
    // Free-page reclamation
    // =========================================================================

    /// Rebuilds the free deque by walking the on-disk chain from `head`.
    ///
    /// Every link is validated against the data-page range and the walk is
    /// capped at `page_count` nodes, so a damaged chain surfaces as a
    /// corruption error rather than an endless or out-of-range walk.
    fn walk_free_chain(&self, head: PageId, page_count: u32) -> StoreResult<VecDeque<PageId>> {
        let page_size = self.header.page_size;
        let mut chain = VecDeque::new();
        let mut next = head;
        let mut link = [0u8; FREE_LINK_SIZE];
        while !next.is_none() {
            if next.is_header() || next.as_u32() >= page_count {
                return Err(StoreError::corrupt(format!(
                    "free chain references page {next} outside the data range"
                )));
            }
            if chain.len() >= page_count as usize {
                return Err(StoreError::corrupt("cycle in free chain"));
            }
            chain.push_back(next);
            self.file.read_exact_at(&mut link, next.offset(page_size))?;
            next = PageId::from_be_bytes(link);
        }
        Ok(chain)
    }

    /// Writes the next-links chaining `pending` together, with the last
    /// entry pointing at `tail`, then syncs.
    fn write_free_links(&self, pending: &[PageId], tail: PageId) -> StoreResult<()> {
        for (i, &page) in pending.iter().enumerate() {
            let next = pending.get(i + 1).copied().unwrap_or(tail);
            self.file
                .write_all_at(&next.to_be_bytes(), page.offset(self.header.page_size))?;
        }
        self.file.sync()
    }

    /// Links the active header's pending frees into the free chain and
    /// prepends them to the deque, once per installed header.
    ///
    /// The header itself is not rewritten here; the next commit clears the
    /// pending array and moves the chain head in the same stroke.
    fn link_pending_frees(&mut self) -> StoreResult<()> {
        if self.pending_linked || self.header.pending_free.is_empty() {
            return Ok(());
        }
        let pending = self.header.pending_free.clone();
        trace!(count = pending.len(), "linking pending frees into the free chain");
        self.write_free_links(&pending, self.header.free_list_head)?;
        for &page in pending.iter().rev() {
            self.free_list.push_front(page);
        }
        self.pending_linked = true;
        Ok(())
    }

    /// Completes an interrupted reclamation at open time: links the
    /// pending pages, installs a header with the pending array cleared and
    /// the chain head moved, and rebuilds the free deque from disk.
    fn reclaim_pending_at_open(&mut self) -> StoreResult<()> {
        let pending = self.header.pending_free.clone();
        debug!(
            count = pending.len(),
            "completing free-page reclamation from previous session"
        );
        self.write_free_links(&pending, self.header.free_list_head)?;

        let next = StoreHeader {
            epoch: self.header.epoch.next(),
            free_list_head: pending[0],
            pending_free: Vec::new(),
            ..self.header.clone()
        };
        self.install_header(next)?;

        self.free_list =
            self.walk_free_chain(self.header.free_list_head, self.header.page_count)?;
        Ok(())
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Applies a batch atomically, rolling its in-memory effects back if
    /// any step fails.
    fn commit_batch(&mut self, batch: WriteBatch) -> StoreResult<()> {
        match self.try_commit(&batch) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.rollback_batch(&batch);
                Err(err)
            }
        }
    }

    fn try_commit(&mut self, batch: &WriteBatch) -> StoreResult<()> {
        let page_size = self.header.page_size;

        for (&id, data) in &batch.written {
            self.file.write_all_at(data, id.offset(page_size))?;
        }
        if !batch.written.is_empty() {
            self.file.sync()?;
        }

        let next = StoreHeader {
            version: self.header.version,
            page_size,
            page_count: self.header.page_count + batch.extended,
            epoch: self.header.epoch.next(),
            meta_root: batch.new_meta_root.unwrap_or(self.header.meta_root),
            free_list_head: self.free_list.front().copied().unwrap_or(PageId::NONE),
            pending_free: batch.freed.clone(),
        };
        trace!(
            epoch = %next.epoch,
            pages = batch.written.len(),
            freed = batch.freed.len(),
            extended = batch.extended,
            "committing batch"
        );
        self.install_header(next)
    }

    /// Discards a batch. Pages the batch popped off the free deque go back
    /// to its front in their original order; pages minted by file
    /// extension are dropped, since the unchanged page count means the
    /// next batch re-mints the same ids.
    fn rollback_batch(&mut self, batch: &WriteBatch) {
        for &id in batch.allocated.iter().rev() {
            if id.as_u32() < self.header.page_count {
                self.free_list.push_front(id);
            }
        }
    }
}

/// Checks that `id` names a data page below `page_count`.
fn check_data_page(id: PageId, page_count: u32) -> StoreResult<()> {
    if id.is_header() {
        return Err(StoreError::ReservedPage { page_id: id });
    }
    if id.as_u32() >= page_count {
        return Err(StoreError::PageOutOfBounds {
            page_id: id,
            page_count,
        });
    }
    Ok(())
}

//! Write-batch transactions.
//!
//! A [`Transaction`] accumulates a batch of page mutations in memory and
//! applies them in one atomic commit. Until `commit`, nothing the
//! transaction does is visible on disk; `rollback` (explicit, on error,
//! or via `Drop`) discards the batch without issuing a single write.
//!
//! Because a transaction mutably borrows its store, a second transaction
//! cannot be opened while one is outstanding, and because `commit` and
//! `rollback` consume the transaction, a completed one cannot be used
//! again. Both rules hold at compile time.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use pagevault_common::types::PageId;

use crate::error::{StoreError, StoreResult};
use crate::page::max_pending_free;

use super::{check_data_page, PageStore};

/// The in-memory effects of one transaction, applied at commit.
#[derive(Debug, Default)]
pub(super) struct WriteBatch {
    /// Final bytes per page, last write wins.
    pub(super) written: HashMap<PageId, Vec<u8>>,
    /// Freed ids in call order; becomes the next header's pending array.
    pub(super) freed: Vec<PageId>,
    /// Ids handed out by `allocate`, for rollback.
    pub(super) allocated: Vec<PageId>,
    /// Pages appended to the file by this batch.
    pub(super) extended: u32,
    /// Replacement meta root, if any.
    pub(super) new_meta_root: Option<PageId>,
}

/// An open transaction on a [`PageStore`].
///
/// Created by [`PageStore::begin_transaction`] or run to completion by
/// [`PageStore::modify`]. Dropping an uncommitted transaction rolls it
/// back.
pub struct Transaction<'s> {
    store: &'s mut PageStore,
    batch: WriteBatch,
    done: bool,
}

impl<'s> Transaction<'s> {
    pub(super) fn new(store: &'s mut PageStore) -> Self {
        Self {
            store,
            batch: WriteBatch::default(),
            done: false,
        }
    }

    /// Pages addressable by this transaction: the committed count plus
    /// what this batch has minted.
    fn reach(&self) -> u32 {
        self.store.header.page_count + self.batch.extended
    }

    /// Allocates a page, reusing a reclaimed one when available and
    /// extending the file otherwise.
    ///
    /// A freshly minted page is zero-filled; a reused one still holds its
    /// old bytes until written.
    pub fn allocate(&mut self) -> StoreResult<PageId> {
        let id = match self.store.free_list.pop_front() {
            Some(id) => id,
            None => {
                let id = PageId::new(self.store.header.page_count + self.batch.extended);
                let page_size = self.store.header.page_size;
                self.store
                    .file
                    .set_len((u64::from(id.as_u32()) + 1) * u64::from(page_size))?;
                self.batch.extended += 1;
                id
            }
        };
        self.batch.allocated.push(id);
        Ok(id)
    }

    /// Reads a page as this transaction sees it: bytes written by this
    /// batch if any, the on-disk contents otherwise.
    pub fn read(&self, id: PageId) -> StoreResult<Vec<u8>> {
        check_data_page(id, self.reach())?;
        if let Some(data) = self.batch.written.get(&id) {
            return Ok(data.clone());
        }
        let page_size = self.store.header.page_size;
        let mut buf = vec![0u8; page_size as usize];
        self.store.file.read_exact_at(&mut buf, id.offset(page_size))?;
        Ok(buf)
    }

    /// Stages the full contents of a page.
    ///
    /// `data` must be exactly one page long; it is copied, so the caller
    /// may reuse the buffer. Nothing reaches disk before commit.
    pub fn write(&mut self, id: PageId, data: &[u8]) -> StoreResult<()> {
        let page_size = self.store.header.page_size;
        if data.len() != page_size as usize {
            return Err(StoreError::WrongBufferLength {
                expected: page_size,
                actual: data.len(),
            });
        }
        check_data_page(id, self.reach())?;
        self.batch.written.insert(id, data.to_vec());
        Ok(())
    }

    /// Marks a page as freed.
    ///
    /// The page stays untouched on disk; the commit records it as pending
    /// and it becomes allocatable one commit later. Any write this batch
    /// staged for the page is dropped.
    pub fn free(&mut self, id: PageId) -> StoreResult<()> {
        if id.is_header() {
            return Err(StoreError::ReservedPage { page_id: id });
        }
        let max = max_pending_free(self.store.header.page_size);
        if self.batch.freed.len() >= max {
            return Err(StoreError::PendingFreeOverflow { max });
        }
        self.batch.freed.push(id);
        self.batch.written.remove(&id);
        Ok(())
    }

    /// Records a new meta root to take effect at commit. The id is not
    /// validated.
    pub fn set_meta_root(&mut self, id: PageId) {
        self.batch.new_meta_root = Some(id);
    }

    /// Returns the meta root as this transaction sees it.
    pub fn meta_root(&self) -> PageId {
        self.batch
            .new_meta_root
            .unwrap_or(self.store.header.meta_root)
    }

    /// Commits the batch atomically.
    ///
    /// On success the new state is durable before this returns. On failure
    /// the batch is rolled back in memory and the previous committed state
    /// remains authoritative.
    pub fn commit(mut self) -> StoreResult<()> {
        self.done = true;
        let batch = mem::take(&mut self.batch);
        self.store.commit_batch(batch)
    }

    /// Discards the batch without touching the committed state.
    ///
    /// Pages this transaction allocated become reusable again; file growth
    /// is not undone.
    pub fn rollback(mut self) {
        self.done = true;
        let batch = mem::take(&mut self.batch);
        self.store.rollback_batch(&batch);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            let batch = mem::take(&mut self.batch);
            self.store.rollback_batch(&batch);
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("written", &self.batch.written.len())
            .field("freed", &self.batch.freed.len())
            .field("allocated", &self.batch.allocated.len())
            .field("extended", &self.batch.extended)
            .field("new_meta_root", &self.batch.new_meta_root)
            .finish()
    }
}

//! Heap file: the ordered on-disk pages of one table.
//!
//! A table file is a raw concatenation of [`PAGE_SIZE`] pages with no
//! inter-page metadata, so `num_pages` is always `file_len / PAGE_SIZE`. This
//! is the only component that touches the file; tuple-level operations go
//! back through the buffer pool so caching and locking stay in force.

use crate::access::schema::TupleDesc;
use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::error::{EngineError, Result};
use crate::storage::buffer::BufferPool;
use crate::storage::heap_page::HeapPage;
use crate::storage::page::{PageId, PAGE_SIZE};
use crate::transaction::{Permission, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct HeapFile {
    table_id: TableId,
    desc: TupleDesc,
    file: Mutex<File>,
    /// Disk reads served so far; eviction behavior is observable through it.
    reads: AtomicU64,
}

impl HeapFile {
    /// Creates an empty table file, truncating any existing one.
    pub fn create(path: &Path, table_id: TableId, desc: TupleDesc) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            table_id,
            desc,
            file: Mutex::new(file),
            reads: AtomicU64::new(0),
        })
    }

    /// Opens an existing table file.
    pub fn open(path: &Path, table_id: TableId, desc: TupleDesc) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            table_id,
            desc,
            file: Mutex::new(file),
            reads: AtomicU64::new(0),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Pages currently in the file; the length is authoritative.
    pub fn num_pages(&self) -> Result<u32> {
        let file = self.file.lock();
        Ok((file.metadata()?.len() / PAGE_SIZE as u64) as u32)
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Reads one page from disk. A page past the end of the file or a short
    /// read surfaces as the underlying I/O error.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        if pid.table_id != self.table_id {
            return Err(EngineError::Corrupted(format!(
                "{} read through file of {}",
                pid, self.table_id
            )));
        }
        let mut buf = [0u8; PAGE_SIZE];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(pid.page_no as u64 * PAGE_SIZE as u64))?;
            file.read_exact(&mut buf)?;
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        HeapPage::from_bytes(pid, self.desc.clone(), &buf)
    }

    /// Overwrites the page-sized region for this page. Writing the page just
    /// past the end grows the file by one page; the file is never truncated
    /// here.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.pid();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pid.page_no as u64 * PAGE_SIZE as u64))?;
        file.write_all(page.data())?;
        file.sync_all()?;
        Ok(())
    }

    /// Inserts `tuple` into the first page with a free slot, appending a new
    /// page when every existing one is full. Existing pages are fetched
    /// through the buffer pool with write permission; a fresh page is
    /// persisted immediately so the file length always reflects `num_pages`.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Arc<RwLock<HeapPage>>> {
        if tuple.desc() != &self.desc {
            return Err(EngineError::SchemaMismatch {
                context: format!(
                    "tuple schema {} does not match table schema {}",
                    tuple.desc(),
                    self.desc
                ),
            });
        }

        let num_pages = self.num_pages()?;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.table_id, page_no);
            let page = pool.get_page(tid, pid, Permission::ReadWrite)?;
            let mut guard = page.write();
            if guard.empty_slot_count() > 0 {
                guard.insert_tuple(tuple)?;
                drop(guard);
                return Ok(page);
            }
        }

        // Every page is full: append a fresh one.
        let pid = PageId::new(self.table_id, num_pages);
        let mut fresh = HeapPage::new(pid, self.desc.clone());
        fresh.insert_tuple(tuple)?;
        self.write_page(&fresh)?;
        log::debug!("appended {} to {}", pid, self.table_id);
        pool.admit(fresh)
    }

    /// Deletes `tuple` from its recorded page. If the page becomes empty it
    /// is removed: every higher-numbered page shifts down one position (its
    /// cache entry rekeyed under the cache mutex, its bytes rewritten one
    /// page earlier) and the file is truncated by one page. Page ids above
    /// the removed page are stale afterwards.
    ///
    /// Returns the surviving page for dirty marking, or `None` when the page
    /// was removed.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Option<Arc<RwLock<HeapPage>>>> {
        let rid = tuple.record_id().ok_or(EngineError::NoRecordId)?;
        if rid.page_id.table_id != self.table_id {
            return Err(EngineError::Corrupted(format!(
                "{} deleted through file of {}",
                rid.page_id, self.table_id
            )));
        }

        let page = pool.get_page(tid, rid.page_id, Permission::ReadWrite)?;
        let emptied = {
            let mut guard = page.write();
            guard.delete_tuple(tuple)?;
            guard.is_empty()
        };
        if !emptied {
            return Ok(Some(page));
        }

        let num_pages = self.num_pages()?;
        let removed = rid.page_id.page_no;
        log::debug!(
            "{} emptied; shifting {} trailing pages down",
            rid.page_id,
            num_pages - removed - 1
        );
        pool.discard_page(rid.page_id);

        for page_no in removed + 1..num_pages {
            let old_pid = PageId::new(self.table_id, page_no);
            let new_pid = PageId::new(self.table_id, page_no - 1);
            let moved = pool.get_page(tid, old_pid, Permission::ReadWrite)?;
            pool.rekey_page(&moved, old_pid, new_pid);
            let mut guard = moved.write();
            self.write_page(&guard)?;
            guard.mark_dirty(None);
        }

        let file = self.file.lock();
        file.set_len((num_pages as u64 - 1) * PAGE_SIZE as u64)?;
        Ok(None)
    }
}

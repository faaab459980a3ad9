//! Buffer pool: fixed-capacity page cache fronting the heap files.
//!
//! Every page access from higher layers goes through [`BufferPool::get_page`],
//! which acquires the page lock first (blocking until grantable), then serves
//! the page from cache or loads it from the owning heap file, evicting the
//! least-recently-used page when full. The cache table is guarded by a single
//! mutex; disk reads for misses happen outside it, and lock-manager waits
//! never hold it.

use crate::access::tuple::Tuple;
use crate::catalog::{TableId, TableRegistry};
use crate::concurrency::lock::LockManager;
use crate::error::{EngineError, Result};
use crate::storage::heap_page::HeapPage;
use crate::storage::page::PageId;
use crate::transaction::{Permission, TransactionId};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Conventional default capacity, in pages.
pub const DEFAULT_CAPACITY: usize = 50;

/// What to do with a dirty page when it is chosen for eviction.
///
/// The flush-before-evict behavior is a named policy because it conflicts
/// with any future no-force recovery design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Force: flush a dirty victim to disk, then evict it.
    FlushDirty,
    /// No-steal: dirty pages are not evictable; fail with the cache-full
    /// error when every cached page is dirty.
    SkipDirty,
}

#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Maximum number of distinct cached pages.
    pub capacity: usize,
    pub eviction: EvictionPolicy,
    /// Lock-wait budget before the transaction-abort error; `None` blocks
    /// forever (no deadlock detection exists).
    pub lock_timeout: Option<Duration>,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            eviction: EvictionPolicy::FlushDirty,
            lock_timeout: None,
        }
    }
}

/// Cache table plus recency order. Least recently used at the front.
struct CacheState {
    pages: HashMap<PageId, Arc<RwLock<HeapPage>>>,
    recency: VecDeque<PageId>,
}

impl CacheState {
    fn remove_recency(&mut self, pid: PageId) {
        if let Some(idx) = self.recency.iter().position(|p| *p == pid) {
            self.recency.remove(idx);
        }
    }

    fn promote(&mut self, pid: PageId) {
        self.remove_recency(pid);
        self.recency.push_back(pid);
    }

    fn insert(&mut self, pid: PageId, page: Arc<RwLock<HeapPage>>) {
        if self.pages.insert(pid, page).is_some() {
            self.remove_recency(pid);
        }
        self.recency.push_back(pid);
    }

    fn remove(&mut self, pid: PageId) -> Option<Arc<RwLock<HeapPage>>> {
        self.remove_recency(pid);
        self.pages.remove(&pid)
    }
}

pub struct BufferPool {
    capacity: usize,
    eviction: EvictionPolicy,
    lock_timeout: Option<Duration>,
    locks: Arc<LockManager>,
    tables: Arc<TableRegistry>,
    cache: Mutex<CacheState>,
}

impl BufferPool {
    pub fn new(
        config: BufferPoolConfig,
        locks: Arc<LockManager>,
        tables: Arc<TableRegistry>,
    ) -> Self {
        assert!(config.capacity > 0, "buffer pool needs at least one slot");
        Self {
            capacity: config.capacity,
            eviction: config.eviction,
            lock_timeout: config.lock_timeout,
            locks,
            tables,
            cache: Mutex::new(CacheState {
                pages: HashMap::with_capacity(config.capacity),
                recency: VecDeque::with_capacity(config.capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distinct pages currently cached. Never exceeds `capacity`.
    pub fn cached_page_count(&self) -> usize {
        self.cache.lock().pages.len()
    }

    /// Fetches a page under `tid` with the requested permission.
    ///
    /// The page lock is acquired first and blocks until grantable (or the
    /// configured timeout aborts). A cache hit promotes the page to
    /// most-recently-used; a miss loads it through the owning heap file,
    /// evicting the LRU page if the cache is full. Callers mutating the
    /// returned page must mark it dirty under their transaction.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> Result<Arc<RwLock<HeapPage>>> {
        match perm {
            Permission::ReadOnly => self.locks.acquire_shared(pid, tid, self.lock_timeout)?,
            Permission::ReadWrite => self.locks.acquire_exclusive(pid, tid, self.lock_timeout)?,
        }

        {
            let mut cache = self.cache.lock();
            if let Some(page) = cache.pages.get(&pid).cloned() {
                cache.promote(pid);
                return Ok(page);
            }
        }

        // Miss: read from disk without holding the cache mutex.
        let file = self.tables.get(pid.table_id)?;
        let loaded = file.read_page(pid)?;

        let mut cache = self.cache.lock();
        if let Some(page) = cache.pages.get(&pid).cloned() {
            // Another caller loaded it while we were reading.
            cache.promote(pid);
            return Ok(page);
        }
        self.make_room(&mut cache)?;
        let page = Arc::new(RwLock::new(loaded));
        cache.insert(pid, Arc::clone(&page));
        Ok(page)
    }

    /// Inserts a tuple into `table_id` on behalf of `tid` and marks the
    /// affected page dirty.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.tables.get(table_id)?;
        let page = file.insert_tuple(self, tid, tuple)?;
        page.write().mark_dirty(Some(tid));
        Ok(())
    }

    /// Deletes a tuple via its record id and marks the page dirty, unless the
    /// page became empty and was removed (then it is already gone from the
    /// cache).
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(EngineError::NoRecordId)?;
        let file = self.tables.get(rid.page_id.table_id)?;
        if let Some(page) = file.delete_tuple(self, tid, tuple)? {
            page.write().mark_dirty(Some(tid));
        }
        Ok(())
    }

    /// Writes the page back through its heap file if cached and dirty, then
    /// clears the dirty marker. A page absent from the cache is a no-op.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let page = self.cache.lock().pages.get(&pid).cloned();
        if let Some(page) = page {
            self.flush_one(&page)?;
        }
        Ok(())
    }

    /// Flushes every dirty cached page.
    ///
    /// Unsafe under a no-force recovery policy: it persists uncommitted
    /// data. It exists only because logging/recovery is out of scope.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<_> = self.cache.lock().pages.values().cloned().collect();
        for page in pages {
            self.flush_one(&page)?;
        }
        Ok(())
    }

    /// Flushes the pages dirtied by `tid`.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let pages: Vec<_> = self.cache.lock().pages.values().cloned().collect();
        for page in pages {
            if page.read().dirtier() == Some(tid) {
                self.flush_one(&page)?;
            }
        }
        Ok(())
    }

    fn flush_one(&self, page: &Arc<RwLock<HeapPage>>) -> Result<()> {
        let mut guard = page.write();
        if guard.is_dirty() {
            let file = self.tables.get(guard.pid().table_id)?;
            file.write_page(&guard)?;
            guard.mark_dirty(None);
            log::debug!("flushed {}", guard.pid());
        }
        Ok(())
    }

    /// Drops a page from the cache without flushing. Used to avoid caching a
    /// rolled-back page (recovery is out of scope) and by compaction.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().remove(pid);
    }

    /// Releases `tid`'s lock on `pid` before end of transaction. Early
    /// release breaks two-phase locking; callers must know why they can
    /// afford that.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) -> Result<()> {
        self.locks.release(pid, tid)
    }

    /// True when `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.locks.holds_lock(pid, tid)
    }

    /// Seam for a transaction manager: commit-vs-abort flushing and lock
    /// release would happen here. Intentionally a no-op in this scoped
    /// design.
    pub fn transaction_complete(&self, _tid: TransactionId) {}

    /// Caches a freshly appended page, evicting if necessary. The page is
    /// already persisted by the heap file.
    pub(crate) fn admit(&self, page: HeapPage) -> Result<Arc<RwLock<HeapPage>>> {
        let pid = page.pid();
        let mut cache = self.cache.lock();
        self.make_room(&mut cache)?;
        let page = Arc::new(RwLock::new(page));
        cache.insert(pid, Arc::clone(&page));
        Ok(page)
    }

    /// Re-identifies a cached page when compaction renumbers it. The cache
    /// entry moves from `old` to `new` and the page's own id is rewritten,
    /// all under the cache mutex so no reader observes a half-renamed entry.
    pub(crate) fn rekey_page(&self, page: &Arc<RwLock<HeapPage>>, old: PageId, new: PageId) {
        let mut cache = self.cache.lock();
        let was_cached = cache.remove(old).is_some();
        page.write().set_pid(new);
        if was_cached {
            cache.remove(new);
            cache.insert(new, Arc::clone(page));
        }
    }

    /// Evicts until a free slot exists, per the configured policy.
    fn make_room(&self, cache: &mut CacheState) -> Result<()> {
        while cache.pages.len() >= self.capacity {
            let victim_pid = match self.eviction {
                EvictionPolicy::FlushDirty => cache.recency.front().copied(),
                EvictionPolicy::SkipDirty => cache
                    .recency
                    .iter()
                    .copied()
                    .find(|pid| !cache.pages[pid].read().is_dirty()),
            }
            .ok_or(EngineError::CacheFull {
                capacity: self.capacity,
            })?;

            let Some(victim) = cache.remove(victim_pid) else {
                continue;
            };
            let mut guard = victim.write();
            if guard.is_dirty() {
                let file = self.tables.get(victim_pid.table_id)?;
                file.write_page(&guard)?;
                guard.mark_dirty(None);
            }
            log::debug!("evicted {}", victim_pid);
        }
        Ok(())
    }
}

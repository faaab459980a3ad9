//! Sequential table scan with explicit open/close bracketing.

use crate::access::tuple::Tuple;
use crate::error::{EngineError, Result};
use crate::storage::buffer::BufferPool;
use crate::storage::heap_file::HeapFile;
use crate::storage::page::PageId;
use crate::transaction::{Permission, TransactionId};
use std::collections::VecDeque;

/// Iterates every tuple of a table in page order, then slot order. Each page
/// is fetched read-only through the buffer pool, so scans respect caching
/// and locking like any other access.
///
/// The protocol is explicit: a scan yields nothing until [`open`]ed, and
/// advancing a closed scan is an error.
///
/// [`open`]: TableScan::open
pub struct TableScan<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    state: Option<ScanState>,
}

struct ScanState {
    next_page_no: u32,
    buffered: VecDeque<Tuple>,
}

impl<'a> TableScan<'a> {
    pub fn new(file: &'a HeapFile, pool: &'a BufferPool, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            state: None,
        }
    }

    /// Positions the scan at page 0. Reopening an open scan rewinds it.
    pub fn open(&mut self) -> Result<()> {
        self.state = Some(ScanState {
            next_page_no: 0,
            buffered: VecDeque::new(),
        });
        Ok(())
    }

    /// True when another tuple is available. A closed scan has none.
    pub fn has_next(&mut self) -> Result<bool> {
        let Some(state) = &mut self.state else {
            return Ok(false);
        };
        loop {
            if !state.buffered.is_empty() {
                return Ok(true);
            }
            if state.next_page_no >= self.file.num_pages()? {
                return Ok(false);
            }
            let pid = PageId::new(self.file.table_id(), state.next_page_no);
            let page = self.pool.get_page(self.tid, pid, Permission::ReadOnly)?;
            state.buffered = page.read().tuples()?.into();
            state.next_page_no += 1;
        }
    }

    /// The next tuple, or `Ok(None)` at the end. Fails on a closed scan.
    pub fn next(&mut self) -> Result<Option<Tuple>> {
        if self.state.is_none() {
            return Err(EngineError::ScanClosed(self.file.table_id()));
        }
        if !self.has_next()? {
            return Ok(None);
        }
        match &mut self.state {
            Some(state) => Ok(state.buffered.pop_front()),
            None => Ok(None),
        }
    }

    /// Resets an open scan to page 0.
    pub fn rewind(&mut self) -> Result<()> {
        let state = self
            .state
            .as_mut()
            .ok_or(EngineError::ScanClosed(self.file.table_id()))?;
        state.next_page_no = 0;
        state.buffered.clear();
        Ok(())
    }

    pub fn close(&mut self) {
        self.state = None;
    }
}

impl HeapFile {
    /// Opens a scan over this table through `pool` under `tid`.
    pub fn scan<'a>(&'a self, pool: &'a BufferPool, tid: TransactionId) -> TableScan<'a> {
        TableScan::new(self, pool, tid)
    }
}

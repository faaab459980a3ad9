//! Page-granularity lock manager.
//!
//! One lock-table entry per page maps each holding transaction to its mode.
//! Acquisition blocks the caller on a condition variable until the request is
//! grantable; there is no deadlock detection, so a cyclic wait hangs unless
//! the caller passes a timeout, in which case the transaction-abort error is
//! returned instead.

use crate::error::{EngineError, Result};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Lock modes supported per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Multi-reader mode.
    Shared,
    /// Single-writer mode; excludes every other holder.
    Exclusive,
}

type Holders = HashMap<TransactionId, LockMode>;

pub struct LockManager {
    table: Mutex<HashMap<PageId, Holders>>,
    cond: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            cond: Condvar::new(),
        }
    }

    /// Acquires a shared lock, blocking while another transaction holds
    /// exclusive. Reentrant: a holder of either mode returns immediately.
    pub fn acquire_shared(
        &self,
        pid: PageId,
        tid: TransactionId,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.acquire(pid, tid, LockMode::Shared, timeout)
    }

    /// Acquires an exclusive lock. A sole shared holder upgrades in place;
    /// otherwise blocks until every other holder releases.
    pub fn acquire_exclusive(
        &self,
        pid: PageId,
        tid: TransactionId,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.acquire(pid, tid, LockMode::Exclusive, timeout)
    }

    fn acquire(
        &self,
        pid: PageId,
        tid: TransactionId,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let start = Instant::now();
        let mut table = self.table.lock().unwrap();
        loop {
            if Self::try_grant(&mut table, pid, tid, mode) {
                return Ok(());
            }

            log::trace!("{} waiting for {:?} on {}", tid, mode, pid);
            match timeout {
                None => {
                    table = self.cond.wait(table).unwrap();
                }
                Some(limit) => {
                    let elapsed = start.elapsed();
                    if elapsed >= limit {
                        return Err(EngineError::TransactionAborted {
                            pid,
                            timeout: limit,
                        });
                    }
                    let (guard, wait) = self.cond.wait_timeout(table, limit - elapsed).unwrap();
                    table = guard;
                    if wait.timed_out() {
                        if Self::try_grant(&mut table, pid, tid, mode) {
                            return Ok(());
                        }
                        return Err(EngineError::TransactionAborted {
                            pid,
                            timeout: limit,
                        });
                    }
                }
            }
        }
    }

    /// Grants `mode` to `tid` if currently compatible, mutating the table.
    /// Returns false when the caller must wait.
    fn try_grant(
        table: &mut HashMap<PageId, Holders>,
        pid: PageId,
        tid: TransactionId,
        mode: LockMode,
    ) -> bool {
        let holders = table.entry(pid).or_default();
        match mode {
            LockMode::Shared => {
                if holders.contains_key(&tid) {
                    // Reentrant; exclusive implies shared.
                    true
                } else if holders.values().any(|m| *m == LockMode::Exclusive) {
                    false
                } else {
                    holders.insert(tid, LockMode::Shared);
                    true
                }
            }
            LockMode::Exclusive => {
                if holders.get(&tid) == Some(&LockMode::Exclusive) {
                    true
                } else if holders.keys().any(|t| *t != tid) {
                    // Other holders present: wait until sole holder, upgrade
                    // included.
                    false
                } else {
                    holders.insert(tid, LockMode::Exclusive);
                    true
                }
            }
        }
    }

    /// Releases `tid`'s lock on `pid` and wakes waiters.
    ///
    /// Protocol errors: the page has no lock-table entry, or the requester
    /// holds no lock there.
    pub fn release(&self, pid: PageId, tid: TransactionId) -> Result<()> {
        let mut table = self.table.lock().unwrap();
        let holders = table.get_mut(&pid).ok_or(EngineError::NoLockEntry { pid })?;
        holders
            .remove(&tid)
            .ok_or(EngineError::LockNotHeld { pid, tid })?;
        if holders.is_empty() {
            table.remove(&pid);
        }
        self.cond.notify_all();
        Ok(())
    }

    /// True when `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, pid: PageId, tid: TransactionId) -> bool {
        self.lock_mode(pid, tid).is_some()
    }

    /// The mode `tid` holds on `pid`, if any.
    pub fn lock_mode(&self, pid: PageId, tid: TransactionId) -> Option<LockMode> {
        let table = self.table.lock().unwrap();
        table.get(&pid).and_then(|holders| holders.get(&tid)).copied()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

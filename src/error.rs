//! Crate-wide error types.

use crate::catalog::TableId;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the page store.
///
/// Lock-protocol variants (`NoLockEntry`, `LockNotHeld`) indicate programmer
/// misuse and are never worth retrying. `Io` is surfaced unmodified from the
/// heap-file layer.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transaction aborted: lock on {pid} not granted within {timeout:?}")]
    TransactionAborted { pid: PageId, timeout: Duration },

    #[error("buffer pool is full: all {capacity} cached pages are unevictable")]
    CacheFull { capacity: usize },

    #[error("schema mismatch: {context}")]
    SchemaMismatch { context: String },

    #[error("page {pid} has no free slot")]
    PageFull { pid: PageId },

    #[error("slot {slot} on page {pid} is not occupied")]
    SlotEmpty { pid: PageId, slot: u16 },

    #[error("tuple has no record id")]
    NoRecordId,

    #[error("text value of {len} bytes exceeds capacity {capacity}")]
    TextTooLong { len: usize, capacity: usize },

    #[error("no lock table entry for {pid}")]
    NoLockEntry { pid: PageId },

    #[error("{tid} holds no lock on {pid}")]
    LockNotHeld { pid: PageId, tid: TransactionId },

    #[error("unknown table {0}")]
    UnknownTable(TableId),

    #[error("scan on table {0} is not open")]
    ScanClosed(TableId),

    #[error("corrupted page data: {0}")]
    Corrupted(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for page-store operations.
pub type Result<T> = std::result::Result<T, EngineError>;

//! A teaching-grade transactional page store.
//!
//! The hard core is page-based storage with three cooperating pieces:
//!
//! - **HeapPage**: fixed-size (4KB) slotted pages — occupancy bitmap header
//!   plus fixed-width tuple slots
//! - **HeapFile**: the ordered on-disk pages of one table, growing by append
//!   and shrinking by trailing-page compaction
//! - **BufferPool**: bounded in-memory page cache with LRU eviction, the
//!   single entry point for every page access
//! - **LockManager**: page-granularity shared/exclusive locks (two-phase
//!   locking, no deadlock detection)
//!
//! Query operators, the catalog, and statistics live outside this crate and
//! consume the buffer pool's narrow page-access API. Write-ahead logging and
//! crash recovery are out of scope; the seams a recovery subsystem would
//! need (`discard_page`, `transaction_complete`, per-transaction flushing)
//! are present but deliberately thin.

pub mod access;
pub mod catalog;
pub mod concurrency;
pub mod database;
pub mod error;
pub mod storage;
pub mod transaction;

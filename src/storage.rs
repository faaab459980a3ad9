//! Storage layer: pages, heap files, and the buffer pool.
//!
//! - **Page / PageId**: fixed-size (4KB) blocks, the unit of I/O and locking
//! - **HeapPage**: slotted page format for fixed-width tuples
//! - **HeapFile**: reads/writes one table's pages on disk
//! - **BufferPool**: bounded in-memory cache with LRU eviction

pub mod buffer;
pub mod heap_file;
pub mod heap_page;
pub mod page;

pub use buffer::{BufferPool, BufferPoolConfig, EvictionPolicy, DEFAULT_CAPACITY};
pub use heap_file::HeapFile;
pub use heap_page::HeapPage;
pub use page::{PageId, PAGE_SIZE};

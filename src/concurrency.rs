//! Concurrency control: the page-granularity lock manager.

pub mod lock;

pub use lock::{LockManager, LockMode};

//! Per-instance wiring of the page store.
//!
//! A `Database` owns its own table registry, lock manager, and buffer pool;
//! nothing is process-global, so independent instances (and tests) never
//! interfere.

use crate::access::schema::TupleDesc;
use crate::catalog::{TableId, TableRegistry};
use crate::concurrency::lock::LockManager;
use crate::error::Result;
use crate::storage::buffer::{BufferPool, BufferPoolConfig};
use crate::storage::heap_file::HeapFile;
use std::path::Path;
use std::sync::Arc;

pub struct Database {
    registry: Arc<TableRegistry>,
    locks: Arc<LockManager>,
    pool: Arc<BufferPool>,
}

impl Database {
    pub fn new(config: BufferPoolConfig) -> Self {
        let registry = Arc::new(TableRegistry::new());
        let locks = Arc::new(LockManager::new());
        let pool = Arc::new(BufferPool::new(
            config,
            Arc::clone(&locks),
            Arc::clone(&registry),
        ));
        Self {
            registry,
            locks,
            pool,
        }
    }

    /// Creates an empty table file at `path` and registers it.
    pub fn create_table(&self, path: &Path, desc: TupleDesc) -> Result<TableId> {
        let table_id = self.registry.allocate_table_id();
        let file = Arc::new(HeapFile::create(path, table_id, desc)?);
        self.registry.register(file);
        Ok(table_id)
    }

    /// Registers an existing table file.
    pub fn open_table(&self, path: &Path, desc: TupleDesc) -> Result<TableId> {
        let table_id = self.registry.allocate_table_id();
        let file = Arc::new(HeapFile::open(path, table_id, desc)?);
        self.registry.register(file);
        Ok(table_id)
    }

    pub fn table(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.registry.get(table_id)
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(BufferPoolConfig::default())
    }
}

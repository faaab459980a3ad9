//! Minimal table registry.
//!
//! The full catalog (schemas, names, statistics) lives outside this crate;
//! the page store only needs to resolve a [`TableId`] to its heap file when
//! loading or flushing pages. The registry is instantiated per database so
//! independent instances never share state.

use crate::error::{EngineError, Result};
use crate::storage::heap_file::HeapFile;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identifier for one registered table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Maps table ids to their heap files.
pub struct TableRegistry {
    tables: DashMap<TableId, Arc<HeapFile>>,
    next_id: AtomicU32,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Allocates an id for a table about to be created.
    pub fn allocate_table_id(&self) -> TableId {
        TableId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register(&self, file: Arc<HeapFile>) {
        self.tables.insert(file.table_id(), file);
    }

    pub fn get(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .get(&table_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(EngineError::UnknownTable(table_id))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Page identity and size.

use crate::catalog::TableId;
use std::fmt;

/// Bytes per page, header included.
pub const PAGE_SIZE: usize = 4096;

/// Identifies one page of one table. Used as both the cache key and the lock
/// key; equal by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/page#{}", self.table_id, self.page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        let a = PageId::new(TableId(1), 2);
        let b = PageId::new(TableId(1), 2);
        let c = PageId::new(TableId(1), 3);
        let d = PageId::new(TableId(2), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_usable_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(PageId::new(TableId(0), 0), "first");
        assert_eq!(map.get(&PageId::new(TableId(0), 0)), Some(&"first"));
    }
}

//! Access layer: schemas, tuples, and sequential scans.
//!
//! - **TupleDesc**: ordered field types (names optional, ignored by equality)
//! - **Tuple** / **RecordId**: rows and their on-page addresses
//! - **Field** / **DataType**: fixed-width values
//! - **TableScan**: page-order iteration through the buffer pool

pub mod scan;
pub mod schema;
pub mod tuple;
pub mod value;

pub use scan::TableScan;
pub use schema::TupleDesc;
pub use tuple::{RecordId, Tuple};
pub use value::{DataType, Field, TEXT_CAPACITY};

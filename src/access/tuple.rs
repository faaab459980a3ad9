//! Tuples and record identity.

use crate::access::schema::TupleDesc;
use crate::access::value::Field;
use crate::error::{EngineError, Result};
use crate::storage::page::PageId;
use std::fmt;
use std::io::{Read, Write};

/// Locates exactly one tuple inside one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot)
    }
}

/// A row: field values matching a [`TupleDesc`], plus the record id stamped
/// on insert. A deleted tuple keeps its in-memory fields but its slot is
/// gone.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Builds a tuple, validating the fields against the schema.
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != desc.num_fields() {
            return Err(EngineError::SchemaMismatch {
                context: format!(
                    "expected {} fields, got {}",
                    desc.num_fields(),
                    fields.len()
                ),
            });
        }
        for (i, field) in fields.iter().enumerate() {
            if field.data_type() != desc.field_type(i) {
                return Err(EngineError::SchemaMismatch {
                    context: format!(
                        "field {} is {:?}, schema wants {:?}",
                        i,
                        field.data_type(),
                        desc.field_type(i)
                    ),
                });
            }
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Serializes the field values at the schema's fixed width.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        for field in &self.fields {
            field.write_to(writer)?;
        }
        Ok(())
    }

    /// Deserializes a tuple of `desc`'s shape. The record id is not part of
    /// the on-disk representation; the caller stamps it from the slot.
    pub fn read_from(reader: &mut impl Read, desc: &TupleDesc) -> Result<Self> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        for i in 0..desc.num_fields() {
            fields.push(Field::read_from(reader, desc.field_type(i))?);
        }
        Ok(Self {
            desc: desc.clone(),
            fields,
            record_id: None,
        })
    }
}

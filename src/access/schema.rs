//! Tuple schemas.

use crate::access::value::DataType;
use std::fmt;

/// One column of a schema: a type and an optional name.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub data_type: DataType,
    pub name: Option<String>,
}

/// Ordered description of a tuple's fields.
///
/// Two descriptors are equal iff they have the same field count and the same
/// types in order; names never participate in equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    fields: Vec<FieldDef>,
}

impl TupleDesc {
    /// Builds a descriptor from unnamed field types.
    ///
    /// Panics if `types` is empty; a tuple always has at least one field.
    pub fn new(types: Vec<DataType>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one field");
        Self {
            fields: types
                .into_iter()
                .map(|data_type| FieldDef {
                    data_type,
                    name: None,
                })
                .collect(),
        }
    }

    /// Builds a descriptor with named fields.
    pub fn with_names(types: Vec<DataType>, names: Vec<Option<String>>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one field");
        assert_eq!(types.len(), names.len());
        Self {
            fields: types
                .into_iter()
                .zip(names)
                .map(|(data_type, name)| FieldDef { data_type, name })
                .collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_type(&self, i: usize) -> DataType {
        self.fields[i].data_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.fields[i].name.as_deref()
    }

    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.fields.iter().map(|f| f.data_type)
    }

    /// Fixed byte width of one serialized tuple.
    pub fn byte_width(&self) -> usize {
        self.fields.iter().map(|f| f.data_type.byte_width()).sum()
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.num_fields() == other.num_fields() && self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &field.name {
                Some(name) => write!(f, "{}: {:?}", name, field.data_type)?,
                None => write!(f, "{:?}", field.data_type)?,
            }
        }
        write!(f, ")")
    }
}

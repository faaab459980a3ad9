//! Field types and values with fixed-width binary serialization.

use crate::error::{EngineError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Content bytes reserved for a `Text` field. Together with the 4-byte
/// length prefix this makes every text value 132 bytes on disk.
pub const TEXT_CAPACITY: usize = 128;

/// Column types supported by the page store.
///
/// Every type has a fixed byte width so tuple slots are fixed-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Text,
}

impl DataType {
    /// On-disk width of a value of this type.
    pub fn byte_width(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Text => 4 + TEXT_CAPACITY,
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// Builds a text field, rejecting values that exceed [`TEXT_CAPACITY`].
    pub fn text(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() > TEXT_CAPACITY {
            return Err(EngineError::TextTooLong {
                len: value.len(),
                capacity: TEXT_CAPACITY,
            });
        }
        Ok(Field::Text(value))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Field::Int(_) => DataType::Int,
            Field::Text(_) => DataType::Text,
        }
    }

    /// Serializes this field into `writer` at its fixed width.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        match self {
            Field::Int(v) => writer.write_i32::<LittleEndian>(*v)?,
            Field::Text(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > TEXT_CAPACITY {
                    return Err(EngineError::TextTooLong {
                        len: bytes.len(),
                        capacity: TEXT_CAPACITY,
                    });
                }
                writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
                writer.write_all(bytes)?;
                // Zero padding keeps the slot width fixed.
                let padding = [0u8; TEXT_CAPACITY];
                writer.write_all(&padding[bytes.len()..])?;
            }
        }
        Ok(())
    }

    /// Deserializes a field of `data_type` from `reader`.
    pub fn read_from(reader: &mut impl Read, data_type: DataType) -> Result<Self> {
        match data_type {
            DataType::Int => Ok(Field::Int(reader.read_i32::<LittleEndian>()?)),
            DataType::Text => {
                let len = reader.read_u32::<LittleEndian>()? as usize;
                if len > TEXT_CAPACITY {
                    return Err(EngineError::Corrupted(format!(
                        "text length {} exceeds capacity {}",
                        len, TEXT_CAPACITY
                    )));
                }
                let mut content = [0u8; TEXT_CAPACITY];
                reader.read_exact(&mut content)?;
                let value = std::str::from_utf8(&content[..len])
                    .map_err(|e| EngineError::Corrupted(format!("invalid utf8 in text: {}", e)))?
                    .to_string();
                Ok(Field::Text(value))
            }
        }
    }
}

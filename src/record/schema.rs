use std::fmt;
use std::ops::Range;

use crate::common::NAME_LEN;

use super::DataType;

/// Fixed-width NUL-padded name slot, as stored on disk for both catalog
/// entries and columns. Names longer than the slot are truncated.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedName([u8; NAME_LEN]);

impl FixedName {
    pub fn from_str(name: &str) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let src = name.as_bytes();
        let len = src.len().min(NAME_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        Self(bytes)
    }

    /// Reads a name from the first `NAME_LEN` bytes of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let bytes: [u8; NAME_LEN] = data[..NAME_LEN].try_into().unwrap();
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Bytes before the first NUL.
    pub fn c_str(&self) -> &[u8] {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(NAME_LEN);
        &self.0[..end]
    }

    /// True for an all-NUL slot, which terminates catalog listings.
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// NUL-padded equality against a textual name.
    pub fn matches(&self, name: &str) -> bool {
        *self == Self::from_str(name)
    }
}

impl fmt::Debug for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedName({})", String::from_utf8_lossy(self.c_str()))
    }
}

impl fmt::Display for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.c_str()))
    }
}

/// A single column of a table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    name: FixedName,
    data_type: DataType,
}

impl Column {
    /// Encoded length of a column on disk: the name slot plus a u64 type id.
    pub const ENCODED_LEN: usize = NAME_LEN + 8;

    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: FixedName::from_str(name),
            data_type,
        }
    }

    pub fn name(&self) -> &FixedName {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Serializes the column into `out` (little-endian type id).
    pub fn encode(&self, out: &mut [u8]) {
        out[..NAME_LEN].copy_from_slice(self.name.as_bytes());
        out[NAME_LEN..Self::ENCODED_LEN]
            .copy_from_slice(&self.data_type.type_id().to_le_bytes());
    }

    /// Deserializes a column. Returns None on a short buffer or an unknown
    /// type id.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::ENCODED_LEN {
            return None;
        }
        let name = FixedName::from_bytes(data);
        let id_bytes: [u8; 8] = data[NAME_LEN..Self::ENCODED_LEN].try_into().unwrap();
        let data_type = DataType::from_type_id(u64::from_le_bytes(id_bytes))?;
        Some(Self { name, data_type })
    }
}

/// Ordered column list with precomputed field offsets.
///
/// The offset of each field is the sum of the sizes of the columns before
/// it; records are fixed-width with no per-record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    offsets: Vec<usize>,
    record_size: usize,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut offsets = Vec::with_capacity(columns.len());
        let mut record_size = 0;
        for column in &columns {
            offsets.push(record_size);
            record_size += column.data_type().size();
        }
        Self {
            columns,
            offsets,
            record_size,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Index of the column whose stored name matches `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name().matches(name))
    }

    /// Byte range of the field `index` within a record image.
    pub fn field_range(&self, index: usize) -> Range<usize> {
        let start = self.offsets[index];
        start..start + self.columns[index].data_type().size()
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }
}

//! Typed property columns
//!
//! One column holds one property for every node (or edge) of a graph.
//! Fixed-width and string columns are nullable vectors; boolean columns
//! are bit-packed with a separate validity mask.

use samyama_topology::DynamicBitset;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single property value read out of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Int64(i64),
    UInt8(u8),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<f64> {
        match self {
            PropertyValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int64(v) => write!(f, "{}", v),
            PropertyValue::UInt8(v) => write!(f, "{}", v),
            PropertyValue::Float64(v) => write!(f, "{}", v),
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int64,
    UInt8,
    Float64,
    String,
    Bool,
}

/// Bit-packed nullable booleans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoolColumn {
    values: DynamicBitset,
    validity: DynamicBitset,
}

impl BoolColumn {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<bool> {
        self.validity.test(idx).then(|| self.values.test(idx))
    }

    /// Rows holding `true`
    pub fn true_count(&self) -> usize {
        self.values.iter_ones().filter(|&i| self.validity.test(i)).count()
    }

    pub fn null_count(&self) -> usize {
        self.len() - self.validity.count()
    }
}

impl FromIterator<Option<bool>> for BoolColumn {
    fn from_iter<I: IntoIterator<Item = Option<bool>>>(iter: I) -> Self {
        let mut values = DynamicBitset::new(0);
        let mut validity = DynamicBitset::new(0);
        for value in iter {
            values.push(value.unwrap_or(false));
            validity.push(value.is_some());
        }
        Self { values, validity }
    }
}

/// A single property column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Int64(Vec<Option<i64>>),
    UInt8(Vec<Option<u8>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Bool(BoolColumn),
}

impl Column {
    pub fn int64(values: impl IntoIterator<Item = i64>) -> Self {
        Column::Int64(values.into_iter().map(Some).collect())
    }

    pub fn uint8(values: impl IntoIterator<Item = u8>) -> Self {
        Column::UInt8(values.into_iter().map(Some).collect())
    }

    pub fn float64(values: impl IntoIterator<Item = f64>) -> Self {
        Column::Float64(values.into_iter().map(Some).collect())
    }

    pub fn string<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Column::String(values.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn bool(values: impl IntoIterator<Item = bool>) -> Self {
        Column::Bool(values.into_iter().map(Some).collect())
    }

    pub fn nullable_bool(values: impl IntoIterator<Item = Option<bool>>) -> Self {
        Column::Bool(values.into_iter().collect())
    }

    /// An all-null column of `len` rows
    pub fn nulls(ty: ColumnType, len: usize) -> Self {
        match ty {
            ColumnType::Int64 => Column::Int64(vec![None; len]),
            ColumnType::UInt8 => Column::UInt8(vec![None; len]),
            ColumnType::Float64 => Column::Float64(vec![None; len]),
            ColumnType::String => Column::String(vec![None; len]),
            ColumnType::Bool => Column::Bool(std::iter::repeat(None).take(len).collect()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::UInt8(_) => ColumnType::UInt8,
            Column::Float64(_) => ColumnType::Float64,
            Column::String(_) => ColumnType::String,
            Column::Bool(_) => ColumnType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::UInt8(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::String(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `idx`; out-of-range rows read as null
    pub fn get(&self, idx: usize) -> PropertyValue {
        let value = match self {
            Column::Int64(v) => v.get(idx).copied().flatten().map(PropertyValue::Int64),
            Column::UInt8(v) => v.get(idx).copied().flatten().map(PropertyValue::UInt8),
            Column::Float64(v) => v.get(idx).copied().flatten().map(PropertyValue::Float64),
            Column::String(v) => v
                .get(idx)
                .and_then(|o| o.as_ref())
                .map(|s| PropertyValue::String(s.clone())),
            Column::Bool(v) => (idx < v.len()).then(|| v.get(idx)).flatten().map(PropertyValue::Bool),
        };
        value.unwrap_or(PropertyValue::Null)
    }

    pub fn is_null(&self, idx: usize) -> bool {
        self.get(idx).is_null()
    }

    /// Type-flag reading of a row: booleans as-is, `UInt8` non-zero as
    /// true, nulls as false. `None` for other column types.
    pub fn flag(&self, idx: usize) -> Option<bool> {
        match self {
            Column::Bool(v) => Some(v.get(idx).unwrap_or(false)),
            Column::UInt8(v) => Some(v[idx].map_or(false, |b| b != 0)),
            _ => None,
        }
    }

    /// True for column types that can define entity types
    pub fn is_flag_column(&self) -> bool {
        matches!(self, Column::Bool(_) | Column::UInt8(_))
    }

    pub fn as_int64(&self) -> Option<&[Option<i64>]> {
        match self {
            Column::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[Option<String>]> {
        match self {
            Column::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&BoolColumn> {
        match self {
            Column::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Approximate resident size in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Column::Int64(v) => v.len() * std::mem::size_of::<Option<i64>>(),
            Column::UInt8(v) => v.len() * std::mem::size_of::<Option<u8>>(),
            Column::Float64(v) => v.len() * std::mem::size_of::<Option<f64>>(),
            Column::String(v) => v
                .iter()
                .map(|s| std::mem::size_of::<Option<String>>() + s.as_ref().map_or(0, |s| s.len()))
                .sum(),
            Column::Bool(v) => (v.values.words().len() + v.validity.words().len()) * 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_nulls() {
        let col = Column::Int64(vec![Some(1), None, Some(3)]);
        assert_eq!(col.len(), 3);
        assert_eq!(col.get(0), PropertyValue::Int64(1));
        assert!(col.is_null(1));
        assert!(col.get(10).is_null());

        let col = Column::string(["a", "b"]);
        assert_eq!(col.get(1).as_str(), Some("b"));
        assert_eq!(col.column_type(), ColumnType::String);
    }

    #[test]
    fn test_bool_column_packing() {
        let col = Column::nullable_bool([Some(true), None, Some(false), Some(true)]);
        let bools = col.as_bool().unwrap();
        assert_eq!(bools.len(), 4);
        assert_eq!(bools.get(0), Some(true));
        assert_eq!(bools.get(1), None);
        assert_eq!(bools.true_count(), 2);
        assert_eq!(bools.null_count(), 1);
        assert_eq!(col.get(2), PropertyValue::Bool(false));
        assert!(col.get(1).is_null());
    }

    #[test]
    fn test_flags() {
        let col = Column::UInt8(vec![Some(0), Some(2), None]);
        assert_eq!(col.flag(0), Some(false));
        assert_eq!(col.flag(1), Some(true));
        assert_eq!(col.flag(2), Some(false));
        assert!(col.is_flag_column());
        assert_eq!(Column::float64([1.0]).flag(0), None);
    }

    #[test]
    fn test_nulls_constructor() {
        for ty in [ColumnType::Int64, ColumnType::UInt8, ColumnType::Float64, ColumnType::String, ColumnType::Bool] {
            let col = Column::nulls(ty, 5);
            assert_eq!(col.len(), 5);
            assert_eq!(col.column_type(), ty);
            assert!((0..5).all(|i| col.is_null(i)));
        }
    }
}

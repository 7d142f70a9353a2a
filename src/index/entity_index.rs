//! Ordered secondary index over one property column
//!
//! Maps every non-null value of the column to the ascending ids of the
//! rows holding it, so point and range lookups never re-sort the column.

use crate::error::{RdgError, RdgResult};
use crate::property::{Column, ColumnType};
use std::collections::BTreeMap;
use std::ops::{Bound, RangeBounds};

/// Indexable value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Int64(i64),
    UInt8(u8),
    Bool(bool),
    String(String),
}

impl From<i64> for IndexKey {
    fn from(v: i64) -> Self {
        IndexKey::Int64(v)
    }
}

impl From<u8> for IndexKey {
    fn from(v: u8) -> Self {
        IndexKey::UInt8(v)
    }
}

impl From<bool> for IndexKey {
    fn from(v: bool) -> Self {
        IndexKey::Bool(v)
    }
}

impl From<&str> for IndexKey {
    fn from(v: &str) -> Self {
        IndexKey::String(v.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(v: String) -> Self {
        IndexKey::String(v)
    }
}

/// Index for one node or edge property
#[derive(Debug, Clone)]
pub struct EntityIndex {
    property: String,
    key_type: ColumnType,
    /// Value -> row ids, ascending
    index: BTreeMap<IndexKey, Vec<u64>>,
    num_ids: usize,
}

impl EntityIndex {
    /// Index `column`; float columns have no total order and are rejected
    pub fn build(property: impl Into<String>, column: &Column) -> RdgResult<Self> {
        let property = property.into();
        let mut index: BTreeMap<IndexKey, Vec<u64>> = BTreeMap::new();
        let mut insert = |key: IndexKey, row: usize| index.entry(key).or_default().push(row as u64);

        match column {
            Column::Int64(values) => {
                for (row, v) in values.iter().enumerate() {
                    if let Some(v) = v {
                        insert(IndexKey::Int64(*v), row);
                    }
                }
            }
            Column::UInt8(values) => {
                for (row, v) in values.iter().enumerate() {
                    if let Some(v) = v {
                        insert(IndexKey::UInt8(*v), row);
                    }
                }
            }
            Column::String(values) => {
                for (row, v) in values.iter().enumerate() {
                    if let Some(v) = v {
                        insert(IndexKey::String(v.clone()), row);
                    }
                }
            }
            Column::Bool(values) => {
                for row in 0..values.len() {
                    if let Some(v) = values.get(row) {
                        insert(IndexKey::Bool(v), row);
                    }
                }
            }
            Column::Float64(_) => {
                return Err(RdgError::InvalidArgument(format!(
                    "cannot index float property {:?}",
                    property
                )))
            }
        }

        let num_ids = index.values().map(Vec::len).sum();
        Ok(Self {
            property,
            key_type: column.column_type(),
            index,
            num_ids,
        })
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn key_type(&self) -> ColumnType {
        self.key_type
    }

    /// Number of distinct values
    pub fn num_keys(&self) -> usize {
        self.index.len()
    }

    /// Number of indexed (non-null) rows
    pub fn len(&self) -> usize {
        self.num_ids
    }

    pub fn is_empty(&self) -> bool {
        self.num_ids == 0
    }

    /// Every (value, id) pair in value order
    pub fn iter(&self) -> impl Iterator<Item = (&IndexKey, u64)> + '_ {
        self.index
            .iter()
            .flat_map(|(key, ids)| ids.iter().map(move |&id| (key, id)))
    }

    /// Ids whose value equals `key`
    pub fn find(&self, key: &IndexKey) -> impl Iterator<Item = u64> + '_ {
        self.index.get(key).into_iter().flatten().copied()
    }

    /// Ids whose value is `>= key`, in value order
    pub fn lower_bound(&self, key: &IndexKey) -> impl Iterator<Item = u64> + '_ {
        self.range((Bound::Included(key.clone()), Bound::Unbounded))
    }

    /// Ids whose value is `> key`, in value order
    pub fn upper_bound(&self, key: &IndexKey) -> impl Iterator<Item = u64> + '_ {
        self.range((Bound::Excluded(key.clone()), Bound::Unbounded))
    }

    /// Ids whose value falls in `range`, in value order
    pub fn range<R>(&self, range: R) -> impl Iterator<Item = u64> + '_
    where
        R: RangeBounds<IndexKey>,
    {
        self.index.range(range).flat_map(|(_, ids)| ids.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_index_lookups() {
        let col = Column::Int64(vec![Some(30), Some(10), None, Some(20), Some(10)]);
        let index = EntityIndex::build("age", &col).unwrap();
        assert_eq!(index.num_keys(), 3);
        assert_eq!(index.len(), 4);

        assert_eq!(index.find(&10i64.into()).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(index.find(&99i64.into()).count(), 0);
        assert_eq!(index.lower_bound(&20i64.into()).collect::<Vec<_>>(), vec![3, 0]);
        assert_eq!(index.upper_bound(&20i64.into()).collect::<Vec<_>>(), vec![0]);
        assert_eq!(index.range(IndexKey::Int64(10)..IndexKey::Int64(30)).collect::<Vec<_>>(), vec![1, 4, 3]);

        let keys: Vec<_> = index.iter().map(|(k, id)| (k.clone(), id)).collect();
        assert_eq!(keys[0], (IndexKey::Int64(10), 1));
        assert_eq!(keys[3], (IndexKey::Int64(30), 0));
    }

    #[test]
    fn test_string_and_bool_index() {
        let names = Column::String(vec![Some("bob".into()), Some("alice".into()), None]);
        let index = EntityIndex::build("name", &names).unwrap();
        assert_eq!(index.iter().map(|(_, id)| id).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(index.key_type(), ColumnType::String);
        assert_eq!(index.lower_bound(&"b".into()).collect::<Vec<_>>(), vec![0]);

        let flags = Column::nullable_bool([Some(true), None, Some(false), Some(true)]);
        let index = EntityIndex::build("flag", &flags).unwrap();
        assert_eq!(index.find(&true.into()).collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_float_rejected() {
        let col = Column::float64([1.0, 2.0]);
        assert!(matches!(EntityIndex::build("w", &col), Err(RdgError::InvalidArgument(_))));
    }
}

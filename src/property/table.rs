//! Named property columns for the nodes (or edges) of one graph
//!
//! Columns keep their insertion order. A column is either persistent
//! (written by the next commit) or temporary (dropped at commit). Columns
//! that belong to the loaded version but were not requested at load time
//! stay in the table as unloaded entries and are carried forward.

use super::column::Column;
use crate::error::{RdgError, RdgResult};
use indexmap::IndexMap;
use std::sync::Arc;

/// Equal-length named columns, the input to add and upsert
#[derive(Debug, Clone, Default)]
pub struct PropertyBatch {
    columns: IndexMap<String, Column>,
}

impl PropertyBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PropertyBatch::add_column`]
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> RdgResult<Self> {
        self.add_column(name, column)?;
        Ok(self)
    }

    /// Append a column; names must be unique and lengths equal
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> RdgResult<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(RdgError::InvalidArgument(format!("duplicate column {:?} in batch", name)));
        }
        if let Some(rows) = self.num_rows() {
            if column.len() != rows {
                return Err(RdgError::InvalidArgument(format!(
                    "column {:?} has {} rows, batch has {}",
                    name,
                    column.len(),
                    rows
                )));
            }
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Row count, `None` for an empty batch
    pub fn num_rows(&self) -> Option<usize> {
        self.columns.values().next().map(Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn into_columns(self) -> impl Iterator<Item = (String, Column)> {
        self.columns.into_iter()
    }
}

/// Whether a column's data is resident
#[derive(Debug, Clone)]
enum ColumnData {
    Loaded(Arc<Column>),
    Unloaded,
}

#[derive(Debug, Clone)]
struct PropertyEntry {
    data: ColumnData,
    persistent: bool,
    /// Blob written for the current data, if any
    stored_path: Option<String>,
}

impl PropertyEntry {
    fn temporary(column: Column) -> Self {
        Self {
            data: ColumnData::Loaded(Arc::new(column)),
            persistent: false,
            stored_path: None,
        }
    }
}

/// Persistent column as seen by the committer
#[derive(Debug, Clone)]
pub enum CommitColumn<'a> {
    /// Needs to be written
    Dirty(&'a Arc<Column>),
    /// Already stored at this path
    Stored(&'a str),
}

/// Ordered set of named property columns
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    columns: IndexMap<String, PropertyEntry>,
    /// Required row count when fixed by the owning topology
    fixed_rows: Option<usize>,
    /// Row count of the columns currently in the table
    rows: Option<usize>,
}

impl PropertyTable {
    /// Table whose row count follows its first column
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose columns must have exactly `num_rows` rows
    pub fn with_rows(num_rows: usize) -> Self {
        Self {
            columns: IndexMap::new(),
            fixed_rows: Some(num_rows),
            rows: Some(num_rows),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    fn check_rows(&self, batch: &PropertyBatch) -> RdgResult<()> {
        match (self.rows, batch.num_rows()) {
            (Some(expected), Some(actual)) if expected != actual => Err(RdgError::InvalidArgument(format!(
                "expected {} rows, batch has {}",
                expected, actual
            ))),
            _ => Ok(()),
        }
    }

    /// Append every column of `batch`. Fails without modifying the table
    /// on a row-count mismatch or a name collision. New columns are
    /// temporary until marked persistent.
    pub fn add_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.check_rows(&batch)?;
        if let Some(name) = batch.names().find(|n| self.columns.contains_key(*n)) {
            return Err(RdgError::InvalidArgument(format!("property {:?} already exists", name)));
        }
        self.append(batch);
        Ok(())
    }

    /// Like [`PropertyTable::add_properties`], but columns with existing
    /// names are replaced in place and keep their persistence flag.
    pub fn upsert_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.check_rows(&batch)?;
        if self.rows.is_none() {
            self.rows = batch.num_rows();
        }
        for (name, column) in batch.into_columns() {
            match self.columns.get_mut(&name) {
                Some(entry) => {
                    entry.data = ColumnData::Loaded(Arc::new(column));
                    entry.stored_path = None;
                }
                None => {
                    self.columns.insert(name, PropertyEntry::temporary(column));
                }
            }
        }
        Ok(())
    }

    fn append(&mut self, batch: PropertyBatch) {
        if self.rows.is_none() {
            self.rows = batch.num_rows();
        }
        for (name, column) in batch.into_columns() {
            self.columns.insert(name, PropertyEntry::temporary(column));
        }
    }

    /// Drop a column by name; later columns shift down by one
    pub fn remove_property(&mut self, name: &str) -> RdgResult<()> {
        let index = self
            .columns
            .get_index_of(name)
            .ok_or_else(|| RdgError::PropertyNotFound(name.to_string()))?;
        self.remove_property_at(index)
    }

    /// Drop the column at `index`
    pub fn remove_property_at(&mut self, index: usize) -> RdgResult<()> {
        if self.columns.shift_remove_index(index).is_none() {
            return Err(RdgError::PropertyNotFound(format!("column index {}", index)));
        }
        if self.columns.is_empty() && self.fixed_rows.is_none() {
            self.rows = None;
        }
        Ok(())
    }

    /// Flag `names` for the next commit. Unknown names fail before any
    /// flag is changed.
    pub fn mark_persistent<S: AsRef<str>>(&mut self, names: &[S]) -> RdgResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.columns.contains_key(n.as_ref())) {
            return Err(RdgError::PropertyNotFound(missing.as_ref().to_string()));
        }
        for name in names {
            if let Some(entry) = self.columns.get_mut(name.as_ref()) {
                entry.persistent = true;
            }
        }
        Ok(())
    }

    pub fn mark_all_persistent(&mut self) {
        for entry in self.columns.values_mut() {
            entry.persistent = true;
        }
    }

    pub fn is_persistent(&self, name: &str) -> bool {
        self.columns.get(name).is_some_and(|e| e.persistent)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.columns
            .get(name)
            .is_some_and(|e| matches!(e.data, ColumnData::Loaded(_)))
    }

    /// Column data by name
    pub fn get(&self, name: &str) -> RdgResult<&Column> {
        let entry = self
            .columns
            .get(name)
            .ok_or_else(|| RdgError::PropertyNotFound(name.to_string()))?;
        match &entry.data {
            ColumnData::Loaded(column) => Ok(column),
            ColumnData::Unloaded => Err(RdgError::PropertyNotLoaded(name.to_string())),
        }
    }

    /// Shared handle to a column's data
    pub fn get_shared(&self, name: &str) -> RdgResult<Arc<Column>> {
        let entry = self
            .columns
            .get(name)
            .ok_or_else(|| RdgError::PropertyNotFound(name.to_string()))?;
        match &entry.data {
            ColumnData::Loaded(column) => Ok(Arc::clone(column)),
            ColumnData::Unloaded => Err(RdgError::PropertyNotLoaded(name.to_string())),
        }
    }

    /// Name and data of the column at `index`
    pub fn get_at(&self, index: usize) -> RdgResult<(&str, &Column)> {
        let (name, entry) = self
            .columns
            .get_index(index)
            .ok_or_else(|| RdgError::PropertyNotFound(format!("column index {}", index)))?;
        match &entry.data {
            ColumnData::Loaded(column) => Ok((name.as_str(), column)),
            ColumnData::Unloaded => Err(RdgError::PropertyNotLoaded(name.clone())),
        }
    }

    /// Register a stored column without loading its data
    pub(crate) fn insert_unloaded(&mut self, name: String, path: String) {
        self.columns.insert(
            name,
            PropertyEntry {
                data: ColumnData::Unloaded,
                persistent: true,
                stored_path: Some(path),
            },
        );
    }

    /// Stored blob path of a column, if it has one
    pub(crate) fn stored_path(&self, name: &str) -> Option<&str> {
        self.columns.get(name).and_then(|e| e.stored_path.as_deref())
    }

    /// Attach data read from a column's stored blob
    pub(crate) fn bind_loaded(&mut self, name: &str, column: Column) -> RdgResult<()> {
        if let Some(rows) = self.rows {
            if column.len() != rows {
                return Err(RdgError::InvalidArgument(format!(
                    "stored column {:?} has {} rows, expected {}",
                    name,
                    column.len(),
                    rows
                )));
            }
        }
        let entry = self
            .columns
            .get_mut(name)
            .ok_or_else(|| RdgError::PropertyNotFound(name.to_string()))?;
        entry.data = ColumnData::Loaded(Arc::new(column));
        Ok(())
    }

    /// Release a stored column's data; it can be loaded again later
    pub(crate) fn unload(&mut self, name: &str) -> RdgResult<()> {
        let entry = self
            .columns
            .get_mut(name)
            .ok_or_else(|| RdgError::PropertyNotFound(name.to_string()))?;
        if entry.stored_path.is_none() {
            return Err(RdgError::InvalidArgument(format!(
                "property {:?} has no stored copy to reload from",
                name
            )));
        }
        entry.data = ColumnData::Unloaded;
        Ok(())
    }

    /// Record that a column's current data now lives at `path`
    pub(crate) fn set_stored(&mut self, name: &str, path: String) {
        if let Some(entry) = self.columns.get_mut(name) {
            entry.stored_path = Some(path);
        }
    }

    /// Persistent columns in table order with what commit must do for each
    pub(crate) fn commit_columns(&self) -> Vec<(&str, CommitColumn<'_>)> {
        self.columns
            .iter()
            .filter(|(_, e)| e.persistent)
            .filter_map(|(name, e)| match (&e.stored_path, &e.data) {
                (Some(path), _) => Some((name.as_str(), CommitColumn::Stored(path.as_str()))),
                (None, ColumnData::Loaded(column)) => Some((name.as_str(), CommitColumn::Dirty(column))),
                (None, ColumnData::Unloaded) => None,
            })
            .collect()
    }

    /// Loaded columns as a batch, in table order
    pub(crate) fn into_batch(self) -> PropertyBatch {
        let columns = self
            .columns
            .into_iter()
            .filter_map(|(name, e)| match e.data {
                ColumnData::Loaded(column) => {
                    Some((name, Arc::try_unwrap(column).unwrap_or_else(|shared| (*shared).clone())))
                }
                ColumnData::Unloaded => None,
            })
            .collect();
        PropertyBatch { columns }
    }
}

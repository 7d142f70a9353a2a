//! Property storage: typed columns, tables of named columns, and their
//! stored encoding.

pub mod codec;
pub mod column;
pub mod table;

pub use column::{BoolColumn, Column, ColumnType, PropertyValue};
pub use table::{PropertyBatch, PropertyTable};

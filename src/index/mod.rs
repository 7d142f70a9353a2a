//! Secondary indexes over property columns

pub mod entity_index;

pub use entity_index::{EntityIndex, IndexKey};

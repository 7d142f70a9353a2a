//! In-memory topology layer for the Samyama RDG engine.
//!
//! Everything in this crate is pure: arrays in, arrays out. Storage,
//! property tables and entity types live in the `samyama-rdg` crate,
//! which feeds per-edge type ids and node/edge predicates into the
//! builders here.

pub mod bitset;
pub mod common;
pub mod executor;
pub mod projection;
pub mod shuffle;
pub mod type_aware;
pub mod view;

pub use bitset::DynamicBitset;
pub use common::{EdgeId, EntityTypeId, GraphTopology, NodeId};
pub use executor::{parallel_prefix_sum, Executor};
pub use projection::{project, ProjectedTopology, INVALID_EDGE, INVALID_NODE};
pub use shuffle::{EdgeShuffleTopology, ShuffleTopology};
pub use type_aware::EdgeTypeAwareBiDir;
pub use view::{DerivedView, EdgeSortKind, ViewKey};

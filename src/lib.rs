//! Samyama RDG
//!
//! A columnar, versioned storage engine for large property graphs.
//!
//! # Architecture
//!
//! - **Topology** (`samyama-topology` crate): immutable CSR adjacency plus
//!   derived views (sorted, transposed, node-shuffled, edge-type aware)
//!   and type projections, all built in parallel on an explicit executor.
//! - **Properties** ([`property`]): named nullable columns for nodes and
//!   edges, persistent or temporary, loaded lazily per column.
//! - **Entity types** ([`entity_types`]): boolean columns folded into
//!   atomic and composite type ids with subtype bitsets.
//! - **Versions** ([`manifest`], [`rdg`]): every commit writes new blobs
//!   and a `meta_<N>` manifest, then swaps the `meta` head. Old versions
//!   stay loadable until garbage collected.
//! - **Storage** ([`blob`]): async blob stores (local directory or
//!   in-memory) with bounded-concurrency write groups.
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_rdg::blob::MemoryBlobStore;
//! use samyama_rdg::{Column, GraphTopology, LoadOptions, PropertyBatch, Rdg, RdgConfig, RdgLineage};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = Arc::new(MemoryBlobStore::new());
//!
//! // A three node ring
//! let topology = GraphTopology::from_edges(3, &[(0, 1), (1, 2), (2, 0)]);
//! let mut rdg = Rdg::create(store.clone(), "graphs/ring", topology, RdgConfig::default()).unwrap();
//!
//! // Add and persist a node property
//! let ages = PropertyBatch::new().with_column("age", Column::int64([31, 42, 27])).unwrap();
//! rdg.add_node_properties(ages).unwrap();
//! rdg.mark_node_properties_persistent(&["age"]).unwrap();
//!
//! let version = rdg.commit(RdgLineage::with_command("example")).await.unwrap();
//! assert_eq!(version, 1);
//!
//! // Read it back
//! let loaded = Rdg::load(store, "graphs/ring", LoadOptions::head(), RdgConfig::default())
//!     .await
//!     .unwrap();
//! assert_eq!(loaded.num_edges(), 3);
//! assert_eq!(loaded.get_node_property("age").unwrap().get(1).as_int64(), Some(42));
//! # });
//! ```

pub mod blob;
pub mod cache;
pub mod config;
pub mod entity_types;
pub mod error;
pub mod index;
pub mod manifest;
pub mod property;
pub mod rdg;
pub mod topology_file;

pub use blob::{BlobStore, LocalBlobStore, MemoryBlobStore};
pub use config::{LoadOptions, RdgConfig};
pub use entity_types::{EntityTypeManager, EntityTypes, UNKNOWN_ENTITY_TYPE};
pub use error::{RdgError, RdgResult};
pub use index::{EntityIndex, IndexKey};
pub use manifest::{RdgLineage, RdgManifest};
pub use property::{Column, ColumnType, PropertyBatch, PropertyTable, PropertyValue};
pub use rdg::{ProjectedGraph, Rdg};

pub use samyama_topology::{
    DerivedView, DynamicBitset, EdgeId, EdgeShuffleTopology, EdgeSortKind, EdgeTypeAwareBiDir, EntityTypeId,
    Executor, GraphTopology, NodeId, ProjectedTopology, ShuffleTopology, ViewKey, project,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

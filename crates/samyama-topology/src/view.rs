//! Keys and the tagged union over derived topology views

use crate::shuffle::{EdgeShuffleTopology, ShuffleTopology};
use crate::type_aware::EdgeTypeAwareBiDir;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order of edges inside each node's edge range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EdgeSortKind {
    /// Original edge id order
    Any,
    /// Destination id, ties by original edge id
    ByDestId,
    /// Edge entity type, then destination, then original edge id
    ByEdgeType,
}

/// Identifies one derived view of a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ViewKey {
    /// Edges re-sorted per node, optionally over the transposed graph
    EdgeShuffle { transposed: bool, sort: EdgeSortKind },
    /// Nodes reordered by descending degree, edges sorted by destination
    NodeAndEdgeShuffle,
    /// Per-(node, edge type) bucketed out- and in-edges
    EdgeTypeAwareBiDir,
}

impl ViewKey {
    /// Short stable name used in logs and blob names
    pub fn name(&self) -> String {
        match self {
            ViewKey::EdgeShuffle { transposed, sort } => format!(
                "edge_shuffle_{}_{}",
                if *transposed { "in" } else { "out" },
                match sort {
                    EdgeSortKind::Any => "any",
                    EdgeSortKind::ByDestId => "dest",
                    EdgeSortKind::ByEdgeType => "type",
                }
            ),
            ViewKey::NodeAndEdgeShuffle => "node_edge_shuffle".to_string(),
            ViewKey::EdgeTypeAwareBiDir => "edge_type_aware_bidir".to_string(),
        }
    }

    /// True if building the view needs per-edge entity types
    pub fn needs_edge_types(&self) -> bool {
        matches!(
            self,
            ViewKey::EdgeShuffle { sort: EdgeSortKind::ByEdgeType, .. } | ViewKey::EdgeTypeAwareBiDir
        )
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A built derived view
#[derive(Debug, Clone)]
pub enum DerivedView {
    EdgeShuffle(EdgeShuffleTopology),
    NodeAndEdgeShuffle(ShuffleTopology),
    EdgeTypeAwareBiDir(EdgeTypeAwareBiDir),
}

impl DerivedView {
    /// Key this view was built for
    pub fn key(&self) -> ViewKey {
        match self {
            DerivedView::EdgeShuffle(v) => ViewKey::EdgeShuffle {
                transposed: v.is_transposed(),
                sort: v.sort_kind(),
            },
            DerivedView::NodeAndEdgeShuffle(_) => ViewKey::NodeAndEdgeShuffle,
            DerivedView::EdgeTypeAwareBiDir(_) => ViewKey::EdgeTypeAwareBiDir,
        }
    }

    /// Approximate resident size in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            DerivedView::EdgeShuffle(v) => v.memory_usage(),
            DerivedView::NodeAndEdgeShuffle(v) => v.memory_usage(),
            DerivedView::EdgeTypeAwareBiDir(v) => v.memory_usage(),
        }
    }

    pub fn as_edge_shuffle(&self) -> Option<&EdgeShuffleTopology> {
        match self {
            DerivedView::EdgeShuffle(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_node_and_edge_shuffle(&self) -> Option<&ShuffleTopology> {
        match self {
            DerivedView::NodeAndEdgeShuffle(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_edge_type_aware(&self) -> Option<&EdgeTypeAwareBiDir> {
        match self {
            DerivedView::EdgeTypeAwareBiDir(v) => Some(v),
            _ => None,
        }
    }
}

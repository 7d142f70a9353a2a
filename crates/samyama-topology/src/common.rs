//! Shared topology types
//!
//! Provides the base Compressed Sparse Row (CSR) topology every derived
//! view and projection is built from.

use std::ops::Range;

/// Dense node identifier, valid in `[0, num_nodes)`
pub type NodeId = u32;

/// Dense edge identifier, valid in `[0, num_edges)`
pub type EdgeId = u64;

/// Dense identifier of a combination of atomic entity types.
/// Id 0 means "unknown / no type".
pub type EntityTypeId = u16;

/// Outgoing adjacency in CSR form.
///
/// `out_indices[n]` is the exclusive end of node `n`'s edge range; the
/// start is `out_indices[n - 1]` (or 0 for the first node).
/// `out_dests[e]` is the destination of edge `e`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphTopology {
    out_indices: Vec<u64>,
    out_dests: Vec<NodeId>,
}

impl GraphTopology {
    /// Create a topology from raw CSR arrays.
    ///
    /// Panics if the arrays violate the CSR invariants; callers holding
    /// untrusted input should use [`GraphTopology::try_new`].
    pub fn new(out_indices: Vec<u64>, out_dests: Vec<NodeId>) -> Self {
        let topology = Self { out_indices, out_dests };
        assert!(
            topology.validate(),
            "corrupted topology: out_indices must be non-decreasing, end at num_edges, and every destination must be a valid node"
        );
        topology
    }

    /// Create a topology from raw CSR arrays, returning `None` if they are
    /// not a valid CSR.
    pub fn try_new(out_indices: Vec<u64>, out_dests: Vec<NodeId>) -> Option<Self> {
        let topology = Self { out_indices, out_dests };
        topology.validate().then_some(topology)
    }

    /// A topology with no nodes and no edges
    pub fn empty() -> Self {
        Self::default()
    }

    /// A topology with `num_nodes` nodes and no edges
    pub fn with_nodes(num_nodes: usize) -> Self {
        Self {
            out_indices: vec![0; num_nodes],
            out_dests: Vec::new(),
        }
    }

    /// Build a topology from an edge list.
    ///
    /// Edges keep their relative input order within each source node, so
    /// edge ids are assigned in (source, input position) order.
    pub fn from_edges(num_nodes: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut degrees = vec![0u64; num_nodes];
        for &(src, _) in edges {
            degrees[src as usize] += 1;
        }

        let mut out_indices = Vec::with_capacity(num_nodes);
        let mut total = 0u64;
        for degree in &degrees {
            total += degree;
            out_indices.push(total);
        }

        // Cursor per node starting at its range start
        let mut cursors: Vec<u64> = out_indices
            .iter()
            .zip(degrees.iter())
            .map(|(end, degree)| end - degree)
            .collect();
        let mut out_dests = vec![0; edges.len()];
        for &(src, dst) in edges {
            let slot = &mut cursors[src as usize];
            out_dests[*slot as usize] = dst;
            *slot += 1;
        }

        Self::new(out_indices, out_dests)
    }

    /// Check the CSR invariants
    pub fn validate(&self) -> bool {
        let num_nodes = self.out_indices.len() as u64;
        if num_nodes > NodeId::MAX as u64 + 1 {
            return false;
        }
        if self.out_indices.windows(2).any(|w| w[0] > w[1]) {
            return false;
        }
        let last = self.out_indices.last().copied().unwrap_or(0);
        if last != self.out_dests.len() as u64 {
            return false;
        }
        self.out_dests.iter().all(|&dst| (dst as u64) < num_nodes)
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.out_indices.len()
    }

    /// Number of edges
    pub fn num_edges(&self) -> usize {
        self.out_dests.len()
    }

    /// Edge id range of a node's outgoing edges
    pub fn out_edges(&self, node: NodeId) -> Range<EdgeId> {
        let idx = node as usize;
        let start = if idx == 0 { 0 } else { self.out_indices[idx - 1] };
        start..self.out_indices[idx]
    }

    /// Destination of an edge
    pub fn out_edge_dst(&self, edge: EdgeId) -> NodeId {
        self.out_dests[edge as usize]
    }

    /// Destinations of a node's outgoing edges
    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        let range = self.out_edges(node);
        &self.out_dests[range.start as usize..range.end as usize]
    }

    /// Out-degree of a node
    pub fn degree(&self, node: NodeId) -> u64 {
        let range = self.out_edges(node);
        range.end - range.start
    }

    /// All node ids
    pub fn all_nodes(&self) -> Range<NodeId> {
        0..self.num_nodes() as NodeId
    }

    /// All edge ids
    pub fn all_edges(&self) -> Range<EdgeId> {
        0..self.num_edges() as EdgeId
    }

    /// Cumulative out-degree prefix sums
    pub fn out_indices(&self) -> &[u64] {
        &self.out_indices
    }

    /// Destination array
    pub fn out_dests(&self) -> &[NodeId] {
        &self.out_dests
    }

    /// Approximate resident size in bytes
    pub fn memory_usage(&self) -> usize {
        self.out_indices.len() * std::mem::size_of::<u64>()
            + self.out_dests.len() * std::mem::size_of::<NodeId>()
    }

    /// Consume the topology and return its raw arrays
    pub fn into_parts(self) -> (Vec<u64>, Vec<NodeId>) {
        (self.out_indices, self.out_dests)
    }
}

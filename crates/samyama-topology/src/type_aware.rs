//! Bidirectional topology bucketed by edge entity type.
//!
//! Each node's out- and in-edge ranges are sorted by (edge type,
//! neighbor), and a `num_nodes * num_types` index records where each
//! (node, type) block ends, so the edges of one type between two nodes
//! are found with a binary search inside a single block.

use crate::common::{EdgeId, EntityTypeId, GraphTopology, NodeId};
use crate::executor::Executor;
use crate::shuffle::{equal_range, EdgeShuffleTopology};
use crate::view::EdgeSortKind;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct EdgeTypeAwareBiDir {
    /// Dense type index -> edge entity type, ascending
    edge_types: Vec<EntityTypeId>,
    type_index: BTreeMap<EntityTypeId, usize>,
    out: EdgeShuffleTopology,
    incoming: EdgeShuffleTopology,
    /// End offset of every (node, type) block in `out`
    out_adj: Vec<u64>,
    /// End offset of every (node, type) block in `incoming`
    in_adj: Vec<u64>,
}

impl EdgeTypeAwareBiDir {
    /// Build both directions; `edge_types[e]` is the entity type of
    /// original edge `e`.
    pub fn make(exec: &Executor, base: &GraphTopology, edge_types: &[EntityTypeId]) -> Self {
        assert_eq!(edge_types.len(), base.num_edges(), "one entity type per edge expected");

        // Per-worker local sets merged into one ordered map
        let distinct: BTreeSet<EntityTypeId> = exec.install(|| {
            edge_types
                .par_iter()
                .fold(BTreeSet::new, |mut set, &ty| {
                    set.insert(ty);
                    set
                })
                .reduce(BTreeSet::new, |mut a, b| {
                    a.extend(b);
                    a
                })
        });
        let edge_types_sorted: Vec<EntityTypeId> = distinct.into_iter().collect();
        let type_index: BTreeMap<EntityTypeId, usize> = edge_types_sorted
            .iter()
            .enumerate()
            .map(|(i, &ty)| (ty, i))
            .collect();

        let out = EdgeShuffleTopology::make(exec, base, false, EdgeSortKind::ByEdgeType, Some(edge_types));
        let incoming = EdgeShuffleTopology::make(exec, base, true, EdgeSortKind::ByEdgeType, Some(edge_types));

        let out_adj = build_adj_index(exec, &out, edge_types, &edge_types_sorted);
        let in_adj = build_adj_index(exec, &incoming, edge_types, &edge_types_sorted);

        Self {
            edge_types: edge_types_sorted,
            type_index,
            out,
            incoming,
            out_adj,
            in_adj,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.out.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.out.num_edges()
    }

    /// Distinct edge entity types, ascending
    pub fn distinct_edge_types(&self) -> &[EntityTypeId] {
        &self.edge_types
    }

    pub fn has_edge_type(&self, ty: EntityTypeId) -> bool {
        self.type_index.contains_key(&ty)
    }

    /// Out-edge view, sorted by (type, destination)
    pub fn out_view(&self) -> &EdgeShuffleTopology {
        &self.out
    }

    /// In-edge view, sorted by (type, source)
    pub fn in_view(&self) -> &EdgeShuffleTopology {
        &self.incoming
    }

    pub fn out_degree(&self, node: NodeId) -> u64 {
        self.out.degree(node)
    }

    pub fn in_degree(&self, node: NodeId) -> u64 {
        self.incoming.degree(node)
    }

    /// Out-view edges of `node` with type `ty`
    pub fn out_edges_with_type(&self, node: NodeId, ty: EntityTypeId) -> Range<EdgeId> {
        match self.type_index.get(&ty) {
            Some(&ti) => block(&self.out, &self.out_adj, self.edge_types.len(), node, ti),
            None => 0..0,
        }
    }

    /// In-view edges of `node` with type `ty`
    pub fn in_edges_with_type(&self, node: NodeId, ty: EntityTypeId) -> Range<EdgeId> {
        match self.type_index.get(&ty) {
            Some(&ti) => block(&self.incoming, &self.in_adj, self.edge_types.len(), node, ti),
            None => 0..0,
        }
    }

    pub fn out_degree_with_type(&self, node: NodeId, ty: EntityTypeId) -> u64 {
        let r = self.out_edges_with_type(node, ty);
        r.end - r.start
    }

    pub fn in_degree_with_type(&self, node: NodeId, ty: EntityTypeId) -> u64 {
        let r = self.in_edges_with_type(node, ty);
        r.end - r.start
    }

    /// Out-view edges from `src` to `dst` with type `label`. Every edge in
    /// the returned range has destination `dst`; map it back with
    /// `out_view().edge_prop_index`.
    pub fn find_all_edges_with_label(&self, src: NodeId, dst: NodeId, label: EntityTypeId) -> Range<EdgeId> {
        let out_block = self.out_edges_with_type(src, label);
        if out_block.is_empty() || self.in_degree_with_type(dst, label) == 0 {
            return 0..0;
        }
        equal_range(self.out.topology(), out_block, dst)
    }

    /// Original ids of all edges from `src` to `dst`, grouped by type
    pub fn find_all_edges(&self, src: NodeId, dst: NodeId) -> Vec<EdgeId> {
        if self.out_degree(src) == 0 || self.in_degree(dst) == 0 {
            return Vec::new();
        }
        self.edge_types
            .iter()
            .flat_map(|&ty| self.find_all_edges_with_label(src, dst, ty))
            .map(|e| self.out.edge_prop_index(e))
            .collect()
    }

    /// True if an edge `a -> b` of type `label` exists. Searches the side
    /// with fewer candidates; on a tie the out-edges of `a` are searched.
    pub fn is_connected_with_edge_label(&self, a: NodeId, b: NodeId, label: EntityTypeId) -> bool {
        let out_block = self.out_edges_with_type(a, label);
        let in_block = self.in_edges_with_type(b, label);
        if out_block.is_empty() || in_block.is_empty() {
            return false;
        }
        let out_len = out_block.end - out_block.start;
        let in_len = in_block.end - in_block.start;
        if out_len <= in_len {
            !equal_range(self.out.topology(), out_block, b).is_empty()
        } else {
            !equal_range(self.incoming.topology(), in_block, a).is_empty()
        }
    }

    /// True if any edge `a -> b` exists
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        if self.out_degree(a) == 0 || self.in_degree(b) == 0 {
            return false;
        }
        self.edge_types
            .iter()
            .any(|&ty| self.is_connected_with_edge_label(a, b, ty))
    }

    pub fn memory_usage(&self) -> usize {
        self.out.memory_usage()
            + self.incoming.memory_usage()
            + (self.out_adj.len() + self.in_adj.len()) * std::mem::size_of::<u64>()
    }
}

fn block(view: &EdgeShuffleTopology, adj: &[u64], num_types: usize, node: NodeId, ti: usize) -> Range<EdgeId> {
    let base = node as usize * num_types;
    let start = if ti == 0 { view.out_edges(node).start } else { adj[base + ti - 1] };
    start..adj[base + ti]
}

/// One slot per (node, type): end of that type's block in `view`. Each
/// node fills its own `num_types` slots.
fn build_adj_index(
    exec: &Executor,
    view: &EdgeShuffleTopology,
    edge_types: &[EntityTypeId],
    distinct: &[EntityTypeId],
) -> Vec<u64> {
    let num_types = distinct.len();
    let mut adj = vec![0u64; view.num_nodes() * num_types];
    if num_types == 0 {
        return adj;
    }
    exec.install(|| {
        adj.par_chunks_mut(num_types).enumerate().for_each(|(node, slots)| {
            let range = view.out_edges(node as NodeId);
            let mut e = range.start;
            for (slot, &ty) in slots.iter_mut().zip(distinct.iter()) {
                while e < range.end && edge_types[view.edge_prop_index(e) as usize] <= ty {
                    e += 1;
                }
                *slot = e;
            }
        });
    });
    adj
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_buckets_partition_each_node() {
        let exec = Executor::new(2).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let edges: Vec<_> = (0..500).map(|_| (rng.gen_range(0..30), rng.gen_range(0..30))).collect();
        let base = GraphTopology::from_edges(30, &edges);
        let types: Vec<EntityTypeId> = (0..base.num_edges()).map(|_| rng.gen_range(1..5)).collect();
        let view = EdgeTypeAwareBiDir::make(&exec, &base, &types);

        for n in base.all_nodes() {
            let full = view.out_view().out_edges(n);
            let mut cursor = full.start;
            for &ty in view.distinct_edge_types() {
                let block = view.out_edges_with_type(n, ty);
                assert_eq!(block.start, cursor);
                for e in block.clone() {
                    assert_eq!(types[view.out_view().edge_prop_index(e) as usize], ty);
                }
                cursor = block.end;
            }
            assert_eq!(cursor, full.end);

            let in_total: u64 = view.distinct_edge_types().iter().map(|&t| view.in_degree_with_type(n, t)).sum();
            assert_eq!(in_total, view.in_degree(n));
        }
    }

    #[test]
    fn test_find_all_edges_with_label() {
        let exec = Executor::single_threaded();
        // 0 -a-> 1, 0 -b-> 1, 0 -a-> 1, 1 -a-> 2
        let base = GraphTopology::from_edges(3, &[(0, 1), (0, 1), (0, 1), (1, 2)]);
        let types = [1, 2, 1, 1];
        let view = EdgeTypeAwareBiDir::make(&exec, &base, &types);

        let found = view.find_all_edges_with_label(0, 1, 1);
        assert_eq!(found.end - found.start, 2);
        for e in found {
            assert_eq!(view.out_view().out_edge_dst(e), 1);
        }
        assert_eq!(view.find_all_edges_with_label(0, 1, 2).count(), 1);
        assert!(view.find_all_edges_with_label(0, 2, 1).is_empty());
        assert!(view.find_all_edges_with_label(0, 1, 9).is_empty());

        let mut all = view.find_all_edges(0, 1);
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[test]
    fn test_is_connected() {
        let exec = Executor::single_threaded();
        // hub 0 fans out to many nodes, 5 has a single in-edge from 0
        let mut edges: Vec<_> = (1..10).map(|d| (0, d)).collect();
        edges.push((3, 0));
        let base = GraphTopology::from_edges(10, &edges);
        let types = vec![1; base.num_edges()];
        let view = EdgeTypeAwareBiDir::make(&exec, &base, &types);

        assert!(view.is_connected(0, 5));
        assert!(view.is_connected(3, 0));
        assert!(!view.is_connected(5, 0));
        assert!(!view.is_connected(1, 2));
        assert!(view.is_connected_with_edge_label(0, 9, 1));
        assert!(!view.is_connected_with_edge_label(0, 9, 2));
    }

    #[test]
    fn test_no_edges() {
        let exec = Executor::single_threaded();
        let base = GraphTopology::with_nodes(4);
        let view = EdgeTypeAwareBiDir::make(&exec, &base, &[]);
        assert!(view.distinct_edge_types().is_empty());
        assert!(!view.is_connected(0, 1));
        assert!(view.find_all_edges(0, 1).is_empty());
    }
}

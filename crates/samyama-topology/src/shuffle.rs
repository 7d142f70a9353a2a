//! Edge-sorted and node-and-edge-sorted views of a base topology.
//!
//! Both views own the arrays they reorder plus a permutation back to the
//! original edge ids, which is what property lookups go through.

use crate::common::{EdgeId, EntityTypeId, GraphTopology, NodeId};
use crate::executor::{parallel_prefix_sum, split_by_indices, Executor};
use crate::view::EdgeSortKind;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Per-node edge order over the base graph or its transpose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeShuffleTopology {
    topology: GraphTopology,
    /// View edge -> original edge id
    edge_prop_indices: Vec<EdgeId>,
    transposed: bool,
    sort: EdgeSortKind,
}

impl EdgeShuffleTopology {
    /// Build an edge-sorted copy of `base`.
    ///
    /// With `transposed`, node `n`'s range holds the edges *entering* `n`
    /// and `out_edge_dst` returns their sources. `edge_types` holds the
    /// entity type of every original edge and is required for
    /// [`EdgeSortKind::ByEdgeType`].
    pub fn make(
        exec: &Executor,
        base: &GraphTopology,
        transposed: bool,
        sort: EdgeSortKind,
        edge_types: Option<&[EntityTypeId]>,
    ) -> Self {
        let (indices, mut dests, mut perm) = if transposed {
            transpose(exec, base)
        } else {
            let perm: Vec<EdgeId> = exec.install(|| (0..base.num_edges() as EdgeId).into_par_iter().collect());
            (base.out_indices().to_vec(), base.out_dests().to_vec(), perm)
        };

        match sort {
            // Transposed placement is racy, so restore original edge order
            EdgeSortKind::Any if transposed => {
                sort_edges_per_node(exec, &indices, &mut dests, &mut perm, |_, _| ());
            }
            EdgeSortKind::Any => {}
            EdgeSortKind::ByDestId => {
                sort_edges_per_node(exec, &indices, &mut dests, &mut perm, |dst, _| dst);
            }
            EdgeSortKind::ByEdgeType => {
                let types = match edge_types {
                    Some(types) => types,
                    None => panic!("sorting by edge type requires per-edge entity types"),
                };
                assert_eq!(types.len(), base.num_edges(), "one entity type per edge expected");
                sort_edges_per_node(exec, &indices, &mut dests, &mut perm, |dst, edge| {
                    (types[edge as usize], dst)
                });
            }
        }

        Self {
            topology: GraphTopology::new(indices, dests),
            edge_prop_indices: perm,
            transposed,
            sort,
        }
    }

    /// Reassemble a previously built view (e.g. loaded from storage)
    pub fn from_parts(
        topology: GraphTopology,
        edge_prop_indices: Vec<EdgeId>,
        transposed: bool,
        sort: EdgeSortKind,
    ) -> Self {
        assert_eq!(topology.num_edges(), edge_prop_indices.len());
        Self { topology, edge_prop_indices, transposed, sort }
    }

    pub fn topology(&self) -> &GraphTopology {
        &self.topology
    }

    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    pub fn sort_kind(&self) -> EdgeSortKind {
        self.sort
    }

    pub fn num_nodes(&self) -> usize {
        self.topology.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.topology.num_edges()
    }

    pub fn out_edges(&self, node: NodeId) -> Range<EdgeId> {
        self.topology.out_edges(node)
    }

    pub fn out_edge_dst(&self, edge: EdgeId) -> NodeId {
        self.topology.out_edge_dst(edge)
    }

    pub fn degree(&self, node: NodeId) -> u64 {
        self.topology.degree(node)
    }

    /// Original edge id of a view edge
    pub fn edge_prop_index(&self, edge: EdgeId) -> EdgeId {
        self.edge_prop_indices[edge as usize]
    }

    pub fn edge_prop_indices(&self) -> &[EdgeId] {
        &self.edge_prop_indices
    }

    /// View edges from `src` to `dst`. Only meaningful for destination
    /// sorted views.
    pub fn find_edges(&self, src: NodeId, dst: NodeId) -> Range<EdgeId> {
        assert_eq!(self.sort, EdgeSortKind::ByDestId, "find_edges needs a destination-sorted view");
        equal_range(&self.topology, self.out_edges(src), dst)
    }

    pub fn memory_usage(&self) -> usize {
        self.topology.memory_usage() + self.edge_prop_indices.len() * std::mem::size_of::<EdgeId>()
    }
}

/// Nodes reordered by descending degree, edges sorted by destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleTopology {
    topology: GraphTopology,
    node_old_to_new: Vec<NodeId>,
    node_new_to_old: Vec<NodeId>,
    /// View edge -> original edge id
    edge_prop_indices: Vec<EdgeId>,
}

impl ShuffleTopology {
    /// Reorder nodes by descending out-degree (ties by original id), remap
    /// every destination, then sort each node's edges by destination.
    pub fn make(exec: &Executor, base: &GraphTopology) -> Self {
        let num_nodes = base.num_nodes();

        let (new_to_old, sorted_degrees) = exec.install(|| {
            let mut pairs: Vec<(u64, NodeId)> = (0..num_nodes as NodeId)
                .into_par_iter()
                .map(|n| (base.degree(n), n))
                .collect();
            pairs.par_sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            pairs.into_par_iter().map(|(d, n)| (n, d)).unzip::<_, _, Vec<NodeId>, Vec<u64>>()
        });

        let old_to_new = exec.install(|| {
            let scatter: Vec<AtomicU32> = (0..num_nodes).map(|_| AtomicU32::new(0)).collect();
            new_to_old.par_iter().enumerate().for_each(|(new, &old)| {
                scatter[old as usize].store(new as NodeId, Ordering::Relaxed);
            });
            scatter.into_iter().map(AtomicU32::into_inner).collect::<Vec<_>>()
        });

        let indices = parallel_prefix_sum(exec, &sorted_degrees);
        let mut dests = vec![0 as NodeId; base.num_edges()];
        let mut perm = vec![0 as EdgeId; base.num_edges()];

        exec.install(|| {
            split_by_indices(&mut dests, &indices)
                .into_par_iter()
                .zip(split_by_indices(&mut perm, &indices).into_par_iter())
                .zip(new_to_old.par_iter())
                .for_each(|((dst_slot, perm_slot), &old)| {
                    for (i, edge) in base.out_edges(old).enumerate() {
                        dst_slot[i] = old_to_new[base.out_edge_dst(edge) as usize];
                        perm_slot[i] = edge;
                    }
                });
        });

        sort_edges_per_node(exec, &indices, &mut dests, &mut perm, |dst, _| dst);

        let topology = GraphTopology::new(indices, dests);
        assert_eq!(topology.num_edges(), base.num_edges(), "degree shuffle lost edges");

        Self {
            topology,
            node_old_to_new: old_to_new,
            node_new_to_old: new_to_old,
            edge_prop_indices: perm,
        }
    }

    /// Reassemble a previously built view (e.g. loaded from storage)
    pub fn from_parts(
        topology: GraphTopology,
        node_new_to_old: Vec<NodeId>,
        edge_prop_indices: Vec<EdgeId>,
    ) -> Self {
        assert_eq!(topology.num_nodes(), node_new_to_old.len());
        assert_eq!(topology.num_edges(), edge_prop_indices.len());
        let mut node_old_to_new = vec![0 as NodeId; node_new_to_old.len()];
        for (new, &old) in node_new_to_old.iter().enumerate() {
            node_old_to_new[old as usize] = new as NodeId;
        }
        Self { topology, node_old_to_new, node_new_to_old, edge_prop_indices }
    }

    pub fn topology(&self) -> &GraphTopology {
        &self.topology
    }

    pub fn num_nodes(&self) -> usize {
        self.topology.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.topology.num_edges()
    }

    pub fn out_edges(&self, node: NodeId) -> Range<EdgeId> {
        self.topology.out_edges(node)
    }

    pub fn out_edge_dst(&self, edge: EdgeId) -> NodeId {
        self.topology.out_edge_dst(edge)
    }

    pub fn degree(&self, node: NodeId) -> u64 {
        self.topology.degree(node)
    }

    /// New id of an original node
    pub fn new_node_id(&self, old: NodeId) -> NodeId {
        self.node_old_to_new[old as usize]
    }

    /// Original id of a view node
    pub fn original_node_id(&self, new: NodeId) -> NodeId {
        self.node_new_to_old[new as usize]
    }

    pub fn node_old_to_new(&self) -> &[NodeId] {
        &self.node_old_to_new
    }

    pub fn node_new_to_old(&self) -> &[NodeId] {
        &self.node_new_to_old
    }

    /// Original edge id of a view edge
    pub fn edge_prop_index(&self, edge: EdgeId) -> EdgeId {
        self.edge_prop_indices[edge as usize]
    }

    pub fn edge_prop_indices(&self) -> &[EdgeId] {
        &self.edge_prop_indices
    }

    pub fn memory_usage(&self) -> usize {
        self.topology.memory_usage()
            + (self.node_old_to_new.len() + self.node_new_to_old.len()) * std::mem::size_of::<NodeId>()
            + self.edge_prop_indices.len() * std::mem::size_of::<EdgeId>()
    }
}

/// In-edge CSR of `base`: indices, sources, and original edge ids.
/// Edge order inside a node's range is unspecified until sorted.
fn transpose(exec: &Executor, base: &GraphTopology) -> (Vec<u64>, Vec<NodeId>, Vec<EdgeId>) {
    let num_nodes = base.num_nodes();
    let num_edges = base.num_edges();

    let in_degrees: Vec<u64> = exec.install(|| {
        let counts: Vec<AtomicU64> = (0..num_nodes).map(|_| AtomicU64::new(0)).collect();
        base.out_dests().par_iter().for_each(|&dst| {
            counts[dst as usize].fetch_add(1, Ordering::Relaxed);
        });
        counts.into_iter().map(AtomicU64::into_inner).collect()
    });

    let indices = parallel_prefix_sum(exec, &in_degrees);

    let (sources, perm) = exec.install(|| {
        let cursors: Vec<AtomicU64> = indices
            .iter()
            .zip(in_degrees.iter())
            .map(|(end, degree)| AtomicU64::new(end - degree))
            .collect();
        let sources: Vec<AtomicU32> = (0..num_edges).map(|_| AtomicU32::new(0)).collect();
        let perm: Vec<AtomicU64> = (0..num_edges).map(|_| AtomicU64::new(0)).collect();

        (0..num_nodes as NodeId).into_par_iter().for_each(|src| {
            for edge in base.out_edges(src) {
                let dst = base.out_edge_dst(edge);
                let slot = cursors[dst as usize].fetch_add(1, Ordering::Relaxed) as usize;
                sources[slot].store(src, Ordering::Relaxed);
                perm[slot].store(edge, Ordering::Relaxed);
            }
        });

        (
            sources.into_iter().map(AtomicU32::into_inner).collect::<Vec<_>>(),
            perm.into_iter().map(AtomicU64::into_inner).collect::<Vec<_>>(),
        )
    });

    (indices, sources, perm)
}

/// Sort each node's edge sub-range by `key(dst, original_edge)`, ties
/// broken by original edge id. Sub-ranges are disjoint, so every node is
/// an independent task.
pub(crate) fn sort_edges_per_node<K, F>(
    exec: &Executor,
    indices: &[u64],
    dests: &mut [NodeId],
    perm: &mut [EdgeId],
    key: F,
) where
    K: Ord,
    F: Fn(NodeId, EdgeId) -> K + Sync,
{
    exec.install(|| {
        let mut pairs: Vec<(NodeId, EdgeId)> = dests
            .par_iter()
            .zip(perm.par_iter())
            .map(|(&d, &e)| (d, e))
            .collect();

        split_by_indices(&mut pairs, indices)
            .into_par_iter()
            .for_each(|edges| edges.sort_unstable_by(|a, b| (key(a.0, a.1), a.1).cmp(&(key(b.0, b.1), b.1))));

        dests
            .par_iter_mut()
            .zip(perm.par_iter_mut())
            .zip(pairs.par_iter())
            .for_each(|((d, e), &(nd, ne))| {
                *d = nd;
                *e = ne;
            });
    });
}

/// Sub-range of `range` whose destinations equal `dst`; the range must be
/// destination-sorted.
pub(crate) fn equal_range(topology: &GraphTopology, range: Range<EdgeId>, dst: NodeId) -> Range<EdgeId> {
    let slice = &topology.out_dests()[range.start as usize..range.end as usize];
    let lo = slice.partition_point(|&d| d < dst) as EdgeId;
    let hi = slice.partition_point(|&d| d <= dst) as EdgeId;
    range.start + lo..range.start + hi
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_graph(num_nodes: u32, num_edges: usize, seed: u64) -> GraphTopology {
        let mut rng = StdRng::seed_from_u64(seed);
        let edges: Vec<_> = (0..num_edges)
            .map(|_| (rng.gen_range(0..num_nodes), rng.gen_range(0..num_nodes)))
            .collect();
        GraphTopology::from_edges(num_nodes as usize, &edges)
    }

    fn assert_dest_sorted(topo: &GraphTopology) {
        for n in topo.all_nodes() {
            assert!(topo.successors(n).windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_edge_shuffle_sorts_by_destination() {
        let exec = Executor::new(4).unwrap();
        let base = random_graph(50, 400, 7);
        let view = EdgeShuffleTopology::make(&exec, &base, false, EdgeSortKind::ByDestId, None);

        assert_eq!(view.topology().out_indices(), base.out_indices());
        assert_dest_sorted(view.topology());
        for e in view.topology().all_edges() {
            let orig = view.edge_prop_index(e);
            assert_eq!(base.out_edge_dst(orig), view.out_edge_dst(e));
        }
    }

    #[test]
    fn test_edge_shuffle_is_idempotent() {
        let exec = Executor::single_threaded();
        let base = random_graph(30, 200, 11);
        let once = EdgeShuffleTopology::make(&exec, &base, false, EdgeSortKind::ByDestId, None);
        let twice = EdgeShuffleTopology::make(&exec, once.topology(), false, EdgeSortKind::ByDestId, None);
        assert_eq!(once.topology(), twice.topology());
    }

    #[test]
    fn test_edge_shuffle_ring_is_unchanged() {
        let exec = Executor::single_threaded();
        let edges: Vec<_> = (0..10u32).map(|i| (i, (i + 1) % 10)).collect();
        let base = GraphTopology::from_edges(10, &edges);
        let view = EdgeShuffleTopology::make(&exec, &base, false, EdgeSortKind::ByDestId, None);
        assert_eq!(view.topology(), &base);
        assert_eq!(view.edge_prop_indices(), &(0..10u64).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_transposed_view_holds_in_edges() {
        let exec = Executor::new(3).unwrap();
        let base = random_graph(40, 300, 3);
        let view = EdgeShuffleTopology::make(&exec, &base, true, EdgeSortKind::ByDestId, None);

        assert_eq!(view.num_edges(), base.num_edges());
        assert_dest_sorted(view.topology());
        for dst in view.topology().all_nodes() {
            for e in view.out_edges(dst) {
                let orig = view.edge_prop_index(e);
                assert_eq!(base.out_edge_dst(orig), dst);
                assert!(base.out_edges(view.out_edge_dst(e)).contains(&orig));
            }
        }
    }

    #[test]
    fn test_transposed_any_is_deterministic() {
        let base = random_graph(20, 150, 5);
        let a = EdgeShuffleTopology::make(&Executor::new(4).unwrap(), &base, true, EdgeSortKind::Any, None);
        let b = EdgeShuffleTopology::make(&Executor::single_threaded(), &base, true, EdgeSortKind::Any, None);
        assert_eq!(a, b);
        for n in a.topology().all_nodes() {
            let perm: Vec<_> = a.out_edges(n).map(|e| a.edge_prop_index(e)).collect();
            assert!(perm.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_sort_by_edge_type() {
        let exec = Executor::single_threaded();
        let base = GraphTopology::from_edges(3, &[(0, 2), (0, 1), (0, 1), (1, 0)]);
        let types = [2, 1, 2, 1];
        let view = EdgeShuffleTopology::make(&exec, &base, false, EdgeSortKind::ByEdgeType, Some(&types));
        let order: Vec<_> = view.out_edges(0).map(|e| view.edge_prop_index(e)).collect();
        // type 1 first, then type 2 sorted by destination
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_node_shuffle_preserves_degrees() {
        let exec = Executor::new(4).unwrap();
        let base = random_graph(64, 500, 19);
        let view = ShuffleTopology::make(&exec, &base);

        assert_eq!(view.num_edges(), base.num_edges());
        let mut old_degrees: Vec<_> = base.all_nodes().map(|n| base.degree(n)).collect();
        let new_degrees: Vec<_> = view.topology().all_nodes().map(|n| view.degree(n)).collect();
        assert!(new_degrees.windows(2).all(|w| w[0] >= w[1]));
        old_degrees.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(old_degrees, new_degrees);

        for old in base.all_nodes() {
            assert_eq!(view.original_node_id(view.new_node_id(old)), old);
            assert_eq!(view.degree(view.new_node_id(old)), base.degree(old));
        }
        assert_dest_sorted(view.topology());
        for new in view.topology().all_nodes() {
            for e in view.out_edges(new) {
                let orig = view.edge_prop_index(e);
                assert_eq!(view.new_node_id(base.out_edge_dst(orig)), view.out_edge_dst(e));
            }
        }
    }

    #[test]
    fn test_node_shuffle_from_parts_rebuilds_inverse() {
        let exec = Executor::single_threaded();
        let base = random_graph(16, 60, 23);
        let view = ShuffleTopology::make(&exec, &base);
        let rebuilt = ShuffleTopology::from_parts(
            view.topology().clone(),
            view.node_new_to_old().to_vec(),
            view.edge_prop_indices().to_vec(),
        );
        assert_eq!(rebuilt, view);
    }

    #[test]
    fn test_find_edges() {
        let exec = Executor::single_threaded();
        let base = GraphTopology::from_edges(3, &[(0, 2), (0, 1), (0, 2), (1, 0)]);
        let view = EdgeShuffleTopology::make(&exec, &base, false, EdgeSortKind::ByDestId, None);
        let found = view.find_edges(0, 2);
        assert_eq!(found.end - found.start, 2);
        assert!(view.find_edges(1, 2).is_empty());
    }
}

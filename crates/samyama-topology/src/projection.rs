//! Induced-subgraph projection with bidirectional id remapping

use crate::bitset::DynamicBitset;
use crate::common::{EdgeId, GraphTopology, NodeId};
use crate::executor::{parallel_prefix_sum, split_by_indices, Executor};
use rayon::prelude::*;

/// Marks an original node that is not part of the projection
pub const INVALID_NODE: NodeId = NodeId::MAX;

/// Marks an original edge that is not part of the projection
pub const INVALID_EDGE: EdgeId = EdgeId::MAX;

/// A projected topology plus the mapping to and from the original graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedTopology {
    topology: GraphTopology,
    node_old_to_new: Vec<NodeId>,
    node_new_to_old: Vec<NodeId>,
    edge_old_to_new: Vec<EdgeId>,
    edge_new_to_old: Vec<EdgeId>,
    node_bitmask: DynamicBitset,
    edge_bitmask: DynamicBitset,
}

impl ProjectedTopology {
    /// Projection that retains nothing
    fn empty(original_nodes: usize, original_edges: usize) -> Self {
        Self {
            topology: GraphTopology::empty(),
            node_old_to_new: vec![INVALID_NODE; original_nodes],
            node_new_to_old: Vec::new(),
            edge_old_to_new: vec![INVALID_EDGE; original_edges],
            edge_new_to_old: Vec::new(),
            node_bitmask: DynamicBitset::new(original_nodes),
            edge_bitmask: DynamicBitset::new(original_edges),
        }
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

    /// Number of nodes in the original graph
    pub fn num_original_nodes(&self) -> usize {
        self.node_old_to_new.len()
    }

    /// Number of edges in the original graph
    pub fn num_original_edges(&self) -> usize {
        self.edge_old_to_new.len()
    }

    /// Projected id of an original node, if retained
    pub fn projected_node(&self, original: NodeId) -> Option<NodeId> {
        match self.node_old_to_new[original as usize] {
            INVALID_NODE => None,
            id => Some(id),
        }
    }

    /// Original id of a projected node
    pub fn original_node(&self, projected: NodeId) -> NodeId {
        self.node_new_to_old[projected as usize]
    }

    /// Projected id of an original edge, if retained
    pub fn projected_edge(&self, original: EdgeId) -> Option<EdgeId> {
        match self.edge_old_to_new[original as usize] {
            INVALID_EDGE => None,
            id => Some(id),
        }
    }

    /// Original id of a projected edge
    pub fn original_edge(&self, projected: EdgeId) -> EdgeId {
        self.edge_new_to_old[projected as usize]
    }

    pub fn node_old_to_new(&self) -> &[NodeId] {
        &self.node_old_to_new
    }

    pub fn node_new_to_old(&self) -> &[NodeId] {
        &self.node_new_to_old
    }

    pub fn edge_old_to_new(&self) -> &[EdgeId] {
        &self.edge_old_to_new
    }

    pub fn edge_new_to_old(&self) -> &[EdgeId] {
        &self.edge_new_to_old
    }

    /// Retained original nodes
    pub fn node_bitmask(&self) -> &DynamicBitset {
        &self.node_bitmask
    }

    /// Retained original edges
    pub fn edge_bitmask(&self) -> &DynamicBitset {
        &self.edge_bitmask
    }
}

/// Project `base` onto the nodes accepted by `node_filter` and the edges
/// accepted by `edge_filter` whose endpoints are both retained.
///
/// Retained nodes and edges keep their relative original order, so the
/// projected ids are the rank of the original id among retained ones.
pub fn project<NF, EF>(exec: &Executor, base: &GraphTopology, node_filter: NF, edge_filter: EF) -> ProjectedTopology
where
    NF: Fn(NodeId) -> bool + Sync,
    EF: Fn(EdgeId) -> bool + Sync,
{
    let num_nodes = base.num_nodes();
    let num_edges = base.num_edges();

    // 1. Node inclusion flags and bitmask
    let node_flags: Vec<u64> = exec.install(|| {
        (0..num_nodes as NodeId)
            .into_par_iter()
            .map(|n| node_filter(n) as u64)
            .collect()
    });
    let node_bitmask = DynamicBitset::from_flags(exec, &node_flags);

    // 2. New node ids from the prefix sum
    let node_prefix = parallel_prefix_sum(exec, &node_flags);
    let num_new_nodes = node_prefix.last().copied().unwrap_or(0) as usize;
    if num_new_nodes == 0 {
        return ProjectedTopology::empty(num_nodes, num_edges);
    }
    let (node_old_to_new, node_new_to_old) = exec.install(|| {
        let old_to_new: Vec<NodeId> = node_flags
            .par_iter()
            .zip(node_prefix.par_iter())
            .map(|(&flag, &rank)| if flag == 1 { (rank - 1) as NodeId } else { INVALID_NODE })
            .collect();
        let new_to_old: Vec<NodeId> = (0..num_nodes as NodeId)
            .into_par_iter()
            .filter(|&n| node_flags[n as usize] == 1)
            .collect();
        (old_to_new, new_to_old)
    });

    // 3. Edge inclusion flags and per-node new degrees; node ranges are disjoint
    let mut edge_flags = vec![0u64; num_edges];
    let degrees: Vec<u64> = exec.install(|| {
        split_by_indices(&mut edge_flags, base.out_indices())
            .into_par_iter()
            .enumerate()
            .map(|(src, flags)| {
                if !node_bitmask.test(src) {
                    return 0;
                }
                let range = base.out_edges(src as NodeId);
                let mut kept = 0u64;
                for (flag, edge) in flags.iter_mut().zip(range) {
                    if node_bitmask.test(base.out_edge_dst(edge) as usize) && edge_filter(edge) {
                        *flag = 1;
                        kept += 1;
                    }
                }
                kept
            })
            .collect()
    });
    let edge_bitmask = DynamicBitset::from_flags(exec, &edge_flags);

    // 4. New CSR index from the retained nodes' degrees
    let new_degrees: Vec<u64> = exec.install(|| {
        node_new_to_old
            .par_iter()
            .map(|&old| degrees[old as usize])
            .collect()
    });
    let out_indices = parallel_prefix_sum(exec, &new_degrees);
    let num_new_edges = out_indices.last().copied().unwrap_or(0) as usize;
    if num_new_edges == 0 {
        return ProjectedTopology {
            topology: GraphTopology::with_nodes(num_new_nodes),
            node_old_to_new,
            node_new_to_old,
            edge_old_to_new: vec![INVALID_EDGE; num_edges],
            edge_new_to_old: Vec::new(),
            node_bitmask,
            edge_bitmask,
        };
    }

    // 5. Re-indexed destinations and edge mappings
    let edge_prefix = parallel_prefix_sum(exec, &edge_flags);
    let (out_dests, edge_old_to_new, edge_new_to_old) = exec.install(|| {
        let edge_old_to_new: Vec<EdgeId> = edge_flags
            .par_iter()
            .zip(edge_prefix.par_iter())
            .map(|(&flag, &rank)| if flag == 1 { rank - 1 } else { INVALID_EDGE })
            .collect();

        let mut out_dests = vec![0 as NodeId; num_new_edges];
        let mut edge_new_to_old = vec![0 as EdgeId; num_new_edges];
        split_by_indices(&mut out_dests, &out_indices)
            .into_par_iter()
            .zip(split_by_indices(&mut edge_new_to_old, &out_indices).into_par_iter())
            .zip(node_new_to_old.par_iter())
            .for_each(|((dests, olds), &old_src)| {
                let kept = base.out_edges(old_src).filter(|&e| edge_flags[e as usize] == 1);
                for ((dst, old_edge), edge) in dests.iter_mut().zip(olds.iter_mut()).zip(kept) {
                    *dst = node_old_to_new[base.out_edge_dst(edge) as usize];
                    *old_edge = edge;
                }
            });
        (out_dests, edge_old_to_new, edge_new_to_old)
    });

    ProjectedTopology {
        topology: GraphTopology::new(out_indices, out_dests),
        node_old_to_new,
        node_new_to_old,
        edge_old_to_new,
        edge_new_to_old,
        node_bitmask,
        edge_bitmask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphTopology {
        // 0 -> 1, 0 -> 2, 1 -> 2, 2 -> 3, 3 -> 0, 3 -> 1
        GraphTopology::from_edges(4, &[(0, 1), (0, 2), (1, 2), (2, 3), (3, 0), (3, 1)])
    }

    #[test]
    fn test_project_all_is_identity() {
        let exec = Executor::new(2).unwrap();
        let base = sample();
        let proj = project(&exec, &base, |_| true, |_| true);
        assert_eq!(proj.topology(), &base);
        for n in base.all_nodes() {
            assert_eq!(proj.projected_node(n), Some(n));
        }
        for e in base.all_edges() {
            assert_eq!(proj.original_edge(proj.projected_edge(e).unwrap()), e);
        }
    }

    #[test]
    fn test_project_drops_dangling_edges() {
        let exec = Executor::single_threaded();
        let base = sample();
        let proj = project(&exec, &base, |n| n != 2, |_| true);

        assert_eq!(proj.num_nodes(), 3);
        assert_eq!(proj.projected_node(2), None);
        assert_eq!(proj.projected_node(3), Some(2));
        // 0->1, 3->0, 3->1 survive
        assert_eq!(proj.num_edges(), 3);
        for new_src in proj.topology().all_nodes() {
            for e in proj.topology().out_edges(new_src) {
                let old = proj.original_edge(e);
                let old_src = proj.original_node(new_src);
                assert!(base.out_edges(old_src).contains(&old));
                assert!(proj.node_bitmask().test(base.out_edge_dst(old) as usize));
                assert_eq!(proj.original_node(proj.topology().out_edge_dst(e)), base.out_edge_dst(old));
            }
        }
        for old in proj.node_bitmask().iter_ones() {
            let old = old as NodeId;
            assert_eq!(proj.original_node(proj.projected_node(old).unwrap()), old);
        }
    }

    #[test]
    fn test_project_edge_filter() {
        let exec = Executor::single_threaded();
        let base = sample();
        let proj = project(&exec, &base, |_| true, |e| e % 2 == 0);
        assert_eq!(proj.num_nodes(), 4);
        assert_eq!(proj.edge_new_to_old(), &[0, 2, 4]);
        assert_eq!(proj.edge_bitmask().count(), 3);
        assert_eq!(proj.projected_edge(1), None);
    }

    #[test]
    fn test_project_no_nodes_short_circuits() {
        let exec = Executor::single_threaded();
        let proj = project(&exec, &sample(), |_| false, |_| true);
        assert_eq!(proj.num_nodes(), 0);
        assert_eq!(proj.num_edges(), 0);
        assert_eq!(proj.num_original_nodes(), 4);
        assert!(proj.node_bitmask().none());
    }

    #[test]
    fn test_project_no_edges_keeps_nodes() {
        let exec = Executor::single_threaded();
        let proj = project(&exec, &sample(), |n| n == 0 || n == 3, |_| false);
        assert_eq!(proj.num_nodes(), 2);
        assert_eq!(proj.num_edges(), 0);
        assert_eq!(proj.original_node(1), 3);
        assert!(proj.edge_bitmask().none());
    }
}

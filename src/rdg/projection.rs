//! Type-projected subgraphs of an [`Rdg`]
//!
//! A projection keeps the nodes having any of the requested node types
//! and the edges having any of the requested edge types whose endpoints
//! were both kept. Properties added to a projection are staged against
//! the original graph's rows; reads fall back to the original tables.

use super::Rdg;
use crate::entity_types::EntityTypes;
use crate::error::{RdgError, RdgResult};
use crate::property::{Column, PropertyBatch, PropertyTable, PropertyValue};
use samyama_topology::{project, EdgeId, EntityTypeId, GraphTopology, NodeId, ProjectedTopology};
use tracing::debug;

/// Induced subgraph of an [`Rdg`] with id mappings in both directions
pub struct ProjectedGraph<'a> {
    rdg: &'a Rdg,
    topology: ProjectedTopology,
    staged_nodes: PropertyTable,
    staged_edges: PropertyTable,
}

/// Resolve type names to ids; an empty list means "no filter"
fn resolve_types<S: AsRef<str>>(
    types: Option<&EntityTypes>,
    names: &[S],
    what: &str,
) -> RdgResult<Option<Vec<EntityTypeId>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let types = types.ok_or_else(|| {
        RdgError::TypeNotFound(format!("{} (no {} entity types are defined)", names[0].as_ref(), what))
    })?;
    names
        .iter()
        .map(|name| {
            types
                .manager()
                .get_entity_type_id(name.as_ref())
                .ok_or_else(|| RdgError::TypeNotFound(name.as_ref().to_string()))
        })
        .collect::<RdgResult<Vec<_>>>()
        .map(Some)
}

fn has_any(types: Option<&EntityTypes>, wanted: &Option<Vec<EntityTypeId>>, row: usize) -> bool {
    match (wanted, types) {
        (None, _) => true,
        (Some(ids), Some(types)) => ids.iter().any(|&id| types.does_have_type(row, id)),
        (Some(_), None) => false,
    }
}

impl<'a> ProjectedGraph<'a> {
    pub(crate) fn make<S: AsRef<str>>(rdg: &'a Rdg, node_types: &[S], edge_types: &[S]) -> RdgResult<Self> {
        let node_ids = resolve_types(rdg.node_types(), node_types, "node")?;
        let edge_ids = resolve_types(rdg.edge_types(), edge_types, "edge")?;

        let nodes = rdg.node_types();
        let edges = rdg.edge_types();
        let topology = project(
            rdg.executor(),
            rdg.topology(),
            |n| has_any(nodes, &node_ids, n as usize),
            |e| has_any(edges, &edge_ids, e as usize),
        );
        debug!(
            "Projected {} nodes / {} edges down to {} / {}",
            rdg.num_nodes(),
            rdg.num_edges(),
            topology.num_nodes(),
            topology.num_edges()
        );

        Ok(Self {
            rdg,
            topology,
            staged_nodes: PropertyTable::with_rows(rdg.num_nodes()),
            staged_edges: PropertyTable::with_rows(rdg.num_edges()),
        })
    }

    pub fn topology(&self) -> &GraphTopology {
        self.topology.topology()
    }

    /// Id mappings and retention masks
    pub fn projection(&self) -> &ProjectedTopology {
        &self.topology
    }

    pub fn source(&self) -> &Rdg {
        self.rdg
    }

    pub fn num_nodes(&self) -> usize {
        self.topology.num_nodes()
    }

    pub fn num_edges(&self) -> usize {
        self.topology.num_edges()
    }

    pub fn original_node_id(&self, node: NodeId) -> NodeId {
        self.topology.original_node(node)
    }

    pub fn original_edge_id(&self, edge: EdgeId) -> EdgeId {
        self.topology.original_edge(edge)
    }

    pub fn projected_node_id(&self, original: NodeId) -> Option<NodeId> {
        self.topology.projected_node(original)
    }

    pub fn projected_edge_id(&self, original: EdgeId) -> Option<EdgeId> {
        self.topology.projected_edge(original)
    }

    /// Stage node columns; they must span the original graph's nodes
    pub fn add_node_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        if let Some(name) = batch.names().find(|n| self.rdg.node_properties().contains(n)) {
            return Err(RdgError::InvalidArgument(format!("node property {:?} already exists", name)));
        }
        self.staged_nodes.add_properties(batch)
    }

    /// Stage edge columns; they must span the original graph's edges
    pub fn add_edge_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        if let Some(name) = batch.names().find(|n| self.rdg.edge_properties().contains(n)) {
            return Err(RdgError::InvalidArgument(format!("edge property {:?} already exists", name)));
        }
        self.staged_edges.add_properties(batch)
    }

    pub fn upsert_node_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.staged_nodes.upsert_properties(batch)
    }

    pub fn upsert_edge_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.staged_edges.upsert_properties(batch)
    }

    /// Staged column if present, otherwise the original one
    pub fn get_node_property(&self, name: &str) -> RdgResult<&Column> {
        if self.staged_nodes.contains(name) {
            return self.staged_nodes.get(name);
        }
        self.rdg.get_node_property(name)
    }

    pub fn get_edge_property(&self, name: &str) -> RdgResult<&Column> {
        if self.staged_edges.contains(name) {
            return self.staged_edges.get(name);
        }
        self.rdg.get_edge_property(name)
    }

    /// Value of `name` for a projected node
    pub fn node_property(&self, node: NodeId, name: &str) -> RdgResult<PropertyValue> {
        Ok(self.get_node_property(name)?.get(self.original_node_id(node) as usize))
    }

    /// Value of `name` for a projected edge
    pub fn edge_property(&self, edge: EdgeId, name: &str) -> RdgResult<PropertyValue> {
        Ok(self.get_edge_property(name)?.get(self.original_edge_id(edge) as usize))
    }

    /// Staged node and edge columns, ready to upsert into the source graph
    pub fn into_staged(self) -> (PropertyBatch, PropertyBatch) {
        (self.staged_nodes.into_batch(), self.staged_edges.into_batch())
    }
}

//! Versioned graph store
//!
//! An [`Rdg`] is one in-memory snapshot of a stored graph: the base
//! topology, node and edge property tables, entity types and a cache of
//! derived views. `load` materializes a version from a blob store and
//! `commit` publishes the current state as the next version.
//!
//! Commit writes every new blob through a [`WriteGroup`] first and only
//! then writes `meta_<N>` followed by `meta`. A failure before the head
//! is replaced leaves the previous version as the durable head. Version
//! numbers are never reused: committing a session loaded from an older
//! version publishes the newest version + 1, with `previous_version`
//! still naming the version it was loaded from.

pub mod projection;
pub(crate) mod views;

pub use projection::ProjectedGraph;

use crate::blob::{join_path, BlobStore, WriteGroup};
use crate::config::{LoadOptions, RdgConfig};
use crate::entity_types::EntityTypes;
use crate::error::{RdgError, RdgResult};
use crate::index::EntityIndex;
use crate::manifest::{
    file_name_for, parse_version_from_name, PartHeader, PropertyFileEntry, RdgLineage, RdgManifest, ViewFileEntry,
    MANIFEST_HEAD,
};
use crate::property::table::CommitColumn;
use crate::property::{codec, Column, PropertyBatch, PropertyTable};
use crate::topology_file::{decode_topology, encode_topology};
use futures::TryStreamExt;
use samyama_topology::{DerivedView, EntityTypeId, Executor, GraphTopology, ViewKey};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use views::ViewCache;

/// Which of the two property tables an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Node,
    Edge,
}

impl Entity {
    fn prefix(self) -> &'static str {
        match self {
            Entity::Node => "node",
            Entity::Edge => "edge",
        }
    }
}

/// Properties and types of one entity kind
struct EntityData {
    properties: PropertyTable,
    types: Option<EntityTypes>,
    /// Blob holding `types`, if stored
    types_path: Option<String>,
}

impl EntityData {
    fn new(num_rows: usize) -> Self {
        Self {
            properties: PropertyTable::with_rows(num_rows),
            types: None,
            types_path: None,
        }
    }
}

/// One snapshot of a versioned property graph
pub struct Rdg {
    store: Arc<dyn BlobStore>,
    config: RdgConfig,
    exec: Executor,
    /// Version this snapshot was loaded from (or last committed as)
    manifest: RdgManifest,
    topology: Arc<GraphTopology>,
    /// Blob holding `topology`, if stored
    topology_path: Option<String>,
    nodes: EntityData,
    edges: EntityData,
    views: ViewCache,
    /// Stored views that match the current topology
    stored_views: BTreeMap<ViewKey, ViewFileEntry>,
}

impl std::fmt::Debug for Rdg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rdg")
            .field("uri", &self.manifest.dir)
            .field("version", &self.manifest.version)
            .field("num_nodes", &self.topology.num_nodes())
            .field("num_edges", &self.topology.num_edges())
            .finish()
    }
}

impl Rdg {
    /// New, uncommitted graph at `uri` over `topology`
    pub fn create(
        store: Arc<dyn BlobStore>,
        uri: &str,
        topology: GraphTopology,
        config: RdgConfig,
    ) -> RdgResult<Self> {
        if uri.is_empty() {
            return Err(RdgError::InvalidArgument("empty graph uri".to_string()));
        }
        let exec = config.executor()?;
        Ok(Self::assemble(store, config, exec, RdgManifest::root(uri), topology, None))
    }

    fn assemble(
        store: Arc<dyn BlobStore>,
        config: RdgConfig,
        exec: Executor,
        manifest: RdgManifest,
        topology: GraphTopology,
        topology_path: Option<String>,
    ) -> Self {
        let views = ViewCache::new(config.view_cache_capacity);
        Self {
            nodes: EntityData::new(topology.num_nodes()),
            edges: EntityData::new(topology.num_edges()),
            store,
            config,
            exec,
            manifest,
            topology: Arc::new(topology),
            topology_path,
            views,
            stored_views: BTreeMap::new(),
        }
    }

    /// Load a version of the graph at `uri`
    #[instrument(skip(store, options, config), fields(version = ?options.version))]
    pub async fn load(
        store: Arc<dyn BlobStore>,
        uri: &str,
        options: LoadOptions,
        config: RdgConfig,
    ) -> RdgResult<Self> {
        // 1. Resolve the manifest
        let manifest = match options.version {
            Some(version) => RdgManifest::make_version(store.as_ref(), uri, version).await?,
            None => RdgManifest::make(store.as_ref(), uri).await?,
        };
        let header = manifest.header.clone();
        let exec = config.executor()?;

        // 2. Base topology
        let topology = match &header.topology {
            Some(name) => decode_topology(&store.get(&join_path(uri, name)).await?)?,
            None => GraphTopology::empty(),
        };
        let mut rdg = Self::assemble(
            Arc::clone(&store),
            config,
            exec,
            manifest,
            topology,
            header.topology.clone(),
        );

        // 3. Property columns; unrequested ones stay registered but unloaded
        for entry in &header.node_properties {
            rdg.nodes.properties.insert_unloaded(entry.name.clone(), entry.path.clone());
            if options.wants_node_property(&entry.name) {
                rdg.load_property(Entity::Node, &entry.name).await?;
            }
        }
        for entry in &header.edge_properties {
            rdg.edges.properties.insert_unloaded(entry.name.clone(), entry.path.clone());
            if options.wants_edge_property(&entry.name) {
                rdg.load_property(Entity::Edge, &entry.name).await?;
            }
        }

        // 4. Entity types
        if let Some(path) = &header.node_entity_types {
            rdg.nodes.types = Some(rdg.read_types(path, rdg.topology.num_nodes()).await?);
            rdg.nodes.types_path = Some(path.clone());
        }
        if let Some(path) = &header.edge_entity_types {
            rdg.edges.types = Some(rdg.read_types(path, rdg.topology.num_edges()).await?);
            rdg.edges.types_path = Some(path.clone());
        }

        // 5. Persisted views
        for entry in &header.views {
            if !rdg.config.load_views {
                rdg.stored_views.insert(entry.key, entry.clone());
                continue;
            }
            match views::load_view(store.as_ref(), uri, entry, &rdg.topology).await {
                Ok(view) => {
                    rdg.views.insert_built(view);
                    rdg.stored_views.insert(entry.key, entry.clone());
                }
                Err(e) => warn!("Ignoring stored view {} of {}: {}", entry.key, uri, e),
            }
        }

        info!(
            "Loaded {} version {}: {} nodes, {} edges, {} node / {} edge properties",
            uri,
            rdg.manifest.version,
            rdg.topology.num_nodes(),
            rdg.topology.num_edges(),
            rdg.nodes.properties.num_columns(),
            rdg.edges.properties.num_columns()
        );
        Ok(rdg)
    }

    async fn read_types(&self, path: &str, num_rows: usize) -> RdgResult<EntityTypes> {
        let data = self.store.get(&join_path(self.uri(), path)).await?;
        let types: EntityTypes = codec::decode(&data)?;
        if types.num_rows() != num_rows {
            return Err(RdgError::InvalidArgument(format!(
                "entity type file {} covers {} rows, expected {}",
                path,
                types.num_rows(),
                num_rows
            )));
        }
        Ok(types)
    }

    /// Publish the current state as the next version and return its number
    #[instrument(skip(self, lineage), fields(uri = %self.manifest.dir, from = self.manifest.version))]
    pub async fn commit(&mut self, lineage: RdgLineage) -> RdgResult<u64> {
        let dir = self.manifest.dir.clone();
        let mut next = self.manifest.next_version(1, self.manifest.policy_id, lineage);
        // a session loaded from an older version must not reuse a taken number
        if let Some(&latest) = Self::list_versions(self.store.as_ref(), &dir).await?.last() {
            if next.renumber_after(latest) {
                info!(
                    "Version {} of {} is taken, committing as version {} on top of {}",
                    self.manifest.version + 1,
                    dir,
                    next.version,
                    next.previous_version
                );
            }
        }
        let mut header = PartHeader::default();
        let mut group = WriteGroup::new(Arc::clone(&self.store), self.config.write_group_max_outstanding_bytes);

        // 1. Topology, unless already stored
        let topology_name = match &self.topology_path {
            Some(name) => name.clone(),
            None => {
                let name = blob_name("topology");
                group
                    .start_store(join_path(&dir, &name), encode_topology(&self.topology))
                    .await;
                name
            }
        };
        header.topology = Some(topology_name.clone());

        // 2. Persistent property columns
        let mut written_columns: Vec<(Entity, String, String)> = Vec::new();
        for entity in [Entity::Node, Entity::Edge] {
            let mut entries = Vec::new();
            for (name, column) in self.entity(entity).properties.commit_columns() {
                let path = match column {
                    CommitColumn::Stored(path) => path.to_string(),
                    CommitColumn::Dirty(column) => {
                        let path = blob_name(&format!("{}-prop", entity.prefix()));
                        group
                            .start_store(join_path(&dir, &path), codec::encode::<Column>(column)?)
                            .await;
                        written_columns.push((entity, name.to_string(), path.clone()));
                        path
                    }
                };
                entries.push(PropertyFileEntry {
                    name: name.to_string(),
                    path,
                });
            }
            match entity {
                Entity::Node => header.node_properties = entries,
                Entity::Edge => header.edge_properties = entries,
            }
        }

        // 3. Entity types
        let mut written_types: Vec<(Entity, String)> = Vec::new();
        for entity in [Entity::Node, Entity::Edge] {
            let data = self.entity(entity);
            let path = match (&data.types, &data.types_path) {
                (None, _) => None,
                (Some(_), Some(path)) => Some(path.clone()),
                (Some(types), None) => {
                    let path = blob_name(&format!("{}-types", entity.prefix()));
                    group
                        .start_store(join_path(&dir, &path), codec::encode(types)?)
                        .await;
                    written_types.push((entity, path.clone()));
                    Some(path)
                }
            };
            match entity {
                Entity::Node => header.node_entity_types = path,
                Entity::Edge => header.edge_entity_types = path,
            }
        }

        // 4. Derived views
        let mut written_views: Vec<ViewFileEntry> = Vec::new();
        if self.config.persist_views {
            let built = self.views.built_views();
            let mut persisted = BTreeSet::new();
            for view in built {
                let key = view.key();
                if let Some(entry) = self.stored_views.get(&key) {
                    header.views.push(entry.clone());
                    persisted.insert(key);
                } else if let Some((entry, files)) = views::encode_view(&view) {
                    for (name, data) in files {
                        group.start_store(join_path(&dir, &name), data).await;
                    }
                    header.views.push(entry.clone());
                    written_views.push(entry);
                    persisted.insert(key);
                }
            }
            // stored but evicted or never loaded
            for (key, entry) in &self.stored_views {
                if !persisted.contains(key) {
                    header.views.push(entry.clone());
                }
            }
            header.views.sort_by_key(|v| v.key);
        }

        // 5. Wait for every blob before publishing
        let bytes = match group.finish().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Commit of {} version {} aborted: {}", dir, next.version, e);
                return Err(e.into());
            }
        };

        // 6. Publish: versioned manifest first, then the head
        next.header = header;
        let manifest_bytes = next.to_bytes()?;
        self.store
            .put(&join_path(&dir, &next.file_name()), manifest_bytes.clone())
            .await?;
        self.store.put(&join_path(&dir, MANIFEST_HEAD), manifest_bytes).await?;

        // 7. The new blobs are now the stored copies
        self.topology_path = Some(topology_name);
        for (entity, name, path) in written_columns {
            self.entity_mut(entity).properties.set_stored(&name, path);
        }
        for (entity, path) in written_types {
            self.entity_mut(entity).types_path = Some(path);
        }
        for entry in written_views {
            self.stored_views.insert(entry.key, entry);
        }

        info!(
            "Committed {} version {} (previous {}, {} bytes written)",
            dir, next.version, next.previous_version, bytes
        );
        let version = next.version;
        self.manifest = next;
        Ok(version)
    }

    fn entity(&self, entity: Entity) -> &EntityData {
        match entity {
            Entity::Node => &self.nodes,
            Entity::Edge => &self.edges,
        }
    }

    fn entity_mut(&mut self, entity: Entity) -> &mut EntityData {
        match entity {
            Entity::Node => &mut self.nodes,
            Entity::Edge => &mut self.edges,
        }
    }

    pub fn uri(&self) -> &str {
        &self.manifest.dir
    }

    /// Version this snapshot was loaded from or last committed as
    pub fn version(&self) -> u64 {
        self.manifest.version
    }

    pub fn manifest(&self) -> &RdgManifest {
        &self.manifest
    }

    pub fn config(&self) -> &RdgConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.exec
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

    /// Swap in a new base topology. Property tables must still match its
    /// size; derived views and stored copies are dropped.
    pub fn replace_topology(&mut self, topology: GraphTopology) -> RdgResult<()> {
        for (entity, rows) in [(Entity::Node, topology.num_nodes()), (Entity::Edge, topology.num_edges())] {
            let data = self.entity(entity);
            if !data.properties.is_empty() && data.properties.num_rows() != rows {
                return Err(RdgError::InvalidArgument(format!(
                    "{} properties have {} rows, new topology has {}",
                    entity.prefix(),
                    data.properties.num_rows(),
                    rows
                )));
            }
            if data.types.as_ref().is_some_and(|t| t.num_rows() != rows) {
                return Err(RdgError::InvalidArgument(format!(
                    "{} entity types cover {} rows, new topology has {}",
                    entity.prefix(),
                    data.types.as_ref().map_or(0, EntityTypes::num_rows),
                    rows
                )));
            }
        }
        for (entity, rows) in [(Entity::Node, topology.num_nodes()), (Entity::Edge, topology.num_edges())] {
            let data = self.entity_mut(entity);
            if data.properties.is_empty() {
                data.properties = PropertyTable::with_rows(rows);
            }
        }
        self.topology = Arc::new(topology);
        self.topology_path = None;
        self.stored_views.clear();
        self.views.invalidate_all();
        Ok(())
    }

    // ---- properties ----

    pub fn node_properties(&self) -> &PropertyTable {
        &self.nodes.properties
    }

    pub fn edge_properties(&self) -> &PropertyTable {
        &self.edges.properties
    }

    pub fn get_node_property(&self, name: &str) -> RdgResult<&Column> {
        self.nodes.properties.get(name)
    }

    pub fn get_edge_property(&self, name: &str) -> RdgResult<&Column> {
        self.edges.properties.get(name)
    }

    /// Add node columns; each must have `num_nodes` rows
    pub fn add_node_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.nodes.properties.add_properties(batch)
    }

    /// Add edge columns; each must have `num_edges` rows
    pub fn add_edge_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.edges.properties.add_properties(batch)
    }

    pub fn upsert_node_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.upsert_properties(Entity::Node, batch)
    }

    pub fn upsert_edge_properties(&mut self, batch: PropertyBatch) -> RdgResult<()> {
        self.upsert_properties(Entity::Edge, batch)
    }

    fn upsert_properties(&mut self, entity: Entity, batch: PropertyBatch) -> RdgResult<()> {
        let touched: Vec<String> = batch.names().map(str::to_string).collect();
        self.entity_mut(entity).properties.upsert_properties(batch)?;
        self.rebuild_types_if_defined(entity, &touched)
    }

    pub fn remove_node_property(&mut self, name: &str) -> RdgResult<()> {
        self.remove_property(Entity::Node, name)
    }

    pub fn remove_edge_property(&mut self, name: &str) -> RdgResult<()> {
        self.remove_property(Entity::Edge, name)
    }

    pub fn remove_node_property_at(&mut self, index: usize) -> RdgResult<()> {
        let name = self.nodes.properties.get_at(index).map(|(n, _)| n.to_string());
        match name {
            Ok(name) => self.remove_property(Entity::Node, &name),
            // unloaded columns can still be removed by position
            Err(RdgError::PropertyNotLoaded(name)) => self.remove_property(Entity::Node, &name),
            Err(e) => Err(e),
        }
    }

    pub fn remove_edge_property_at(&mut self, index: usize) -> RdgResult<()> {
        let name = self.edges.properties.get_at(index).map(|(n, _)| n.to_string());
        match name {
            Ok(name) => self.remove_property(Entity::Edge, &name),
            Err(RdgError::PropertyNotLoaded(name)) => self.remove_property(Entity::Edge, &name),
            Err(e) => Err(e),
        }
    }

    fn remove_property(&mut self, entity: Entity, name: &str) -> RdgResult<()> {
        self.entity_mut(entity).properties.remove_property(name)?;
        self.rebuild_types_if_defined(entity, &[name.to_string()])
    }

    pub fn mark_node_properties_persistent<S: AsRef<str>>(&mut self, names: &[S]) -> RdgResult<()> {
        self.nodes.properties.mark_persistent(names)
    }

    pub fn mark_edge_properties_persistent<S: AsRef<str>>(&mut self, names: &[S]) -> RdgResult<()> {
        self.edges.properties.mark_persistent(names)
    }

    pub fn mark_all_properties_persistent(&mut self) {
        self.nodes.properties.mark_all_persistent();
        self.edges.properties.mark_all_persistent();
    }

    /// Read a stored node column that was not loaded
    pub async fn load_node_property(&mut self, name: &str) -> RdgResult<()> {
        self.load_property(Entity::Node, name).await
    }

    pub async fn load_edge_property(&mut self, name: &str) -> RdgResult<()> {
        self.load_property(Entity::Edge, name).await
    }

    async fn load_property(&mut self, entity: Entity, name: &str) -> RdgResult<()> {
        let table = &self.entity(entity).properties;
        if table.is_loaded(name) {
            return Ok(());
        }
        let path = table.stored_path(name).ok_or_else(|| {
            RdgError::PropertyNotFound(format!("{} property {:?} has no stored copy", entity.prefix(), name))
        })?;
        let data = self.store.get(&join_path(self.uri(), path)).await?;
        let column: Column = codec::decode(&data)?;
        debug!("Loaded {} property {} ({} rows)", entity.prefix(), name, column.len());
        self.entity_mut(entity).properties.bind_loaded(name, column)
    }

    /// Release a stored node column's data
    pub fn unload_node_property(&mut self, name: &str) -> RdgResult<()> {
        self.nodes.properties.unload(name)
    }

    pub fn unload_edge_property(&mut self, name: &str) -> RdgResult<()> {
        self.edges.properties.unload(name)
    }

    /// Ordered index over a loaded node column
    pub fn build_node_index(&self, name: &str) -> RdgResult<EntityIndex> {
        EntityIndex::build(name, self.nodes.properties.get(name)?)
    }

    pub fn build_edge_index(&self, name: &str) -> RdgResult<EntityIndex> {
        EntityIndex::build(name, self.edges.properties.get(name)?)
    }

    // ---- entity types ----

    pub fn node_types(&self) -> Option<&EntityTypes> {
        self.nodes.types.as_ref()
    }

    pub fn edge_types(&self) -> Option<&EntityTypes> {
        self.edges.types.as_ref()
    }

    /// Derive node entity types from the named flag columns
    pub fn build_node_types<S: AsRef<str>>(&mut self, columns: &[S]) -> RdgResult<()> {
        self.build_types(Entity::Node, columns)
    }

    /// Derive edge entity types from the named flag columns
    pub fn build_edge_types<S: AsRef<str>>(&mut self, columns: &[S]) -> RdgResult<()> {
        self.build_types(Entity::Edge, columns)
    }

    fn build_types<S: AsRef<str>>(&mut self, entity: Entity, columns: &[S]) -> RdgResult<()> {
        let data = self.entity(entity);
        let num_rows = match entity {
            Entity::Node => self.topology.num_nodes(),
            Entity::Edge => self.topology.num_edges(),
        };
        let types = if columns.is_empty() {
            None
        } else {
            let mut cols = Vec::with_capacity(columns.len());
            for name in columns {
                cols.push((name.as_ref(), data.properties.get(name.as_ref())?));
            }
            Some(EntityTypes::build(&self.exec, &cols, num_rows)?)
        };
        let data = self.entity_mut(entity);
        data.types = types;
        data.types_path = None;
        if entity == Entity::Edge {
            self.views.invalidate_where(ViewKey::needs_edge_types);
        }
        Ok(())
    }

    fn rebuild_types_if_defined(&mut self, entity: Entity, touched: &[String]) -> RdgResult<()> {
        let columns: Vec<String> = match &self.entity(entity).types {
            Some(types) if touched.iter().any(|c| types.defines(c)) => types
                .columns()
                .iter()
                .filter(|c| self.entity(entity).properties.contains(c))
                .cloned()
                .collect(),
            _ => return Ok(()),
        };
        debug!("Rebuilding {} entity types from {:?}", entity.prefix(), columns);
        self.build_types(entity, &columns)
    }

    /// Per-edge entity type ids, if edge types exist
    pub fn edge_type_ids(&self) -> Option<&[EntityTypeId]> {
        self.edges.types.as_ref().map(EntityTypes::type_ids)
    }

    // ---- derived views ----

    /// The derived view named by `key`, built on first request
    pub fn get_view(&self, key: ViewKey) -> Arc<DerivedView> {
        self.views.get_or_build(key, || {
            views::build_view(&self.exec, &self.topology, key, self.edge_type_ids())
        })
    }

    /// True if the view is resident and built
    pub fn is_view_built(&self, key: &ViewKey) -> bool {
        self.views.is_built(key)
    }

    /// Views built in memory (not loaded) by this snapshot
    pub fn view_build_count(&self) -> usize {
        self.views.build_count()
    }

    /// Drop every cached view
    pub fn drop_views(&self) {
        self.views.invalidate_all();
    }

    // ---- versions ----

    /// Committed versions of the graph at `uri`, ascending
    pub async fn list_versions(store: &dyn BlobStore, uri: &str) -> RdgResult<Vec<u64>> {
        let mut versions: Vec<u64> = store
            .list(uri)
            .map_err(RdgError::from)
            .try_filter_map(|meta| async move { Ok(parse_version_from_name(&meta.name).ok()) })
            .try_collect()
            .await?;
        versions.sort_unstable();
        Ok(versions)
    }

    /// Delete every blob under `uri` not referenced by the newest
    /// `keep_latest` versions (at least one). Returns the number deleted.
    #[instrument(skip(store))]
    pub async fn collect_garbage(store: &dyn BlobStore, uri: &str, keep_latest: usize) -> RdgResult<usize> {
        let versions = Self::list_versions(store, uri).await?;
        if versions.is_empty() {
            return Err(RdgError::NotFound(format!("no versions under {}", uri)));
        }

        let mut keep: BTreeSet<String> = BTreeSet::new();
        keep.insert(MANIFEST_HEAD.to_string());
        for &version in versions.iter().rev().take(keep_latest.max(1)) {
            let manifest = RdgManifest::make_version(store, uri, version).await?;
            keep.extend(manifest.file_names());
        }
        // the head may name a version that was never kept as meta_<N>
        match RdgManifest::make(store, uri).await {
            Ok(head) => {
                keep.extend(head.file_names());
                keep.insert(file_name_for(head.version));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let doomed: Vec<String> = store
            .list(uri)
            .map_err(RdgError::from)
            .try_filter_map(|meta| {
                let keep = &keep;
                async move { Ok((!keep.contains(&meta.name)).then_some(meta.name)) }
            })
            .try_collect()
            .await?;
        if !doomed.is_empty() {
            store.delete(uri, &doomed).await?;
        }
        info!("Garbage collected {} blobs under {}", doomed.len(), uri);
        Ok(doomed.len())
    }

    // ---- projection ----

    /// Induced subgraph over nodes having any of `node_types` and edges
    /// having any of `edge_types`; an empty list selects everything.
    pub fn project<S: AsRef<str>>(&self, node_types: &[S], edge_types: &[S]) -> RdgResult<ProjectedGraph<'_>> {
        ProjectedGraph::make(self, node_types, edge_types)
    }
}

/// Fresh blob name with a readable prefix
fn blob_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

//! Derived view cache and view persistence
//!
//! Views are built on first request and kept in a bounded cache. A build
//! in progress is tracked by a `OnceLock` slot outside the bounded cache,
//! so exactly one caller builds a given view while concurrent callers for
//! the same key wait for that build, even if the cache evicts under
//! pressure meanwhile. Finished views move into the bounded cache.

use crate::blob::{join_path, BlobStore};
use crate::cache::BoundedCache;
use crate::error::{RdgError, RdgResult};
use crate::manifest::ViewFileEntry;
use crate::topology_file::{decode_edge_ids, decode_node_ids, decode_topology, encode_edge_ids, encode_node_ids, encode_topology};
use bytes::Bytes;
use rustc_hash::FxHashMap;
use samyama_topology::{
    DerivedView, EdgeShuffleTopology, EdgeTypeAwareBiDir, EntityTypeId, Executor, GraphTopology, ShuffleTopology, ViewKey,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info};

type ViewSlot = Arc<OnceLock<Arc<DerivedView>>>;

struct Slots {
    /// Built views, bounded
    built: BoundedCache<ViewKey, Arc<DerivedView>>,
    /// Builds in progress; never evicted
    pending: FxHashMap<ViewKey, ViewSlot>,
}

/// Bounded cache of built views
pub(crate) struct ViewCache {
    slots: Mutex<Slots>,
    builds: AtomicUsize,
}

enum Lookup {
    Built(Arc<DerivedView>),
    Pending(ViewSlot),
}

impl ViewCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let built = BoundedCache::with_entries(capacity.max(1))
            .with_evict_callback(|key: &ViewKey, _: &Arc<DerivedView>| debug!("Evicted view {}", key));
        Self {
            slots: Mutex::new(Slots {
                built,
                pending: FxHashMap::default(),
            }),
            builds: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: ViewKey) -> Lookup {
        let mut slots = self.lock();
        if let Some(view) = slots.built.get(&key) {
            return Lookup::Built(Arc::clone(view));
        }
        let slot = slots.pending.entry(key).or_default();
        Lookup::Pending(Arc::clone(slot))
    }

    /// The cached view for `key`, building it with `build` if needed
    pub(crate) fn get_or_build(&self, key: ViewKey, build: impl FnOnce() -> DerivedView) -> Arc<DerivedView> {
        let slot = match self.lookup(key) {
            Lookup::Built(view) => return view,
            Lookup::Pending(slot) => slot,
        };
        let view = Arc::clone(slot.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            Arc::new(build())
        }));

        // Publish unless the build was invalidated or already published
        let mut slots = self.lock();
        if slots.pending.get(&key).is_some_and(|pending| Arc::ptr_eq(pending, &slot)) {
            slots.pending.remove(&key);
            slots.built.insert(key, Arc::clone(&view));
        }
        view
    }

    /// Seed the cache with a view read from storage
    pub(crate) fn insert_built(&self, view: DerivedView) {
        let key = view.key();
        let mut slots = self.lock();
        slots.pending.remove(&key);
        slots.built.insert(key, Arc::new(view));
    }

    /// True if a built view for `key` is resident
    pub(crate) fn is_built(&self, key: &ViewKey) -> bool {
        self.lock().built.contains(key)
    }

    /// Every resident built view
    pub(crate) fn built_views(&self) -> Vec<Arc<DerivedView>> {
        self.lock().built.iter().map(|(_, view)| Arc::clone(view)).collect()
    }

    /// Drop views matching `pred`, including builds in progress
    pub(crate) fn invalidate_where(&self, pred: impl Fn(&ViewKey) -> bool) {
        let mut slots = self.lock();
        let doomed: Vec<ViewKey> = slots.built.iter().map(|(k, _)| *k).filter(|k| pred(k)).collect();
        for key in doomed {
            slots.built.remove(&key);
            debug!("Invalidated view {}", key);
        }
        slots.pending.retain(|key, _| !pred(key));
    }

    pub(crate) fn invalidate_all(&self) {
        let mut slots = self.lock();
        slots.built.clear();
        slots.pending.clear();
    }

    /// Number of resident built views
    pub(crate) fn len(&self) -> usize {
        self.lock().built.len()
    }

    /// Number of views built (not loaded) so far
    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

/// Build the view named by `key` over `base`
pub(crate) fn build_view(
    exec: &Executor,
    base: &GraphTopology,
    key: ViewKey,
    edge_types: Option<&[EntityTypeId]>,
) -> DerivedView {
    let unknown;
    let types = match edge_types {
        Some(types) => types,
        None if key.needs_edge_types() => {
            unknown = vec![0 as EntityTypeId; base.num_edges()];
            &unknown[..]
        }
        None => &[],
    };

    let start = std::time::Instant::now();
    let view = match key {
        ViewKey::EdgeShuffle { transposed, sort } => DerivedView::EdgeShuffle(EdgeShuffleTopology::make(
            exec,
            base,
            transposed,
            sort,
            key.needs_edge_types().then_some(types),
        )),
        ViewKey::NodeAndEdgeShuffle => DerivedView::NodeAndEdgeShuffle(ShuffleTopology::make(exec, base)),
        ViewKey::EdgeTypeAwareBiDir => DerivedView::EdgeTypeAwareBiDir(EdgeTypeAwareBiDir::make(exec, base, types)),
    };
    info!(
        "Built view {} over {} nodes, {} edges in {:?}",
        key,
        base.num_nodes(),
        base.num_edges(),
        start.elapsed()
    );
    view
}

/// True for views whose layout depends only on the topology
pub(crate) fn is_persistable(key: &ViewKey) -> bool {
    !key.needs_edge_types()
}

/// Files making up one persisted view: (entry, [(file name, bytes)])
pub(crate) fn encode_view(view: &DerivedView) -> Option<(ViewFileEntry, Vec<(String, Bytes)>)> {
    let key = view.key();
    if !is_persistable(&key) {
        return None;
    }
    let base = format!("view-{}-{}", key.name(), uuid::Uuid::new_v4());
    let topology_name = format!("{}-topology", base);
    let edges_name = format!("{}-edges", base);

    match view {
        DerivedView::EdgeShuffle(v) => Some((
            ViewFileEntry {
                key,
                topology: topology_name.clone(),
                edge_permutation: edges_name.clone(),
                node_permutation: None,
            },
            vec![
                (topology_name, encode_topology(v.topology())),
                (edges_name, encode_edge_ids(v.edge_prop_indices())),
            ],
        )),
        DerivedView::NodeAndEdgeShuffle(v) => {
            let nodes_name = format!("{}-nodes", base);
            Some((
                ViewFileEntry {
                    key,
                    topology: topology_name.clone(),
                    edge_permutation: edges_name.clone(),
                    node_permutation: Some(nodes_name.clone()),
                },
                vec![
                    (topology_name, encode_topology(v.topology())),
                    (edges_name, encode_edge_ids(v.edge_prop_indices())),
                    (nodes_name, encode_node_ids(v.node_new_to_old())),
                ],
            ))
        }
        DerivedView::EdgeTypeAwareBiDir(_) => None,
    }
}

/// Read a persisted view and check it against the base topology
pub(crate) async fn load_view(
    store: &dyn BlobStore,
    dir: &str,
    entry: &ViewFileEntry,
    base: &GraphTopology,
) -> RdgResult<DerivedView> {
    let topology = decode_topology(&store.get(&join_path(dir, &entry.topology)).await?)?;
    let edges = decode_edge_ids(&store.get(&join_path(dir, &entry.edge_permutation)).await?)?;

    let invalid = |what: &str| RdgError::InvalidArgument(format!("stored view {} has {}", entry.key, what));
    if topology.num_nodes() != base.num_nodes() || topology.num_edges() != base.num_edges() {
        return Err(invalid("a different size than the base topology"));
    }
    if edges.len() != topology.num_edges() || edges.iter().any(|&e| e as usize >= base.num_edges()) {
        return Err(invalid("a malformed edge permutation"));
    }

    match entry.key {
        ViewKey::EdgeShuffle { transposed, sort } => Ok(DerivedView::EdgeShuffle(EdgeShuffleTopology::from_parts(
            topology, edges, transposed, sort,
        ))),
        ViewKey::NodeAndEdgeShuffle => {
            let path = entry
                .node_permutation
                .as_deref()
                .ok_or_else(|| invalid("no node permutation"))?;
            let nodes = decode_node_ids(&store.get(&join_path(dir, path)).await?)?;
            let mut seen = vec![false; base.num_nodes()];
            let bijective = nodes.len() == base.num_nodes()
                && nodes.iter().all(|&n| {
                    let fresh = (n as usize) < seen.len() && !seen[n as usize];
                    if fresh {
                        seen[n as usize] = true;
                    }
                    fresh
                });
            if !bijective {
                return Err(invalid("a malformed node permutation"));
            }
            Ok(DerivedView::NodeAndEdgeShuffle(ShuffleTopology::from_parts(topology, nodes, edges)))
        }
        ViewKey::EdgeTypeAwareBiDir => Err(invalid("a kind that is never persisted")),
    }
}

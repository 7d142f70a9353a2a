//! Version manifests
//!
//! A manifest names every blob that makes up one snapshot of a graph. The
//! current head is stored as `meta` in the graph directory; every
//! committed version is also kept as `meta_<version>`. Versions form a
//! chain through `previous_version`, rooted at version 0.

use crate::blob::{join_path, BlobStore};
use crate::error::{RdgError, RdgResult};
use bytes::Bytes;
use samyama_topology::ViewKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// File name of the current head
pub const MANIFEST_HEAD: &str = "meta";

/// Prefix of versioned manifest names
pub const MANIFEST_PREFIX: &str = "meta_";

/// One stored property column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFileEntry {
    pub name: String,
    pub path: String,
}

/// One persisted derived view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFileEntry {
    pub key: ViewKey,
    /// View CSR in the topology layout
    pub topology: String,
    /// View edge -> original edge id
    pub edge_permutation: String,
    /// View node -> original node id, for node-reordering views
    pub node_permutation: Option<String>,
}

/// Files that make up the (single) partition of a version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartHeader {
    pub topology: Option<String>,
    pub node_properties: Vec<PropertyFileEntry>,
    pub edge_properties: Vec<PropertyFileEntry>,
    pub node_entity_types: Option<String>,
    pub edge_entity_types: Option<String>,
    pub views: Vec<ViewFileEntry>,
}

impl PartHeader {
    /// Every file name referenced by this header
    pub fn file_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        names.extend(self.topology.iter().cloned());
        names.extend(self.node_properties.iter().map(|p| p.path.clone()));
        names.extend(self.edge_properties.iter().map(|p| p.path.clone()));
        names.extend(self.node_entity_types.iter().cloned());
        names.extend(self.edge_entity_types.iter().cloned());
        for view in &self.views {
            names.insert(view.topology.clone());
            names.insert(view.edge_permutation.clone());
            names.extend(view.node_permutation.iter().cloned());
        }
        names
    }
}

/// Commands that produced a version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdgLineage {
    pub commands: Vec<String>,
}

impl RdgLineage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            commands: vec![command.into()],
        }
    }

    pub fn add_command(&mut self, command: impl Into<String>) {
        self.commands.push(command.into());
    }
}

/// Immutable description of one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdgManifest {
    pub version: u64,
    pub previous_version: u64,
    pub num_partitions: u32,
    pub policy_id: u32,
    pub lineage: RdgLineage,
    /// RFC 3339 commit timestamp, absent on the root
    pub commit_time: Option<String>,
    pub header: PartHeader,
    /// Graph directory this manifest was read from or will be written to
    #[serde(skip)]
    pub dir: String,
}

impl RdgManifest {
    /// Root of a new version chain
    pub fn root(dir: impl Into<String>) -> Self {
        Self {
            version: 0,
            previous_version: 0,
            num_partitions: 1,
            policy_id: 0,
            lineage: RdgLineage::new(),
            commit_time: None,
            header: PartHeader::default(),
            dir: dir.into(),
        }
    }

    /// True for the root of the chain
    pub fn is_root(&self) -> bool {
        self.version == self.previous_version
    }

    /// Successor manifest: version + 1, previous version = this version.
    /// The header is carried over and replaced by the committer.
    pub fn next_version(&self, num_partitions: u32, policy_id: u32, lineage: RdgLineage) -> Self {
        Self {
            version: self.version + 1,
            previous_version: self.version,
            num_partitions,
            policy_id,
            lineage,
            commit_time: Some(chrono::Utc::now().to_rfc3339()),
            header: self.header.clone(),
            dir: self.dir.clone(),
        }
    }

    /// Renumber an uncommitted successor to `latest + 1` when its number
    /// is already taken. `previous_version` is left alone. Returns true if
    /// the version changed.
    pub fn renumber_after(&mut self, latest: u64) -> bool {
        if self.version > latest {
            return false;
        }
        self.version = latest + 1;
        true
    }

    /// Read the current head of `dir`
    pub async fn make(store: &dyn BlobStore, dir: &str) -> RdgResult<Self> {
        Self::read(store, dir, MANIFEST_HEAD).await
    }

    /// Read a specific version of `dir`
    pub async fn make_version(store: &dyn BlobStore, dir: &str, version: u64) -> RdgResult<Self> {
        Self::read(store, dir, &file_name_for(version)).await
    }

    async fn read(store: &dyn BlobStore, dir: &str, name: &str) -> RdgResult<Self> {
        if dir.is_empty() {
            return Err(RdgError::InvalidArgument("empty graph uri".to_string()));
        }
        let path = join_path(dir, name);
        let data = store.get(&path).await?;
        let manifest = Self::from_bytes(dir, &data)?;
        debug!("Read manifest {} (version {})", path, manifest.version);
        Ok(manifest)
    }

    /// Decode a manifest and validate its version chain link
    pub fn from_bytes(dir: &str, data: &[u8]) -> RdgResult<Self> {
        let mut manifest: RdgManifest = serde_json::from_slice(data)
            .map_err(|e| RdgError::InvalidArgument(format!("malformed manifest: {}", e)))?;
        if manifest.version == manifest.previous_version && manifest.version != 0 {
            return Err(RdgError::InvalidArgument(format!(
                "manifest version {} points at itself",
                manifest.version
            )));
        }
        if manifest.version < manifest.previous_version {
            return Err(RdgError::InvalidArgument(format!(
                "manifest version {} older than its previous version {}",
                manifest.version, manifest.previous_version
            )));
        }
        manifest.dir = dir.to_string();
        Ok(manifest)
    }

    pub fn to_bytes(&self) -> RdgResult<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    /// Name of this version's manifest file
    pub fn file_name(&self) -> String {
        file_name_for(self.version)
    }

    /// Every blob this version depends on, including its own manifest
    pub fn file_names(&self) -> BTreeSet<String> {
        let mut names = self.header.file_names();
        names.insert(self.file_name());
        names
    }
}

/// Versioned manifest file name
pub fn file_name_for(version: u64) -> String {
    format!("{}{}", MANIFEST_PREFIX, version)
}

/// Recover `N` from `meta_N`
pub fn parse_version_from_name(name: &str) -> RdgResult<u64> {
    name.strip_prefix(MANIFEST_PREFIX)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| RdgError::InvalidArgument(format!("not a versioned manifest name: {:?}", name)))
}

/// True for `meta` and `meta_<N>`
pub fn is_manifest_file(name: &str) -> bool {
    name == MANIFEST_HEAD || parse_version_from_name(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use samyama_topology::EdgeSortKind;

    #[test]
    fn test_next_version_links_chain() {
        let root = RdgManifest::root("g");
        assert!(root.is_root());

        let v1 = root.next_version(1, 0, RdgLineage::with_command("import"));
        assert_eq!(v1.version, 1);
        assert_eq!(v1.previous_version, 0);
        assert!(!v1.is_root());
        assert!(v1.commit_time.is_some());

        let v2 = v1.next_version(2, 7, RdgLineage::new());
        assert_eq!((v2.version, v2.previous_version, v2.num_partitions, v2.policy_id), (2, 1, 2, 7));
    }

    #[test]
    fn test_renumber_after_keeps_parent() {
        let v1 = RdgManifest::root("g").next_version(1, 0, RdgLineage::new());
        let mut next = v1.next_version(1, 0, RdgLineage::with_command("branch"));
        assert!(!next.renumber_after(1));
        assert_eq!(next.version, 2);

        assert!(next.renumber_after(3));
        assert_eq!((next.version, next.previous_version), (4, 1));
        let data = next.to_bytes().unwrap();
        assert_eq!(RdgManifest::from_bytes("g", &data).unwrap().version, 4);
    }

    #[test]
    fn test_version_names() {
        assert_eq!(file_name_for(12), "meta_12");
        assert_eq!(parse_version_from_name("meta_12").unwrap(), 12);
        assert!(matches!(parse_version_from_name("meta"), Err(RdgError::InvalidArgument(_))));
        assert!(parse_version_from_name("meta_").is_err());
        assert!(parse_version_from_name("meta_1x").is_err());
        assert!(parse_version_from_name("topology-1").is_err());
        assert!(is_manifest_file("meta"));
        assert!(is_manifest_file("meta_3"));
        assert!(!is_manifest_file("meta_x"));
    }

    #[test]
    fn test_file_names_cover_header() {
        let mut manifest = RdgManifest::root("g").next_version(1, 0, RdgLineage::new());
        manifest.header = PartHeader {
            topology: Some("topology-a".into()),
            node_properties: vec![PropertyFileEntry { name: "age".into(), path: "node-prop-b".into() }],
            edge_properties: vec![PropertyFileEntry { name: "w".into(), path: "edge-prop-c".into() }],
            node_entity_types: Some("node-types-d".into()),
            edge_entity_types: None,
            views: vec![ViewFileEntry {
                key: ViewKey::EdgeShuffle { transposed: true, sort: EdgeSortKind::ByDestId },
                topology: "view-e".into(),
                edge_permutation: "view-f".into(),
                node_permutation: None,
            }],
        };
        let names: Vec<_> = manifest.file_names().into_iter().collect();
        assert_eq!(
            names,
            vec!["edge-prop-c", "meta_1", "node-prop-b", "node-types-d", "topology-a", "view-e", "view-f"]
        );
    }

    #[test]
    fn test_from_bytes_rejects_bad_chain() {
        let mut manifest = RdgManifest::root("g").next_version(1, 0, RdgLineage::new());
        manifest.previous_version = 1;
        let data = manifest.to_bytes().unwrap();
        assert!(matches!(RdgManifest::from_bytes("g", &data), Err(RdgError::InvalidArgument(_))));
        assert!(matches!(RdgManifest::from_bytes("g", b"not json"), Err(RdgError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_make_reads_head_and_versions() {
        let store = MemoryBlobStore::new();
        let v1 = RdgManifest::root("g").next_version(1, 0, RdgLineage::with_command("load"));
        store.put("g/meta_1", v1.to_bytes().unwrap()).await.unwrap();
        store.put("g/meta", v1.to_bytes().unwrap()).await.unwrap();

        let head = RdgManifest::make(&store, "g").await.unwrap();
        assert_eq!(head, v1);
        assert_eq!(RdgManifest::make_version(&store, "g", 1).await.unwrap().version, 1);
        assert!(RdgManifest::make_version(&store, "g", 2).await.unwrap_err().is_not_found());
        assert!(matches!(RdgManifest::make(&store, "").await, Err(RdgError::InvalidArgument(_))));
    }
}

//! Engine configuration

use crate::blob::write_group::DEFAULT_MAX_OUTSTANDING_BYTES;
use crate::error::RdgResult;
use samyama_topology::Executor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RDG engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdgConfig {
    /// Worker threads for topology construction (0 = one per core)
    pub num_threads: usize,
    /// Unacknowledged bytes allowed in flight during commit
    pub write_group_max_outstanding_bytes: u64,
    /// Derived views kept resident at once
    pub view_cache_capacity: usize,
    /// Load persisted derived views when a version is loaded
    pub load_views: bool,
    /// Persist built shuffle views on commit
    pub persist_views: bool,
}

impl Default for RdgConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            write_group_max_outstanding_bytes: DEFAULT_MAX_OUTSTANDING_BYTES,
            view_cache_capacity: 8,
            load_views: true,
            persist_views: true,
        }
    }
}

impl RdgConfig {
    /// Read a config from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> RdgResult<Self> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Worker pool sized by `num_threads`
    pub fn executor(&self) -> RdgResult<Executor> {
        Ok(Executor::new(self.num_threads)?)
    }
}

/// What to materialize when loading a version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Version to load (None = current head)
    pub version: Option<u64>,
    /// Node columns to load (None = all)
    pub node_properties: Option<Vec<String>>,
    /// Edge columns to load (None = all)
    pub edge_properties: Option<Vec<String>>,
}

impl LoadOptions {
    pub fn head() -> Self {
        Self::default()
    }

    pub fn at_version(version: u64) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    pub fn with_node_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node_properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_edge_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edge_properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// True if node column `name` should be materialized
    pub fn wants_node_property(&self, name: &str) -> bool {
        wants(&self.node_properties, name)
    }

    /// True if edge column `name` should be materialized
    pub fn wants_edge_property(&self, name: &str) -> bool {
        wants(&self.edge_properties, name)
    }
}

fn wants(selection: &Option<Vec<String>>, name: &str) -> bool {
    selection.as_ref().map_or(true, |names| names.iter().any(|n| n == name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = RdgConfig::default();
        assert_eq!(config.write_group_max_outstanding_bytes, 10 << 30);
        assert_eq!(config.view_cache_capacity, 8);
        assert!(config.load_views && config.persist_views);
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_threads": 2, "persist_views": false}}"#).unwrap();

        let config = RdgConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.num_threads, 2);
        assert!(!config.persist_views);
        assert_eq!(config.view_cache_capacity, 8);
        assert_eq!(config.executor().unwrap().num_threads(), 2);
    }

    #[test]
    fn test_load_options_selection() {
        let options = LoadOptions::at_version(3).with_node_properties(["age"]);
        assert_eq!(options.version, Some(3));
        assert!(options.wants_node_property("age"));
        assert!(!options.wants_node_property("name"));
        assert!(options.wants_edge_property("weight"));
    }
}

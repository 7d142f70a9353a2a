//! Engine-wide error kinds

use crate::blob::BlobError;
use thiserror::Error;

/// Errors returned by RDG operations
#[derive(Error, Debug)]
pub enum RdgError {
    /// Malformed input: bad topology file, row-count mismatch, empty uri
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No property column with this name (or index)
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// The column exists in the version but its data was not loaded
    #[error("Property not loaded: {0}")]
    PropertyNotLoaded(String),

    /// No entity type with this name
    #[error("Entity type not found: {0}")]
    TypeNotFound(String),

    /// Column type mismatch or other columnar failure
    #[error("Column error: {0}")]
    Column(String),

    /// Missing manifest, version or blob
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blob store failure
    #[error("Blob store error: {0}")]
    Blob(BlobError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Manifest encoding error
    #[error("Manifest encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<BlobError> for RdgError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(path) => RdgError::NotFound(path),
            other => RdgError::Blob(other),
        }
    }
}

impl RdgError {
    /// True for missing manifests, versions and blobs
    pub fn is_not_found(&self) -> bool {
        matches!(self, RdgError::NotFound(_))
    }
}

pub type RdgResult<T> = Result<T, RdgError>;

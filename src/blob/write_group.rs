//! Bounded group of asynchronous blob writes
//!
//! Topology and column serialization is CPU-bound while uploads are
//! I/O-bound. The write group lets them overlap but stops accepting new
//! writes while more than `max_outstanding_bytes` are unacknowledged.

use super::{BlobError, BlobResult, BlobStore};
use bytes::Bytes;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default bound on unacknowledged bytes (10 GiB)
pub const DEFAULT_MAX_OUTSTANDING_BYTES: u64 = 10 << 30;

pub struct WriteGroup {
    store: Arc<dyn BlobStore>,
    tasks: JoinSet<(u64, String, BlobResult<()>)>,
    outstanding: u64,
    max_outstanding: u64,
    bytes_written: u64,
    first_error: Option<BlobError>,
}

impl WriteGroup {
    pub fn new(store: Arc<dyn BlobStore>, max_outstanding_bytes: u64) -> Self {
        Self {
            store,
            tasks: JoinSet::new(),
            outstanding: 0,
            max_outstanding: max_outstanding_bytes.max(1),
            bytes_written: 0,
            first_error: None,
        }
    }

    /// Bytes submitted but not yet acknowledged
    pub fn outstanding_bytes(&self) -> u64 {
        self.outstanding
    }

    /// Queue a write. Waits for earlier writes to finish while the bound
    /// would be exceeded; a single write larger than the bound is admitted
    /// once nothing else is in flight.
    pub async fn start_store(&mut self, path: String, data: Bytes) {
        let size = data.len() as u64;
        while self.outstanding + size > self.max_outstanding && !self.tasks.is_empty() {
            self.reap_one().await;
        }
        self.outstanding += size;
        let store = Arc::clone(&self.store);
        self.tasks.spawn(async move {
            let result = store.put(&path, data).await;
            (size, path, result)
        });
    }

    async fn reap_one(&mut self) {
        match self.tasks.join_next().await {
            Some(Ok((size, path, result))) => {
                self.outstanding -= size;
                match result {
                    Ok(()) => {
                        self.bytes_written += size;
                        debug!("Write of {} acknowledged ({} bytes)", path, size);
                    }
                    Err(e) => {
                        warn!("Write of {} failed: {}", path, e);
                        self.first_error.get_or_insert(e);
                    }
                }
            }
            Some(Err(join_err)) => {
                warn!("Write task failed: {}", join_err);
                self.first_error.get_or_insert(BlobError::Task(join_err.to_string()));
            }
            None => {}
        }
    }

    /// Wait for every queued write; returns the total bytes written or the
    /// first failure.
    pub async fn finish(mut self) -> BlobResult<u64> {
        while !self.tasks.is_empty() {
            self.reap_one().await;
        }
        match self.first_error.take() {
            Some(e) => Err(e),
            None => Ok(self.bytes_written),
        }
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::{MetadataError, ParentChunk, ParentStore};

/// In-memory [`ParentStore`] with call counting and failure injection.
#[derive(Default)]
pub struct MockParentStore {
    parents: RwLock<HashMap<String, ParentChunk>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl MockParentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parent(&self, parent: ParentChunk) {
        self.parents
            .write()
            .insert(parent.parent_chunk_id.clone(), parent);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn fetch_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ParentStore for MockParentStore {
    async fn fetch_parents(&self, ids: &[String]) -> Result<Vec<ParentChunk>, MetadataError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(MetadataError::FetchFailed {
                message: "mock failure".to_string(),
            });
        }

        let parents = self.parents.read();
        Ok(ids.iter().filter_map(|id| parents.get(id).cloned()).collect())
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;

use super::{AccessControl, AccessError, AccessType};
use crate::types::Role;

/// In-memory [`AccessControl`] with grants, access classes, call counters,
/// and failure injection.
#[derive(Default)]
pub struct MockAccessControl {
    grants: RwLock<HashMap<String, HashSet<String>>>,
    access_types: RwLock<HashMap<String, AccessType>>,
    visible_calls: AtomicUsize,
    type_calls: AtomicUsize,
    fail: AtomicBool,
    fail_type_lookups: AtomicBool,
    delay: RwLock<Option<Duration>>,
}

impl MockAccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `user_id` visibility of the given documents.
    pub fn grant<I, S>(&self, user_id: &str, docs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .write()
            .entry(user_id.to_string())
            .or_default()
            .extend(docs.into_iter().map(Into::into));
    }

    /// Sets the access class of a document (default when unset: absent from
    /// lookups, which callers must treat as not-public).
    pub fn set_access_type(&self, document_id: &str, access_type: AccessType) {
        self.access_types
            .write()
            .insert(document_id.to_string(), access_type);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Fails only `document_access_types`, leaving visibility lookups intact.
    pub fn set_fail_type_lookups(&self, fail: bool) {
        self.fail_type_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn visible_calls(&self) -> usize {
        self.visible_calls.load(Ordering::SeqCst)
    }

    pub fn type_calls(&self) -> usize {
        self.type_calls.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl AccessControl for MockAccessControl {
    async fn visible_document_ids(
        &self,
        user_id: &str,
        _role: Role,
    ) -> Result<HashSet<String>, AccessError> {
        self.apply_delay().await;
        self.visible_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(AccessError::LookupFailed {
                message: "mock failure".to_string(),
            });
        }

        Ok(self.grants.read().get(user_id).cloned().unwrap_or_default())
    }

    async fn document_access_types(
        &self,
        document_ids: &[String],
    ) -> Result<HashMap<String, AccessType>, AccessError> {
        self.apply_delay().await;
        self.type_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) || self.fail_type_lookups.load(Ordering::SeqCst) {
            return Err(AccessError::LookupFailed {
                message: "mock failure".to_string(),
            });
        }

        let types = self.access_types.read();
        Ok(document_ids
            .iter()
            .filter_map(|id| types.get(id).map(|t| (id.clone(), *t)))
            .collect())
    }
}

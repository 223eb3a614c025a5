use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::{AccessControl, AccessError};
use crate::types::{Role, UserContext};

/// Document restriction applied to every index probe of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessFilter {
    /// No restriction. Only `SUPER_ADMIN` gets this.
    AllowAll,
    /// Probes must stay within this whitelist. An empty whitelist means the
    /// request short-circuits to zero results; it never degrades to a scan.
    DocIdSet(HashSet<String>),
}

impl AccessFilter {
    /// The store-side filter: `None` for no restriction.
    pub fn doc_ids(&self) -> Option<&HashSet<String>> {
        match self {
            AccessFilter::AllowAll => None,
            AccessFilter::DocIdSet(ids) => Some(ids),
        }
    }

    /// `true` iff this filter admits no documents at all.
    pub fn is_empty_whitelist(&self) -> bool {
        matches!(self, AccessFilter::DocIdSet(ids) if ids.is_empty())
    }

    /// `true` iff `document_id` is visible under this filter.
    pub fn permits(&self, document_id: &str) -> bool {
        match self {
            AccessFilter::AllowAll => true,
            AccessFilter::DocIdSet(ids) => ids.contains(document_id),
        }
    }
}

/// Builds the per-request [`AccessFilter`] from the ACL port.
///
/// ACL failures fail closed: the caller gets an error, never `AllowAll`.
pub struct FilterBuilder<A> {
    acl: Arc<A>,
    timeout: Duration,
}

impl<A: AccessControl> FilterBuilder<A> {
    pub fn new(acl: Arc<A>, timeout: Duration) -> Self {
        Self { acl, timeout }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id, role = ?user.role))]
    pub async fn build(&self, user: &UserContext) -> Result<AccessFilter, AccessError> {
        if user.role == Role::SuperAdmin {
            debug!("Super admin, no document restriction");
            return Ok(AccessFilter::AllowAll);
        }

        let lookup = self.acl.visible_document_ids(&user.user_id, user.role);
        let ids = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "ACL lookup timed out");
                return Err(AccessError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
        };

        debug!(visible_docs = ids.len(), "Access filter built");
        Ok(AccessFilter::DocIdSet(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::MockAccessControl;

    fn user(role: Role) -> UserContext {
        UserContext::new("u1", role, "u1@example.com")
    }

    #[tokio::test]
    async fn test_super_admin_allow_all() {
        let acl = Arc::new(MockAccessControl::new());
        let builder = FilterBuilder::new(Arc::clone(&acl), Duration::from_millis(300));

        let filter = builder.build(&user(Role::SuperAdmin)).await.unwrap();

        assert_eq!(filter, AccessFilter::AllowAll);
        assert_eq!(acl.visible_calls(), 0);
    }

    #[tokio::test]
    async fn test_user_gets_whitelist() {
        let acl = Arc::new(MockAccessControl::new());
        acl.grant("u1", ["d1", "d2"]);
        let builder = FilterBuilder::new(acl, Duration::from_millis(300));

        let filter = builder.build(&user(Role::User)).await.unwrap();

        assert!(filter.permits("d1"));
        assert!(filter.permits("d2"));
        assert!(!filter.permits("d3"));
        assert!(!filter.is_empty_whitelist());
    }

    #[tokio::test]
    async fn test_unknown_user_gets_empty_whitelist() {
        let acl = Arc::new(MockAccessControl::new());
        let builder = FilterBuilder::new(acl, Duration::from_millis(300));

        let filter = builder.build(&user(Role::User)).await.unwrap();

        assert!(filter.is_empty_whitelist());
    }

    #[tokio::test]
    async fn test_acl_failure_fails_closed() {
        let acl = Arc::new(MockAccessControl::new());
        acl.set_fail(true);
        let builder = FilterBuilder::new(acl, Duration::from_millis(300));

        let result = builder.build(&user(Role::Admin)).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_acl_timeout_fails_closed() {
        let acl = Arc::new(MockAccessControl::new());
        acl.set_delay(Some(Duration::from_millis(200)));
        let builder = FilterBuilder::new(acl, Duration::from_millis(20));

        let result = builder.build(&user(Role::User)).await;

        assert!(matches!(result, Err(AccessError::Timeout { .. })));
    }

    #[test]
    fn test_empty_whitelist_detection() {
        assert!(AccessFilter::DocIdSet(HashSet::new()).is_empty_whitelist());
        assert!(!AccessFilter::AllowAll.is_empty_whitelist());
    }
}

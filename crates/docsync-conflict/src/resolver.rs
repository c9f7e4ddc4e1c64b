//! Conflict resolution executor
//!
//! Reconciles a document's multi-version state down to one current version:
//! - enumerate the conflicting versions and the current one
//! - promote the winner to the canonical location when it is not current
//! - remove every other version, even when promotion failed
//!
//! The whole pass runs inside one metadata-only coordinated write, so the
//! store's own sync never observes a half-resolved document.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use docsync_core::{
    domain::newtypes::{DocLocation, VersionId},
    ports::version_store::IVersionStore,
    usecases::{CoordinatedAccessGate, WriteScope},
};

use crate::{error::ConflictError, policy::WinnerPolicy};

/// Result of one resolution pass
///
/// Failures are carried in `error` rather than returned, so a caller always
/// learns whether a reload is needed even when cleanup went wrong.
#[derive(Debug, Default)]
pub struct ResolutionOutcome {
    /// The current version changed and open views must reload
    pub reload_required: bool,
    /// The version kept, if any versions were in conflict
    pub winner: Option<VersionId>,
    /// Number of versions destroyed
    pub versions_removed: usize,
    pub error: Option<ConflictError>,
}

impl ResolutionOutcome {
    fn failed(error: ConflictError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// True when the document is left with a single current version
    pub fn is_resolved(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolves version conflicts through a coordinated access gate
pub struct ConflictResolver {
    store: Arc<dyn IVersionStore>,
    gate: CoordinatedAccessGate,
    policy: WinnerPolicy,
}

impl ConflictResolver {
    pub fn new(store: Arc<dyn IVersionStore>, gate: CoordinatedAccessGate) -> Self {
        Self {
            store,
            gate,
            policy: WinnerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: WinnerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve all conflicting versions of the document at `location`
    #[instrument(skip(self), fields(location = %location))]
    pub async fn resolve(&self, location: DocLocation) -> ResolutionOutcome {
        let store = Arc::clone(&self.store);
        let policy = self.policy;

        let result = self
            .gate
            .with_exclusive_write(location, WriteScope::MetadataOnly, move |effective| {
                Ok(resolve_versions(store.as_ref(), policy, effective))
            })
            .await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Conflict resolution could not acquire the document");
                ResolutionOutcome::failed(ConflictError::Coordination(e))
            }
        }
    }

    /// Returns true if the store reports versions in conflict at `location`
    pub async fn has_conflicts(&self, location: DocLocation) -> Result<bool, ConflictError> {
        let store = Arc::clone(&self.store);
        let result = self
            .gate
            .with_exclusive_write(location, WriteScope::MetadataOnly, move |effective| {
                Ok(store
                    .conflicting_versions(effective)
                    .map(|versions| !versions.is_empty())
                    .map_err(|source| ConflictError::Enumeration {
                        location: effective.clone(),
                        source,
                    }))
            })
            .await?;
        result
    }
}

/// One resolution pass; must run under exclusive access to `location`
fn resolve_versions(
    store: &dyn IVersionStore,
    policy: WinnerPolicy,
    location: &DocLocation,
) -> ResolutionOutcome {
    let conflicting = match store.conflicting_versions(location) {
        Ok(versions) => versions,
        Err(source) => {
            return ResolutionOutcome::failed(ConflictError::Enumeration {
                location: location.clone(),
                source,
            })
        }
    };

    if conflicting.is_empty() {
        debug!(%location, "No conflicting versions");
        return ResolutionOutcome::default();
    }

    let current = match store.current_version(location) {
        Ok(current) => current,
        Err(source) => {
            return ResolutionOutcome::failed(ConflictError::Enumeration {
                location: location.clone(),
                source,
            })
        }
    };

    let Some(winner) = policy.select(current.as_ref(), &conflicting) else {
        return ResolutionOutcome::default();
    };
    let winner = winner.clone();

    debug!(
        %location,
        conflicting = conflicting.len(),
        winner = %winner.handle(),
        winner_is_current = winner.is_current(),
        "Selected winning version"
    );

    let mut outcome = ResolutionOutcome {
        winner: Some(winner.handle()),
        ..ResolutionOutcome::default()
    };

    if !winner.is_current() {
        match store.replace(&winner, location) {
            Ok(()) => outcome.reload_required = true,
            Err(source) => {
                warn!(%location, error = %source, "Failed to promote winning version");
                outcome.error = Some(ConflictError::Promotion {
                    location: location.clone(),
                    source,
                });
            }
        }
    }

    match store.remove_other_versions(location) {
        Ok(()) => {
            outcome.versions_removed = conflicting.len() + usize::from(current.is_some()) - 1;
        }
        Err(source) => {
            warn!(%location, error = %source, "Failed to remove losing versions");
            if outcome.error.is_none() {
                outcome.error = Some(ConflictError::Cleanup {
                    location: location.clone(),
                    source,
                });
            }
        }
    }

    if outcome.is_resolved() {
        info!(
            %location,
            reload_required = outcome.reload_required,
            removed = outcome.versions_removed,
            "Conflict resolved"
        );
    }

    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};
    use docsync_core::{
        domain::version::ConflictVersion,
        ports::file_coordinator::{IFileCoordinator, WritingOptions},
    };

    use super::*;

    // -- Mocks --

    #[derive(Default)]
    struct StoreState {
        current: Option<ConflictVersion>,
        conflicting: Vec<ConflictVersion>,
        fail_enumerate: bool,
        fail_replace: bool,
        fail_remove: bool,
        replace_calls: usize,
        remove_calls: usize,
    }

    #[derive(Default)]
    struct MockVersionStore {
        state: Mutex<StoreState>,
    }

    impl MockVersionStore {
        fn with_versions(current: Option<i64>, conflicting: &[i64]) -> Self {
            let store = Self::default();
            {
                let mut state = store.state.lock().unwrap();
                state.current = current.map(|s| ConflictVersion::current(VersionId::new(), at(s)));
                state.conflicting = conflicting
                    .iter()
                    .map(|s| ConflictVersion::conflicting(VersionId::new(), at(*s)))
                    .collect();
            }
            store
        }

        fn remaining(&self) -> usize {
            let state = self.state.lock().unwrap();
            state.conflicting.len() + usize::from(state.current.is_some())
        }
    }

    impl IVersionStore for MockVersionStore {
        fn conflicting_versions(
            &self,
            _location: &DocLocation,
        ) -> anyhow::Result<Vec<ConflictVersion>> {
            let state = self.state.lock().unwrap();
            if state.fail_enumerate {
                anyhow::bail!("store offline");
            }
            Ok(state.conflicting.clone())
        }

        fn current_version(
            &self,
            _location: &DocLocation,
        ) -> anyhow::Result<Option<ConflictVersion>> {
            Ok(self.state.lock().unwrap().current.clone())
        }

        fn replace(&self, version: &ConflictVersion, _location: &DocLocation) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.replace_calls += 1;
            if state.fail_replace {
                anyhow::bail!("replace refused");
            }
            state.current = Some(ConflictVersion::current(
                version.handle(),
                version.modified_at(),
            ));
            Ok(())
        }

        fn remove_other_versions(&self, _location: &DocLocation) -> anyhow::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.remove_calls += 1;
            if state.fail_remove {
                anyhow::bail!("remove refused");
            }
            state.conflicting.clear();
            Ok(())
        }
    }

    struct PassthroughCoordinator {
        fail: bool,
    }

    impl IFileCoordinator for PassthroughCoordinator {
        fn coordinate_writing(
            &self,
            location: &DocLocation,
            options: WritingOptions,
            body: &mut dyn FnMut(&DocLocation),
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("busy");
            }
            assert!(options.content_independent_metadata_only);
            body(location);
            Ok(())
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn location() -> DocLocation {
        DocLocation::new("/store/Documents/Trip.shoebox").unwrap()
    }

    fn resolver(store: Arc<MockVersionStore>, fail_coordination: bool) -> ConflictResolver {
        let gate = CoordinatedAccessGate::new(Arc::new(PassthroughCoordinator {
            fail: fail_coordination,
        }));
        ConflictResolver::new(store, gate)
    }

    // -- Tests --

    #[tokio::test]
    async fn test_newer_conflicting_version_is_promoted() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30, 20]));
        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(outcome.is_resolved());
        assert!(outcome.reload_required);
        assert_eq!(outcome.versions_removed, 2);
        assert_eq!(store.remaining(), 1);

        let state = store.state.lock().unwrap();
        let current = state.current.as_ref().unwrap();
        assert!(current.is_current());
        assert_eq!(current.modified_at(), at(30));
    }

    #[tokio::test]
    async fn test_newest_current_version_is_kept() {
        let store = Arc::new(MockVersionStore::with_versions(Some(30), &[10, 20]));
        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(outcome.is_resolved());
        assert!(!outcome.reload_required);
        assert_eq!(outcome.versions_removed, 2);
        assert_eq!(store.remaining(), 1);

        let state = store.state.lock().unwrap();
        assert_eq!(state.replace_calls, 0);
        assert_eq!(state.remove_calls, 1);
        assert_eq!(state.current.as_ref().unwrap().modified_at(), at(30));
    }

    #[tokio::test]
    async fn test_no_conflicts_leaves_store_untouched() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[]));
        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(outcome.is_resolved());
        assert!(!outcome.reload_required);
        assert!(outcome.winner.is_none());

        let state = store.state.lock().unwrap();
        assert_eq!(state.replace_calls, 0);
        assert_eq!(state.remove_calls, 0);
    }

    #[tokio::test]
    async fn test_promotion_failure_still_removes_losers() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30]));
        store.state.lock().unwrap().fail_replace = true;

        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(!outcome.reload_required);
        assert!(matches!(outcome.error, Some(ConflictError::Promotion { .. })));
        assert_eq!(store.state.lock().unwrap().remove_calls, 1);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_reported() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30]));
        store.state.lock().unwrap().fail_remove = true;

        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(outcome.reload_required);
        assert!(matches!(outcome.error, Some(ConflictError::Cleanup { .. })));
        assert_eq!(outcome.versions_removed, 0);
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_reported() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30]));
        store.state.lock().unwrap().fail_enumerate = true;

        let outcome = resolver(Arc::clone(&store), false)
            .resolve(location())
            .await;

        assert!(!outcome.reload_required);
        assert!(matches!(outcome.error, Some(ConflictError::Enumeration { .. })));
        assert_eq!(store.state.lock().unwrap().remove_calls, 0);
    }

    #[tokio::test]
    async fn test_coordination_failure_never_touches_store() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30]));
        let outcome = resolver(Arc::clone(&store), true)
            .resolve(location())
            .await;

        assert!(matches!(outcome.error, Some(ConflictError::Coordination(_))));
        assert!(!outcome.reload_required);
        assert_eq!(store.remaining(), 2);
    }

    #[tokio::test]
    async fn test_has_conflicts() {
        let store = Arc::new(MockVersionStore::with_versions(Some(10), &[30]));
        let resolver = resolver(Arc::clone(&store), false);

        assert!(resolver.has_conflicts(location()).await.unwrap());
        resolver.resolve(location()).await;
        assert!(!resolver.has_conflicts(location()).await.unwrap());
    }
}

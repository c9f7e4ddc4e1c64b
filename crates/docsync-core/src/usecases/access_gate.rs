//! Coordinated access gate
//!
//! Wraps an [`IFileCoordinator`] so callers never block their own context
//! on exclusivity. Every coordinated write runs on tokio's blocking pool and
//! completes through the returned future exactly once, after the body and
//! the release of exclusivity.
//!
//! ## Cancellation
//!
//! Dropping the future does not cancel the work: the blocking task keeps
//! running until the coordinator releases the location. This keeps the
//! store from being left half-coordinated; a caller that lost interest just
//! discards the outcome.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    domain::newtypes::DocLocation,
    ports::file_coordinator::{IFileCoordinator, WritingOptions},
};

/// What a coordinated write excludes other writers from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// Both content and metadata of the location
    ContentAndMetadata,
    /// Metadata only (version bookkeeping, attributes)
    MetadataOnly,
}

impl From<WriteScope> for WritingOptions {
    fn from(scope: WriteScope) -> Self {
        match scope {
            WriteScope::ContentAndMetadata => WritingOptions::default(),
            WriteScope::MetadataOnly => WritingOptions::metadata_only(),
        }
    }
}

/// Errors surfaced by a coordinated write
#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Exclusivity was not acquired; the body never ran
    #[error("could not acquire exclusive access to {location}: {source}")]
    Acquire {
        location: DocLocation,
        #[source]
        source: anyhow::Error,
    },

    /// The body ran under exclusivity and reported failure
    #[error("coordinated write on {location} failed: {source}")]
    Body {
        location: DocLocation,
        #[source]
        source: anyhow::Error,
    },

    /// The coordinator returned success without invoking the body
    #[error("coordinator never invoked the write body for {0}")]
    NotInvoked(DocLocation),

    /// The blocking task panicked or the runtime shut down
    #[error("coordinated task aborted: {0}")]
    Aborted(String),
}

/// Serializes exclusive access to store locations
#[derive(Clone)]
pub struct CoordinatedAccessGate {
    coordinator: Arc<dyn IFileCoordinator>,
}

impl CoordinatedAccessGate {
    pub fn new(coordinator: Arc<dyn IFileCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Run `body` with exclusive write access to `location`
    ///
    /// `body` receives the effective location, which the store may have
    /// redirected. If exclusivity cannot be acquired, `body` is never invoked
    /// and [`CoordinationError::Acquire`] is returned.
    pub async fn with_exclusive_write<T, F>(
        &self,
        location: DocLocation,
        scope: WriteScope,
        body: F,
    ) -> Result<T, CoordinationError>
    where
        F: FnOnce(&DocLocation) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(location, scope.into(), body).await
    }

    /// Run a delete-style `body` with exclusive access to `location`
    pub async fn with_exclusive_delete<T, F>(
        &self,
        location: DocLocation,
        body: F,
    ) -> Result<T, CoordinationError>
    where
        F: FnOnce(&DocLocation) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.dispatch(location, WritingOptions::for_deleting(), body)
            .await
    }

    async fn dispatch<T, F>(
        &self,
        location: DocLocation,
        options: WritingOptions,
        body: F,
    ) -> Result<T, CoordinationError>
    where
        F: FnOnce(&DocLocation) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        let task = tokio::task::spawn_blocking(move || {
            coordinate(coordinator.as_ref(), &location, options, body)
        });

        task.await.map_err(|e| {
            warn!(error = %e, "Coordinated write task did not complete");
            CoordinationError::Aborted(e.to_string())
        })?
    }
}

impl std::fmt::Debug for CoordinatedAccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatedAccessGate").finish_non_exhaustive()
    }
}

fn coordinate<T, F>(
    coordinator: &dyn IFileCoordinator,
    location: &DocLocation,
    options: WritingOptions,
    body: F,
) -> Result<T, CoordinationError>
where
    F: FnOnce(&DocLocation) -> anyhow::Result<T>,
{
    debug!(%location, ?options, "Acquiring coordinated write");

    let mut body = Some(body);
    let mut outcome: Option<anyhow::Result<T>> = None;

    coordinator
        .coordinate_writing(location, options, &mut |effective: &DocLocation| {
            if let Some(body) = body.take() {
                if effective != location {
                    debug!(%location, %effective, "Coordinator relocated write");
                }
                outcome = Some(body(effective));
            }
        })
        .map_err(|source| {
            warn!(%location, error = %source, "Failed to acquire coordinated write");
            CoordinationError::Acquire {
                location: location.clone(),
                source,
            }
        })?;

    match outcome {
        Some(Ok(value)) => Ok(value),
        Some(Err(source)) => Err(CoordinationError::Body {
            location: location.clone(),
            source,
        }),
        None => Err(CoordinationError::NotInvoked(location.clone())),
    }
}

//! Referential checks run before a delete is offered for confirmation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::api::{ApiError, ResourceApi};
use crate::models::{DatabaseRelease, Resource, Study};

/// Lists the records that would be orphaned by deleting `target`
#[async_trait]
pub trait DeleteGuard<R: Resource>: Send + Sync {
    /// Labels of blocking dependents; empty means the delete may proceed
    async fn blockers(&self, target: &R) -> Result<Vec<String>, ApiError>;
}

/// Guard for entities nothing else refers to
pub struct NoDependents;

#[async_trait]
impl<R: Resource> DeleteGuard<R> for NoDependents {
    async fn blockers(&self, _target: &R) -> Result<Vec<String>, ApiError> {
        Ok(Vec::new())
    }
}

/// A study cannot be deleted while database releases point at it
pub struct StudyReleaseGuard {
    releases: Arc<dyn ResourceApi<DatabaseRelease>>,
}

impl StudyReleaseGuard {
    pub fn new(releases: Arc<dyn ResourceApi<DatabaseRelease>>) -> Self {
        Self { releases }
    }
}

#[async_trait]
impl DeleteGuard<Study> for StudyReleaseGuard {
    async fn blockers(&self, target: &Study) -> Result<Vec<String>, ApiError> {
        let releases = self.releases.list().await?;
        let blocking: Vec<String> = releases
            .into_iter()
            .filter(|release| release.study_id == target.id)
            .map(|release| release.database_release_label)
            .collect();

        debug!(
            "Study '{}' has {} associated database release(s)",
            target.study_label,
            blocking.len()
        );
        Ok(blocking)
    }
}

//! Entity table controller: owns the cached list for one entity type

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, FailureKind, ResourceApi};
use crate::crud::guard::{DeleteGuard, NoDependents};
use crate::crud::notification::Notification;
use crate::models::{EntityId, Resource};

/// Load state of a table
#[derive(Debug, Clone, PartialEq)]
pub enum TableState {
    Loading,
    Loaded,
    Error(String),
}

/// The row an edit or delete is currently in progress for
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    Edit(EntityId),
    Delete(EntityId),
}

/// Result of asking to delete a row
#[derive(Debug, Clone)]
pub enum DeleteDecision {
    /// Nothing blocks the delete; ask the user to confirm
    Confirm { id: EntityId, label: String },
    /// Dependents exist; the delete is not offered
    Blocked { label: String, dependents: Vec<String> },
    Failed(Notification),
}

/// Cached, wholesale-replaced list of one entity type
pub struct EntityTable<R: Resource> {
    api: Arc<dyn ResourceApi<R>>,
    guard: Arc<dyn DeleteGuard<R>>,
    items: Vec<R>,
    state: TableState,
    selected: Option<usize>,
    pending: Option<PendingOperation>,
    reloads: u64,
}

impl<R: Resource> EntityTable<R> {
    pub fn new(api: Arc<dyn ResourceApi<R>>) -> Self {
        Self {
            api,
            guard: Arc::new(NoDependents),
            items: Vec::new(),
            state: TableState::Loading,
            selected: None,
            pending: None,
            reloads: 0,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn DeleteGuard<R>>) -> Self {
        self.guard = guard;
        self
    }

    pub fn api(&self) -> &Arc<dyn ResourceApi<R>> {
        &self.api
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn empty_message(&self) -> &'static str {
        R::KIND.empty_message()
    }

    /// Number of full reloads issued so far
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    /// Fetch the full list and replace the cache
    pub async fn reload(&mut self) -> Result<usize, ApiError> {
        self.reloads += 1;
        self.state = TableState::Loading;
        debug!("Reloading {}", R::KIND);

        match self.api.list().await {
            Ok(items) => {
                let count = items.len();
                self.replace(items);
                info!("Loaded {} {}", count, R::KIND);
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load {}: {}", R::KIND, e);
                self.state = TableState::Error(e.message());
                Err(e)
            }
        }
    }

    /// Replace the cache with a list obtained elsewhere (push snapshot)
    pub fn replace(&mut self, items: Vec<R>) {
        let selected_id = self.selected().map(|item| item.id().clone());
        self.items = items;
        self.state = TableState::Loaded;

        // Keep the cursor on the same record when it survived the refresh
        self.selected = selected_id
            .and_then(|id| self.position(&id))
            .or_else(|| match self.selected {
                Some(idx) if !self.items.is_empty() => Some(idx.min(self.items.len() - 1)),
                _ if !self.items.is_empty() => Some(0),
                _ => None,
            });
    }

    /// Replace the cache from a raw JSON array
    pub fn replace_from_json(&mut self, data: Value) -> Result<(), serde_json::Error> {
        let items: Vec<R> = serde_json::from_value(data)?;
        self.replace(items);
        Ok(())
    }

    pub fn find(&self, id: &EntityId) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn selected(&self) -> Option<&R> {
        self.selected.and_then(|idx| self.items.get(idx))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|idx| *idx < self.items.len());
    }

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let next = match self.selected {
            Some(idx) => (idx + 1) % self.items.len(),
            None => 0,
        };
        self.selected = Some(next);
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let previous = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(idx) => idx - 1,
        };
        self.selected = Some(previous);
    }

    pub fn pending(&self) -> Option<&PendingOperation> {
        self.pending.as_ref()
    }

    pub fn begin_edit(&mut self, id: EntityId) {
        self.pending = Some(PendingOperation::Edit(id));
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Check dependents and, when nothing blocks it, mark the row for deletion
    pub async fn request_delete(&mut self, id: &EntityId) -> DeleteDecision {
        let target = match self.find(id) {
            Some(target) => target.clone(),
            None => {
                return DeleteDecision::Failed(Notification::warning(format!(
                    "The selected {} no longer exists",
                    R::KIND.noun()
                )))
            }
        };

        match self.guard.blockers(&target).await {
            Ok(dependents) if !dependents.is_empty() => {
                info!(
                    "Delete of {} '{}' blocked by {} dependent(s)",
                    R::KIND.noun(),
                    target.label(),
                    dependents.len()
                );
                self.pending = None;
                DeleteDecision::Blocked {
                    label: target.label().to_string(),
                    dependents,
                }
            }
            Ok(_) => {
                self.pending = Some(PendingOperation::Delete(id.clone()));
                DeleteDecision::Confirm {
                    id: id.clone(),
                    label: target.label().to_string(),
                }
            }
            Err(e) => {
                self.pending = None;
                DeleteDecision::Failed(Notification::error(format!(
                    "Could not check what depends on {} '{}': {}",
                    R::KIND.noun(),
                    target.label(),
                    e.message()
                )))
            }
        }
    }

    /// Delete the row marked by `request_delete`, then reload
    pub async fn confirm_delete(&mut self) -> Notification {
        let id = match self.pending.take() {
            Some(PendingOperation::Delete(id)) => id,
            other => {
                self.pending = other;
                return Notification::warning("No deletion is awaiting confirmation");
            }
        };
        let label = self
            .find(&id)
            .map(|item| item.label().to_string())
            .unwrap_or_else(|| id.to_string());

        match self.api.delete(&id).await {
            Ok(()) => {
                info!("Deleted {} '{}'", R::KIND.noun(), label);
                if let Err(e) = self.reload().await {
                    return Notification::warning(format!(
                        "Deleted {} '{}', but the list could not be refreshed: {}",
                        R::KIND.noun(),
                        label,
                        e.message()
                    ));
                }
                Notification::success(format!("Deleted {} '{}'", R::KIND.noun(), label))
            }
            Err(e) => match e.kind() {
                FailureKind::HasDependents => Notification::error(format!(
                    "Cannot delete {} '{}' because it still has associated items",
                    R::KIND.noun(),
                    label
                )),
                _ => Notification::error(format!(
                    "Failed to delete {} '{}': {}",
                    R::KIND.noun(),
                    label,
                    e.message()
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::guard::StudyReleaseGuard;
    use crate::crud::memory::MemoryApi;
    use crate::crud::notification::Severity;
    use crate::models::{DatabaseRelease, EntityKind, Study, User};

    fn study(id: &str, label: &str) -> Study {
        Study {
            id: EntityId::new(id),
            study_label: label.to_string(),
        }
    }

    fn release(id: &str, study_id: &str, label: &str) -> DatabaseRelease {
        DatabaseRelease {
            id: EntityId::new(id),
            study_id: EntityId::new(study_id),
            database_release_label: label.to_string(),
        }
    }

    fn study_table(
        studies: Vec<Study>,
        releases: Vec<DatabaseRelease>,
    ) -> (EntityTable<Study>, Arc<MemoryApi<Study>>) {
        let api = Arc::new(MemoryApi::with_items(studies));
        let releases = Arc::new(MemoryApi::with_items(releases));
        let table = EntityTable::new(api.clone() as Arc<dyn ResourceApi<Study>>)
            .with_guard(Arc::new(StudyReleaseGuard::new(releases)));
        (table, api)
    }

    #[tokio::test]
    async fn test_empty_backend_renders_empty_state() {
        let api = Arc::new(MemoryApi::<User>::default());
        let mut table = EntityTable::new(api as Arc<dyn ResourceApi<User>>);
        assert_eq!(table.state(), &TableState::Loading);

        assert_eq!(table.reload().await.unwrap(), 0);
        assert_eq!(table.state(), &TableState::Loaded);
        assert!(table.is_empty());
        assert_eq!(table.empty_message(), EntityKind::User.empty_message());
        assert!(table.selected().is_none());
    }

    #[tokio::test]
    async fn test_reload_failure_sets_error_state() {
        let api = Arc::new(MemoryApi::with_items(vec![study("1", "ABC")]));
        api.fail_next_list(503, r#"{"detail": "maintenance"}"#);
        let mut table = EntityTable::new(api as Arc<dyn ResourceApi<Study>>);

        assert!(table.reload().await.is_err());
        assert_eq!(table.state(), &TableState::Error("maintenance".to_string()));

        table.reload().await.unwrap();
        assert_eq!(table.state(), &TableState::Loaded);
        assert_eq!(table.items().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_keeps_selection_on_same_record() {
        let (mut table, _) = study_table(vec![study("1", "A"), study("2", "B")], vec![]);
        table.reload().await.unwrap();
        table.select(Some(1));

        table.replace(vec![study("0", "Z"), study("1", "A"), study("2", "B")]);
        assert_eq!(table.selected().unwrap().study_label, "B");

        table.replace(vec![study("9", "Q")]);
        assert_eq!(table.selected_index(), Some(0));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_associated_releases() {
        let (mut table, api) = study_table(
            vec![study("1", "ABC-001"), study("2", "ABC-002")],
            vec![
                release("10", "1", "DBL 2024-01"),
                release("11", "1", "DBL 2024-06"),
                release("12", "2", "Interim"),
            ],
        );
        table.reload().await.unwrap();

        match table.request_delete(&EntityId::new("1")).await {
            DeleteDecision::Blocked { label, dependents } => {
                assert_eq!(label, "ABC-001");
                assert_eq!(dependents, vec!["DBL 2024-01".to_string(), "DBL 2024-06".to_string()]);
            }
            other => panic!("expected blocked delete, got {:?}", other),
        }
        assert!(table.pending().is_none());
        assert_eq!(api.items().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_without_releases_goes_to_confirmation() {
        let (mut table, api) = study_table(
            vec![study("1", "ABC-001"), study("3", "ABC-003")],
            vec![release("10", "1", "DBL 2024-01")],
        );
        table.reload().await.unwrap();

        match table.request_delete(&EntityId::new("3")).await {
            DeleteDecision::Confirm { id, label } => {
                assert_eq!(id.as_str(), "3");
                assert_eq!(label, "ABC-003");
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
        assert_eq!(table.pending(), Some(&PendingOperation::Delete(EntityId::new("3"))));

        let reloads_before = api.list_calls();
        let notification = table.confirm_delete().await;
        assert_eq!(notification.severity, Severity::Success);
        assert_eq!(api.list_calls(), reloads_before + 1);
        assert_eq!(table.items().len(), 1);
        assert!(table.pending().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_delete_leaves_rows_alone() {
        let (mut table, api) = study_table(vec![study("3", "ABC-003")], vec![]);
        table.reload().await.unwrap();
        assert!(matches!(
            table.request_delete(&EntityId::new("3")).await,
            DeleteDecision::Confirm { .. }
        ));

        table.cancel_pending();
        let notification = table.confirm_delete().await;
        assert_eq!(notification.severity, Severity::Warning);
        assert_eq!(api.items().len(), 1);
    }

    #[tokio::test]
    async fn test_server_side_dependents_error_is_reworded() {
        let (mut table, api) = study_table(vec![study("3", "ABC-003")], vec![]);
        table.reload().await.unwrap();
        table.request_delete(&EntityId::new("3")).await;
        api.fail_next_delete(400, r#"{"detail": "Study has associated items"}"#);

        let notification = table.confirm_delete().await;
        assert_eq!(notification.severity, Severity::Error);
        assert!(notification.message.contains("still has associated items"));
        assert_eq!(table.items().len(), 1);
    }
}

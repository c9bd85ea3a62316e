//! Push event interpretation and dispatch onto entity caches

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::crud::{EntityTable, Notification, Severity};
use crate::models::{EntityKind, Resource};

/// Raw `{type, data}` / `{type, message}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a push message asks the dashboard to do
#[derive(Debug, Clone)]
pub enum ListenerAction {
    /// `<plural>_update` carrying the full list
    ReplaceCache { kind: EntityKind, data: Value },
    /// `<singular>_created|updated|deleted`
    Reload(EntityKind),
    Notify(Notification),
}

impl ListenerAction {
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            ListenerAction::ReplaceCache { kind, .. } | ListenerAction::Reload(kind) => Some(*kind),
            ListenerAction::Notify(_) => None,
        }
    }
}

impl fmt::Display for ListenerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerAction::ReplaceCache { kind, data } => write!(
                f,
                "{}: snapshot of {} rows",
                kind.title(),
                data.as_array().map(Vec::len).unwrap_or(0)
            ),
            ListenerAction::Reload(kind) => write!(f, "{}: changed, reload", kind.title()),
            ListenerAction::Notify(notification) => write!(f, "{}", notification),
        }
    }
}

/// A cache the listener can refresh
#[async_trait]
pub trait CacheTarget: Send {
    fn kind(&self) -> EntityKind;

    async fn reload(&mut self) -> Result<usize, ApiError>;

    fn replace_from_json(&mut self, data: Value) -> Result<(), serde_json::Error>;
}

#[async_trait]
impl<R: Resource> CacheTarget for EntityTable<R> {
    fn kind(&self) -> EntityKind {
        R::KIND
    }

    async fn reload(&mut self) -> Result<usize, ApiError> {
        EntityTable::reload(self).await
    }

    fn replace_from_json(&mut self, data: Value) -> Result<(), serde_json::Error> {
        EntityTable::replace_from_json(self, data)
    }
}

/// Single-consumer interpreter for the push channel
#[derive(Debug, Default)]
pub struct LiveUpdateListener {
    received: u64,
    ignored: u64,
}

impl LiveUpdateListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Parse one raw message. Malformed or unrecognised messages yield `None`.
    pub fn handle(&mut self, text: &str) -> Option<ListenerAction> {
        self.received += 1;

        let message: PushMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring malformed push message: {}", e);
                self.ignored += 1;
                return None;
            }
        };

        let action = interpret(message);
        if action.is_none() {
            self.ignored += 1;
        }
        action
    }
}

/// Map an envelope onto an action
pub fn interpret(message: PushMessage) -> Option<ListenerAction> {
    let event_type = message.event_type.trim().to_lowercase();

    for kind in EntityKind::ALL {
        if event_type == format!("{}_update", kind.plural_key()) {
            return Some(match message.data {
                Some(data) if !data.is_null() => ListenerAction::ReplaceCache { kind, data },
                _ => ListenerAction::Reload(kind),
            });
        }

        if let Some(change) = event_type.strip_prefix(&format!("{}_", kind.singular_key())) {
            if matches!(change, "created" | "updated" | "deleted") {
                debug!("Push event: {} {}", kind.noun(), change);
                return Some(ListenerAction::Reload(kind));
            }
        }
    }

    match message.message {
        Some(text) => Some(ListenerAction::Notify(Notification::new(
            text,
            Severity::from_event_type(&event_type),
        ))),
        None => {
            debug!("Ignoring push event of unknown type '{}'", message.event_type);
            None
        }
    }
}

/// Apply an entity action to its cache. Returns a notification when something went wrong.
pub async fn apply_to(action: ListenerAction, target: &mut dyn CacheTarget) -> Option<Notification> {
    match action {
        ListenerAction::ReplaceCache { kind, data } => match target.replace_from_json(data) {
            Ok(()) => {
                info!("Replaced {} cache from push snapshot", kind);
                None
            }
            Err(e) => {
                warn!("Push snapshot for {} did not parse ({}); reloading instead", kind, e);
                reload_target(target).await
            }
        },
        ListenerAction::Reload(_) => reload_target(target).await,
        ListenerAction::Notify(notification) => Some(notification),
    }
}

async fn reload_target(target: &mut dyn CacheTarget) -> Option<Notification> {
    match target.reload().await {
        Ok(_) => None,
        Err(e) => Some(Notification::error(format!(
            "Failed to refresh {}: {}",
            target.kind().title().to_lowercase(),
            e.message()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceApi;
    use crate::crud::memory::MemoryApi;
    use crate::models::{EntityId, Study};
    use std::sync::Arc;

    fn study(id: &str, label: &str) -> Study {
        Study {
            id: EntityId::new(id),
            study_label: label.to_string(),
        }
    }

    #[test]
    fn test_event_types_map_to_actions() {
        let mut listener = LiveUpdateListener::new();

        assert!(matches!(
            listener.handle(r#"{"type": "study_deleted"}"#),
            Some(ListenerAction::Reload(EntityKind::Study))
        ));
        assert!(matches!(
            listener.handle(r#"{"type": "database_release_created", "data": null}"#),
            Some(ListenerAction::Reload(EntityKind::DatabaseRelease))
        ));
        assert!(matches!(
            listener.handle(r#"{"type": "packages_update", "data": []}"#),
            Some(ListenerAction::ReplaceCache { kind: EntityKind::Package, .. })
        ));
        assert!(matches!(
            listener.handle(r#"{"type": "users_update"}"#),
            Some(ListenerAction::Reload(EntityKind::User))
        ));
    }

    #[test]
    fn test_notifications_and_garbage() {
        let mut listener = LiveUpdateListener::new();

        match listener.handle(r#"{"type": "warning", "message": "Backup is taking longer than usual"}"#) {
            Some(ListenerAction::Notify(notification)) => {
                assert_eq!(notification.severity, Severity::Warning);
                assert_eq!(notification.message, "Backup is taking longer than usual");
            }
            other => panic!("expected notification, got {:?}", other),
        }

        assert!(listener.handle("not json").is_none());
        assert!(listener.handle(r#"{"type": "heartbeat"}"#).is_none());
        assert!(listener.handle(r#"{"type": "study_archived"}"#).is_none());
        assert_eq!(listener.received(), 4);
        assert_eq!(listener.ignored(), 3);
    }

    #[tokio::test]
    async fn test_study_deleted_triggers_exactly_one_reload() {
        let api = Arc::new(MemoryApi::with_items(vec![study("1", "ABC-001")]));
        let mut table = EntityTable::new(api.clone() as Arc<dyn ResourceApi<Study>>);
        table.reload().await.unwrap();
        let before = api.list_calls();

        let mut listener = LiveUpdateListener::new();
        let action = listener.handle(r#"{"type": "study_deleted"}"#).unwrap();
        assert!(apply_to(action, &mut table).await.is_none());

        assert_eq!(api.list_calls(), before + 1);
        assert_eq!(table.reload_count(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_replaces_cache_without_reload() {
        let api = Arc::new(MemoryApi::<Study>::default());
        let mut table = EntityTable::new(api.clone() as Arc<dyn ResourceApi<Study>>);

        let action = interpret(PushMessage {
            event_type: "studies_update".to_string(),
            data: Some(serde_json::json!([{"id": 1, "study_label": "ABC-001"}, {"id": 2, "study_label": "ABC-002"}])),
            message: None,
        })
        .unwrap();
        assert!(apply_to(action, &mut table).await.is_none());

        assert_eq!(api.list_calls(), 0);
        assert_eq!(table.items().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_snapshot_falls_back_to_reload() {
        let api = Arc::new(MemoryApi::with_items(vec![study("1", "ABC-001")]));
        let mut table = EntityTable::new(api.clone() as Arc<dyn ResourceApi<Study>>);

        let action = ListenerAction::ReplaceCache {
            kind: EntityKind::Study,
            data: serde_json::json!({"unexpected": true}),
        };
        assert!(apply_to(action, &mut table).await.is_none());
        assert_eq!(api.list_calls(), 1);
        assert_eq!(table.items().len(), 1);
    }
}

//! Non-interactive entity operations behind the CLI subcommands
//!
//! Each runner goes through the same `EntityTable`/`EntityForm` pair the
//! dashboard uses, so validation, duplicate checks and delete guards behave
//! identically on the command line.

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::api::{ApiClient, ResourceApi};
use crate::crud::{DeleteDecision, EntityForm, EntityTable, Severity, StudyReleaseGuard, SubmitOutcome};
use crate::dashboard::ui::fit;
use crate::models::{Column, DatabaseRelease, EntityId, Resource, Study};

/// A CRUD request for one entity type
#[derive(Debug, Clone)]
pub enum EntityOp {
    List { json: bool },
    Get { id: EntityId },
    Create { fields: Vec<(String, String)> },
    Update { id: EntityId, fields: Vec<(String, String)> },
    Delete { id: EntityId, yes: bool },
}

/// Table for `R` backed by the REST API
pub fn table_for<R: Resource>(client: &ApiClient) -> EntityTable<R> {
    EntityTable::new(Arc::new(client.resource::<R>()))
}

/// Study table with the database-release delete guard attached
pub fn study_table(client: &ApiClient) -> EntityTable<Study> {
    let releases: Arc<dyn ResourceApi<DatabaseRelease>> = Arc::new(client.resource::<DatabaseRelease>());
    table_for::<Study>(client).with_guard(Arc::new(StudyReleaseGuard::new(releases)))
}

pub struct EntityCommands<R: Resource> {
    table: EntityTable<R>,
}

impl<R: Resource> EntityCommands<R> {
    pub fn new(table: EntityTable<R>) -> Self {
        Self { table }
    }

    /// Run `op`. `confirm` is asked before a delete unless `yes` was given.
    pub async fn run<F>(&mut self, op: EntityOp, confirm: F) -> Result<String>
    where
        F: FnOnce(&str) -> bool,
    {
        match op {
            EntityOp::List { json } => self.list(json).await,
            EntityOp::Get { id } => self.get(&id).await,
            EntityOp::Create { fields } => self.create(&fields).await,
            EntityOp::Update { id, fields } => self.update(&id, &fields).await,
            EntityOp::Delete { id, yes } => self.delete(&id, |label| yes || confirm(label)).await,
        }
    }

    pub async fn list(&mut self, json: bool) -> Result<String> {
        self.table.reload().await?;
        let items = self.table.items();

        if json {
            return Ok(serde_json::to_string_pretty(items)?);
        }
        if items.is_empty() {
            return Ok(R::KIND.empty_label().to_string());
        }

        let columns = R::columns();
        let mut lines = Vec::with_capacity(items.len() + 1);
        lines.push(format_row(columns.iter().map(|c| c.header.to_string()), columns));
        for item in items {
            lines.push(format_row(item.cells().into_iter(), columns));
        }
        Ok(lines.join("\n"))
    }

    pub async fn get(&self, id: &EntityId) -> Result<String> {
        let item = self.table.api().get(id).await?;
        Ok(serde_json::to_string_pretty(&item)?)
    }

    pub async fn create(&mut self, fields: &[(String, String)]) -> Result<String> {
        // Loaded so the form can check label uniqueness
        self.table.reload().await?;
        let mut form = EntityForm::<R>::new();
        form.open_create();
        self.fill(&mut form, fields)?;
        self.submit(form).await
    }

    pub async fn update(&mut self, id: &EntityId, fields: &[(String, String)]) -> Result<String> {
        self.table.reload().await?;
        let current = self
            .table
            .find(id)
            .cloned()
            .ok_or_else(|| anyhow!("No {} with id {}", R::KIND.noun(), id))?;

        self.table.begin_edit(id.clone());
        let mut form = EntityForm::<R>::new();
        form.open_edit(&current);
        self.fill(&mut form, fields)?;
        self.submit(form).await
    }

    pub async fn delete<F>(&mut self, id: &EntityId, confirm: F) -> Result<String>
    where
        F: FnOnce(&str) -> bool,
    {
        self.table.reload().await?;
        match self.table.request_delete(id).await {
            DeleteDecision::Confirm { label, .. } => {
                if !confirm(&label) {
                    self.table.cancel_pending();
                    bail!("Deletion of {} '{}' cancelled", R::KIND.noun(), label);
                }
            }
            DeleteDecision::Blocked { label, dependents } => bail!(
                "Cannot delete {} '{}' while these items reference it: {}",
                R::KIND.noun(),
                label,
                dependents.join(", ")
            ),
            DeleteDecision::Failed(notification) => bail!(notification.message),
        }

        let notification = self.table.confirm_delete().await;
        match notification.severity {
            Severity::Error => bail!(notification.message),
            _ => Ok(notification.message),
        }
    }

    fn fill(&self, form: &mut EntityForm<R>, fields: &[(String, String)]) -> Result<()> {
        for (name, value) in fields {
            if !form.set(name, value.clone()) {
                let known: Vec<&str> = R::fields().iter().map(|f| f.name).collect();
                bail!(
                    "Unknown field '{}' for {}. Expected one of: {}",
                    name,
                    R::KIND.noun(),
                    known.join(", ")
                );
            }
        }
        Ok(())
    }

    async fn submit(&mut self, mut form: EntityForm<R>) -> Result<String> {
        match form.submit(&mut self.table).await {
            SubmitOutcome::Saved(notification) => {
                info!("{}", notification.message);
                Ok(notification.message)
            }
            SubmitOutcome::Rejected(messages) => bail!(messages.join("; ")),
            SubmitOutcome::Failed(message) => bail!(message),
        }
    }
}

fn format_row(cells: impl Iterator<Item = String>, columns: &[Column]) -> String {
    cells
        .zip(columns.iter())
        .map(|(text, column)| {
            let width = column.width as usize;
            let text = fit(&text, width);
            let padding = width.saturating_sub(UnicodeWidthStr::width(text.as_str()));
            format!("{}{}", text, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::memory::MemoryApi;
    use crate::models::{EntityKind, Package};

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

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_list_empty_and_json() {
        let api = Arc::new(MemoryApi::<Package>::default());
        let mut commands = EntityCommands::new(EntityTable::new(api.clone() as Arc<dyn ResourceApi<Package>>));
        assert_eq!(
            commands.list(false).await.unwrap(),
            EntityKind::Package.empty_label()
        );

        let api = Arc::new(MemoryApi::with_items(vec![study("1", "Alpha")]));
        let mut commands = EntityCommands::new(EntityTable::new(api as Arc<dyn ResourceApi<Study>>));
        let json = commands.list(true).await.unwrap();
        assert!(json.contains("\"study_label\": \"Alpha\""));

        let text = commands.list(false).await.unwrap();
        assert!(text.lines().nth(1).unwrap().contains("Alpha"));
    }

    #[test]
    fn test_rows_align_by_display_width() {
        let columns = [
            Column { header: "Name", field: "name", width: 8 },
            Column { header: "Note", field: "note", width: 4 },
        ];
        let wide = format_row(vec!["日本".to_string(), "x".to_string()].into_iter(), &columns);
        let narrow = format_row(vec!["ab".to_string(), "x".to_string()].into_iter(), &columns);
        assert_eq!(wide, "日本      x");
        assert_eq!(wide.find('x').map(|i| wide[..i].width()), narrow.find('x'));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_field_and_duplicates() {
        let api = Arc::new(MemoryApi::with_items(vec![study("1", "Alpha")]));
        let mut commands = EntityCommands::new(EntityTable::new(api.clone() as Arc<dyn ResourceApi<Study>>));

        let err = commands.create(&fields(&[("name", "Beta")])).await.unwrap_err();
        assert!(err.to_string().contains("Unknown field 'name'"));

        let err = commands.create(&fields(&[("study_label", "Alpha")])).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(api.create_calls(), 0);

        let message = commands.create(&fields(&[("study_label", "Beta")])).await.unwrap();
        assert_eq!(message, "Study 'Beta' created");
        assert_eq!(api.items().len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_id() {
        let api = Arc::new(MemoryApi::with_items(vec![study("1", "Alpha")]));
        let mut commands = EntityCommands::new(EntityTable::new(api as Arc<dyn ResourceApi<Study>>));
        let err = commands
            .update(&EntityId::new("9"), &fields(&[("study_label", "Gamma")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No study with id 9");
    }

    #[tokio::test]
    async fn test_delete_blocked_then_confirmed() {
        let studies = Arc::new(MemoryApi::with_items(vec![study("1", "Alpha"), study("2", "Beta")]));
        let releases: Arc<dyn ResourceApi<DatabaseRelease>> =
            Arc::new(MemoryApi::with_items(vec![release("10", "1", "R1")]));
        let table = EntityTable::new(studies.clone() as Arc<dyn ResourceApi<Study>>)
            .with_guard(Arc::new(StudyReleaseGuard::new(releases)));
        let mut commands = EntityCommands::new(table);

        let err = commands.delete(&EntityId::new("1"), |_| true).await.unwrap_err();
        assert!(err.to_string().contains("R1"));

        let err = commands.delete(&EntityId::new("2"), |_| false).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(studies.items().len(), 2);

        let op = EntityOp::Delete {
            id: EntityId::new("2"),
            yes: true,
        };
        let message = commands.run(op, |_| false).await.unwrap();
        assert_eq!(message, "Deleted study 'Beta'");
        assert_eq!(studies.items().len(), 1);
    }
}

//! Sequential bulk creation of packages from imported names

use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, FailureKind, ResourceApi};
use crate::crud::{Notification, Severity};
use crate::models::{Package, Resource};

/// Names shorter than this (after trimming) are skipped
pub const MIN_NAME_LENGTH: usize = 3;

/// Per-category counts of an import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub success: usize,
    pub duplicates: usize,
    pub too_short: usize,
    pub empty_content: usize,
    pub errors: usize,
    pub error_messages: Vec<String>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.success + self.duplicates + self.too_short + self.empty_content + self.errors
    }

    pub fn to_notification(&self) -> Notification {
        let severity = if self.errors > 0 {
            Severity::Error
        } else if self.success == 0 {
            Severity::Warning
        } else {
            Severity::Success
        };
        Notification::new(self.to_string(), severity)
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} of {} rows: {} duplicate, {} too short, {} empty, {} failed",
            self.success,
            self.total(),
            self.duplicates,
            self.too_short,
            self.empty_content,
            self.errors
        )
    }
}

/// Outcome for a single row
#[derive(Debug, Clone, PartialEq)]
enum RowOutcome {
    Created,
    Duplicate,
    TooShort,
    Empty,
    Failed(String),
}

/// Creates packages one row at a time, tracking names already seen
pub struct BulkImporter {
    api: Arc<dyn ResourceApi<Package>>,
    known: HashSet<String>,
}

impl BulkImporter {
    pub fn new(api: Arc<dyn ResourceApi<Package>>) -> Self {
        Self {
            api,
            known: HashSet::new(),
        }
    }

    /// Seed the duplicate check with names that already exist
    pub fn with_known<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known
            .extend(names.into_iter().map(|name| name.as_ref().trim().to_string()));
        self
    }

    /// Seed the duplicate check from the server's current package list
    pub async fn load_known(self) -> Result<Self, ApiError> {
        let existing = self.api.list().await?;
        debug!("Seeding import with {} existing packages", existing.len());
        Ok(self.with_known(existing.iter().map(|package| package.label().to_string())))
    }

    /// Process every row in order. No row failure stops the run.
    pub async fn run(&mut self, rows: Vec<Option<String>>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        info!("Importing {} package rows", rows.len());

        // Row numbers in messages count the header as row 1
        for (index, row) in rows.into_iter().enumerate() {
            match self.import_row(row).await {
                RowOutcome::Created => summary.success += 1,
                RowOutcome::Duplicate => summary.duplicates += 1,
                RowOutcome::TooShort => summary.too_short += 1,
                RowOutcome::Empty => summary.empty_content += 1,
                RowOutcome::Failed(message) => {
                    warn!("Row {}: {}", index + 2, message);
                    summary.errors += 1;
                    summary.error_messages.push(format!("Row {}: {}", index + 2, message));
                }
            }
        }

        info!("{}", summary);
        summary
    }

    async fn import_row(&mut self, row: Option<String>) -> RowOutcome {
        let name = match row.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return RowOutcome::Empty,
        };
        if name.chars().count() < MIN_NAME_LENGTH {
            return RowOutcome::TooShort;
        }
        if self.known.contains(&name) {
            return RowOutcome::Duplicate;
        }

        match self.api.create(&json!({ "package_name": name })).await {
            Ok(_) => {
                self.known.insert(name);
                RowOutcome::Created
            }
            Err(e) if e.kind() == FailureKind::Duplicate => {
                self.known.insert(name);
                RowOutcome::Duplicate
            }
            Err(e) => RowOutcome::Failed(e.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::memory::MemoryApi;
    use crate::models::EntityId;

    fn package(id: &str, name: &str) -> Package {
        Package {
            id: EntityId::new(id),
            package_name: name.to_string(),
            description: None,
        }
    }

    fn rows(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[tokio::test]
    async fn test_mixed_rows_are_counted_per_category() {
        let api = Arc::new(MemoryApi::with_items(vec![package("1", "ggplot2")]));
        let mut importer = BulkImporter::new(api.clone()).load_known().await.unwrap();

        let summary = importer
            .run(rows(&[None, Some("   "), Some("ab"), Some("ggplot2"), Some("dplyr")]))
            .await;

        assert_eq!(
            summary,
            ImportSummary {
                success: 1,
                duplicates: 1,
                too_short: 1,
                empty_content: 2,
                errors: 0,
                error_messages: vec![],
            }
        );
        assert_eq!(api.create_calls(), 1);
        assert_eq!(api.items().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicates_within_the_same_file() {
        let api = Arc::new(MemoryApi::<Package>::default());
        let mut importer = BulkImporter::new(api.clone());

        let summary = importer
            .run(rows(&[Some("survival"), Some(" survival "), Some("Survival")]))
            .await;

        assert_eq!(summary.success, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(api.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_server_already_exists_counts_as_duplicate() {
        let api = Arc::new(MemoryApi::<Package>::default());
        api.fail_next_create(400, r#"{"detail": "Package 'tidyr' already exists"}"#);
        api.fail_next_create(500, "database unavailable");
        let mut importer = BulkImporter::new(api.clone());

        let summary = importer.run(rows(&[Some("tidyr"), Some("purrr"), Some("readr")])).await;

        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.error_messages, vec!["Row 3: database unavailable".to_string()]);
        assert_eq!(summary.to_notification().severity, Severity::Error);
    }

    #[test]
    fn test_summary_text() {
        let summary = ImportSummary {
            success: 1,
            duplicates: 1,
            too_short: 1,
            empty_content: 2,
            errors: 0,
            error_messages: vec![],
        };
        assert_eq!(
            summary.to_string(),
            "Imported 1 of 5 rows: 1 duplicate, 1 too short, 2 empty, 0 failed"
        );
        assert_eq!(summary.to_notification().severity, Severity::Success);
    }
}

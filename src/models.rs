//! Entity types managed by the dashboard and the metadata that drives
//! their tables and forms.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The record types exposed by the REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Study,
    DatabaseRelease,
    Package,
    TextElement,
    Acronym,
    Backup,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Study,
        EntityKind::DatabaseRelease,
        EntityKind::Package,
        EntityKind::TextElement,
        EntityKind::Acronym,
        EntityKind::Backup,
        EntityKind::User,
    ];

    /// REST path segment under `/api/v1/`
    pub fn path(&self) -> &'static str {
        match self {
            EntityKind::Study => "studies",
            EntityKind::DatabaseRelease => "database-releases",
            EntityKind::Package => "packages",
            EntityKind::TextElement => "text-elements",
            EntityKind::Acronym => "acronyms",
            EntityKind::Backup => "backups",
            EntityKind::User => "users",
        }
    }

    /// Prefix of `<singular>_created|updated|deleted` push events
    pub fn singular_key(&self) -> &'static str {
        match self {
            EntityKind::Study => "study",
            EntityKind::DatabaseRelease => "database_release",
            EntityKind::Package => "package",
            EntityKind::TextElement => "text_element",
            EntityKind::Acronym => "acronym",
            EntityKind::Backup => "backup",
            EntityKind::User => "user",
        }
    }

    /// Prefix of `<plural>_update` push events
    pub fn plural_key(&self) -> &'static str {
        match self {
            EntityKind::Study => "studies",
            EntityKind::DatabaseRelease => "database_releases",
            EntityKind::Package => "packages",
            EntityKind::TextElement => "text_elements",
            EntityKind::Acronym => "acronyms",
            EntityKind::Backup => "backups",
            EntityKind::User => "users",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            EntityKind::Study => "Studies",
            EntityKind::DatabaseRelease => "Database Releases",
            EntityKind::Package => "Packages",
            EntityKind::TextElement => "Text Elements",
            EntityKind::Acronym => "Acronyms",
            EntityKind::Backup => "Backups",
            EntityKind::User => "Users",
        }
    }

    /// Lower-case singular noun used in messages
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Study => "study",
            EntityKind::DatabaseRelease => "database release",
            EntityKind::Package => "package",
            EntityKind::TextElement => "text element",
            EntityKind::Acronym => "acronym",
            EntityKind::Backup => "backup",
            EntityKind::User => "user",
        }
    }

    /// Indefinite article for `noun`
    pub fn article(&self) -> &'static str {
        match self {
            EntityKind::Acronym => "an",
            _ => "a",
        }
    }

    /// Plain empty-list message without key hints, shared by the CLI
    pub fn empty_label(&self) -> &'static str {
        match self {
            EntityKind::Study => "No studies found.",
            EntityKind::DatabaseRelease => "No database releases found.",
            EntityKind::Package => "No packages found.",
            EntityKind::TextElement => "No text elements found.",
            EntityKind::Acronym => "No acronyms found.",
            EntityKind::Backup => "No backups found.",
            EntityKind::User => "No users found.",
        }
    }

    /// Message shown by a dashboard table with no rows
    pub fn empty_message(&self) -> &'static str {
        match self {
            EntityKind::Study => "No studies found. Press 'n' to create one.",
            EntityKind::DatabaseRelease => "No database releases found. Press 'n' to create one.",
            EntityKind::Package => "No packages found. Press 'n' to create one or 'i' to import.",
            EntityKind::TextElement => "No text elements found. Press 'n' to create one.",
            EntityKind::Acronym => "No acronyms found. Press 'n' to create one.",
            EntityKind::Backup => "No backups found. Press 'n' to create one.",
            EntityKind::User => "No users found. Press 'n' to create one.",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        EntityKind::ALL
            .iter()
            .find(|kind| {
                kind.path() == normalized
                    || kind.singular_key().replace('_', "-") == normalized
            })
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown entity type '{}'. Expected one of: {}",
                    s,
                    EntityKind::ALL
                        .iter()
                        .map(|k| k.path())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Opaque server-assigned identifier
///
/// The API is free to use integer or string ids; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Uint(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => EntityId(n.to_string()),
            RawId::Uint(n) => EntityId(n.to_string()),
            RawId::Text(s) => EntityId(s),
        })
    }
}

/// Input type of a form field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    /// `YYYY-MM-DD`
    Date,
    /// One of a fixed set of options
    Choice(&'static [&'static str]),
    /// Write-only (passwords); never prefilled, required on create only
    Secret,
    /// Id of another entity
    Reference(EntityKind),
}

/// Form field definition
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// JSON property name
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, kind: FieldKind, required: bool) -> Self {
        Self { name, label, kind, required }
    }
}

/// Table column definition
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    /// JSON property name
    pub field: &'static str,
    pub width: u16,
}

impl Column {
    const fn new(header: &'static str, field: &'static str, width: u16) -> Self {
        Self { header, field, width }
    }
}

/// A CRUD-managed record type
pub trait Resource:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;
    /// JSON property holding the display label
    const LABEL_FIELD: &'static str;
    /// Whether labels are checked for uniqueness before submission
    const UNIQUE_LABEL: bool = false;

    fn id(&self) -> &EntityId;

    fn label(&self) -> &str;

    fn fields() -> &'static [FieldSpec];

    fn columns() -> &'static [Column];

    /// Text of a single JSON property, used to prefill edit forms
    fn field_text(&self, name: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(name)? {
            Value::Null => None,
            other => Some(display_value(other)),
        }
    }

    /// One display string per column
    fn cells(&self) -> Vec<String> {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        Self::columns()
            .iter()
            .map(|column| value.get(column.field).map(display_value).unwrap_or_default())
            .collect()
    }
}

/// Render a JSON scalar the way it should appear in a cell
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "yes".to_string() } else { "no".to_string() },
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    pub id: EntityId,
    pub study_label: String,
}

impl Resource for Study {
    const KIND: EntityKind = EntityKind::Study;
    const LABEL_FIELD: &'static str = "study_label";
    const UNIQUE_LABEL: bool = true;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.study_label
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::new("study_label", "Study Label", FieldKind::Text, true)];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Study Label", "study_label", 40),
        ];
        COLUMNS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseRelease {
    pub id: EntityId,
    pub study_id: EntityId,
    pub database_release_label: String,
}

impl Resource for DatabaseRelease {
    const KIND: EntityKind = EntityKind::DatabaseRelease;
    const LABEL_FIELD: &'static str = "database_release_label";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.database_release_label
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("study_id", "Study ID", FieldKind::Reference(EntityKind::Study), true),
            FieldSpec::new("database_release_label", "Release Label", FieldKind::Text, true),
        ];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Study", "study_id", 8),
            Column::new("Release Label", "database_release_label", 40),
        ];
        COLUMNS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub id: EntityId,
    pub package_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for Package {
    const KIND: EntityKind = EntityKind::Package;
    const LABEL_FIELD: &'static str = "package_name";
    const UNIQUE_LABEL: bool = true;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.package_name
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("package_name", "Package Name", FieldKind::Text, true),
            FieldSpec::new("description", "Description", FieldKind::Text, false),
        ];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Package Name", "package_name", 30),
            Column::new("Description", "description", 40),
        ];
        COLUMNS
    }
}

/// Categories a text element can belong to
pub const TEXT_ELEMENT_TYPES: &[&str] = &[
    "title",
    "footnote",
    "population_set",
    "acronyms_set",
    "ich_category",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextElement {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub element_type: String,
    pub label: String,
}

impl Resource for TextElement {
    const KIND: EntityKind = EntityKind::TextElement;
    const LABEL_FIELD: &'static str = "label";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("type", "Type", FieldKind::Choice(TEXT_ELEMENT_TYPES), true),
            FieldSpec::new("label", "Text", FieldKind::Text, true),
        ];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Type", "type", 16),
            Column::new("Text", "label", 60),
        ];
        COLUMNS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Acronym {
    pub id: EntityId,
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for Acronym {
    const KIND: EntityKind = EntityKind::Acronym;
    const LABEL_FIELD: &'static str = "key";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.key
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("key", "Acronym", FieldKind::Text, true),
            FieldSpec::new("value", "Expansion", FieldKind::Text, true),
            FieldSpec::new("description", "Description", FieldKind::Text, false),
        ];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Acronym", "key", 14),
            Column::new("Expansion", "value", 36),
            Column::new("Description", "description", 30),
        ];
        COLUMNS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    pub id: EntityId,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for Backup {
    const KIND: EntityKind = EntityKind::Backup;
    const LABEL_FIELD: &'static str = "filename";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.filename
    }

    // The server names the file; the only input is an optional note.
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::new("description", "Description", FieldKind::Text, false)];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("File", "filename", 32),
            Column::new("Created", "created_at", 20),
            Column::new("Size (bytes)", "size_bytes", 12),
            Column::new("Description", "description", 30),
        ];
        COLUMNS
    }
}

pub const USER_ROLES: &[&str] = &["admin", "editor", "viewer"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Resource for User {
    const KIND: EntityKind = EntityKind::User;
    const LABEL_FIELD: &'static str = "username";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.username
    }

    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::new("username", "Username", FieldKind::Text, true),
            FieldSpec::new("email", "Email", FieldKind::Text, false),
            FieldSpec::new("role", "Role", FieldKind::Choice(USER_ROLES), true),
            FieldSpec::new("password", "Password", FieldKind::Secret, true),
        ];
        FIELDS
    }

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("ID", "id", 8),
            Column::new("Username", "username", 20),
            Column::new("Email", "email", 30),
            Column::new("Role", "role", 10),
            Column::new("Status", "status", 10),
        ];
        COLUMNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accepts_numbers_and_strings() {
        let study: Study = serde_json::from_str(r#"{"id": 42, "study_label": "ABC-001"}"#).unwrap();
        assert_eq!(study.id.as_str(), "42");

        let study: Study = serde_json::from_str(r#"{"id": "s-7", "study_label": "ABC-002"}"#).unwrap();
        assert_eq!(study.id.as_str(), "s-7");
    }

    #[test]
    fn test_entity_kind_parsing() {
        assert_eq!("studies".parse::<EntityKind>().unwrap(), EntityKind::Study);
        assert_eq!("study".parse::<EntityKind>().unwrap(), EntityKind::Study);
        assert_eq!(
            "database_releases".parse::<EntityKind>().unwrap(),
            EntityKind::DatabaseRelease
        );
        assert_eq!("Text-Element".parse::<EntityKind>().unwrap(), EntityKind::TextElement);
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_empty_messages_share_the_plain_label() {
        for kind in EntityKind::ALL {
            assert!(kind.empty_message().starts_with(kind.empty_label()));
            assert!(!kind.empty_label().contains("Press"));
        }
    }

    #[test]
    fn test_cells_follow_columns() {
        let element: TextElement = serde_json::from_str(
            r#"{"id": 3, "type": "footnote", "label": "Percentages based on N."}"#,
        )
        .unwrap();
        assert_eq!(
            element.cells(),
            vec!["3".to_string(), "footnote".to_string(), "Percentages based on N.".to_string()]
        );
        assert_eq!(element.field_text("type").as_deref(), Some("footnote"));
    }

    #[test]
    fn test_missing_optional_fields_render_blank() {
        let backup: Backup = serde_json::from_str(r#"{"id": 1, "filename": "db-2024.sql"}"#).unwrap();
        let cells = backup.cells();
        assert_eq!(cells[1], "db-2024.sql");
        assert_eq!(cells[2], "");
        assert!(backup.field_text("description").is_none());
    }
}

//! Create/edit form: draft values, client-side validation and submission

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use tracing::{info, warn};

use crate::api::{ApiError, FailureKind};
use crate::crud::notification::Notification;
use crate::crud::table::EntityTable;
use crate::models::{EntityId, FieldKind, FieldSpec, Resource};

/// Whether the form creates a new record or edits an existing one
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Edit(EntityId),
}

/// Field values as typed, in field order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    values: Vec<(&'static str, String)>,
}

impl Draft {
    pub fn for_fields(fields: &[FieldSpec]) -> Self {
        Self {
            values: fields.iter().map(|field| (field.name, String::new())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> &str {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// Set a field value. Returns false for names the form does not have.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.values.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for (_, value) in &mut self.values {
            value.clear();
        }
    }

    /// JSON request body. Blank fields are left out on create. On edit a
    /// blank field is sent as null so the server clears it, except secrets,
    /// where blank means "keep the current value".
    pub fn to_payload(&self, fields: &[FieldSpec], mode: &FormMode) -> Value {
        let mut body = Map::new();
        for field in fields {
            let value = self.get(field.name).trim();
            if value.is_empty() {
                if matches!(mode, FormMode::Edit(_)) && field.kind != FieldKind::Secret {
                    body.insert(field.name.to_string(), Value::Null);
                }
                continue;
            }
            let json = match field.kind {
                FieldKind::Reference(_) => value
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(value.to_string())),
                _ => Value::String(value.to_string()),
            };
            body.insert(field.name.to_string(), json);
        }
        Value::Object(body)
    }
}

/// Outcome of client-side validation
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub valid: bool,
    pub messages: Vec<String>,
}

/// Outcome of a submit attempt
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Saved and the table reloaded; the form is closed
    Saved(Notification),
    /// Validation failed; nothing was sent
    Rejected(Vec<String>),
    /// The API refused the write; the form stays open
    Failed(String),
}

/// Draft state for one entity type's create/edit popup
pub struct EntityForm<R: Resource> {
    mode: FormMode,
    draft: Draft,
    open: bool,
    error: Option<String>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for EntityForm<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> EntityForm<R> {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            draft: Draft::for_fields(R::fields()),
            open: false,
            error: None,
            _marker: PhantomData,
        }
    }

    pub fn open_create(&mut self) {
        self.mode = FormMode::Create;
        self.draft = Draft::for_fields(R::fields());
        self.error = None;
        self.open = true;
    }

    /// Open prefilled with the record's current values. Secrets start blank.
    pub fn open_edit(&mut self, entity: &R) {
        self.mode = FormMode::Edit(entity.id().clone());
        self.draft = Draft::for_fields(R::fields());
        for field in R::fields() {
            if field.kind == FieldKind::Secret {
                continue;
            }
            if let Some(value) = entity.field_text(field.name) {
                self.draft.set(field.name, value);
            }
        }
        self.error = None;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.draft.clear();
        self.error = None;
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.error = None;
        self.draft.set(name, value)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => format!("New {}", R::KIND.noun()),
            FormMode::Edit(_) => format!("Edit {}", R::KIND.noun()),
        }
    }

    /// Message used for both the local and the server-side duplicate check
    pub fn duplicate_message(label: &str) -> String {
        format!(
            "{} {} with the label '{}' already exists",
            capitalize(R::KIND.article()),
            R::KIND.noun(),
            label
        )
    }

    fn is_required(&self, field: &FieldSpec) -> bool {
        match (field.kind, &self.mode) {
            (FieldKind::Secret, FormMode::Edit(_)) => false,
            _ => field.required,
        }
    }

    /// Check the draft against field rules and the cached list
    pub fn validate(&self, existing: &[R]) -> Validation {
        let mut messages = Vec::new();

        for field in R::fields() {
            let value = self.draft.get(field.name).trim();
            if value.is_empty() {
                if self.is_required(field) {
                    messages.push(format!("{} is required", field.label));
                }
                continue;
            }

            match field.kind {
                FieldKind::Date => {
                    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
                        messages.push(format!("{} must be a date (YYYY-MM-DD)", field.label));
                    }
                }
                FieldKind::Choice(options) => {
                    if !options.contains(&value) {
                        messages.push(format!(
                            "{} must be one of: {}",
                            field.label,
                            options.join(", ")
                        ));
                    }
                }
                FieldKind::Text | FieldKind::Secret | FieldKind::Reference(_) => {}
            }
        }

        if R::UNIQUE_LABEL {
            let label = self.draft.get(R::LABEL_FIELD).trim();
            let editing = match &self.mode {
                FormMode::Edit(id) => Some(id),
                FormMode::Create => None,
            };
            let taken = !label.is_empty()
                && existing
                    .iter()
                    .any(|item| item.label().trim() == label && Some(item.id()) != editing);
            if taken {
                messages.push(Self::duplicate_message(label));
            }
        }

        Validation {
            valid: messages.is_empty(),
            messages,
        }
    }

    /// Validate, send, and on success close the form and reload the table.
    /// `&mut self` is held across the request, so a second submit cannot
    /// start until this one has returned.
    pub async fn submit(&mut self, table: &mut EntityTable<R>) -> SubmitOutcome {
        let validation = self.validate(table.items());
        if !validation.valid {
            self.error = Some(validation.messages.join("; "));
            return SubmitOutcome::Rejected(validation.messages);
        }

        let payload = self.draft.to_payload(R::fields(), &self.mode);
        let api = table.api().clone();

        let result = match &self.mode {
            FormMode::Create => api.create(&payload).await,
            FormMode::Edit(id) => api.update(id, &payload).await,
        };

        match result {
            Ok(saved) => {
                let verb = match self.mode {
                    FormMode::Create => "created",
                    FormMode::Edit(_) => "updated",
                };
                info!("{} {} '{}'", R::KIND.noun(), verb, saved.label());
                self.close();
                table.cancel_pending();

                let message = format!("{} '{}' {}", capitalize(R::KIND.noun()), saved.label(), verb);
                match table.reload().await {
                    Ok(_) => SubmitOutcome::Saved(Notification::success(message)),
                    Err(e) => SubmitOutcome::Saved(Notification::warning(format!(
                        "{}, but the list could not be refreshed: {}",
                        message,
                        e.message()
                    ))),
                }
            }
            Err(e) => {
                let message = self.describe_failure(&e);
                warn!("Saving {} failed: {}", R::KIND.noun(), e);
                self.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn describe_failure(&self, error: &ApiError) -> String {
        match error.kind() {
            FailureKind::Duplicate => {
                Self::duplicate_message(self.draft.get(R::LABEL_FIELD).trim())
            }
            _ => error.message(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

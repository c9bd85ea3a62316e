//! The reusable CRUD component shared by every entity screen
//!
//! `EntityTable` owns the cached list and row actions, `EntityForm` owns the
//! create/edit draft, and `DeleteGuard` implementations add referential
//! checks before a delete is offered. All three talk to the API only through
//! `ResourceApi`, so the same code drives the dashboard, the CLI and the tests.

pub mod form;
pub mod guard;
pub mod notification;
pub mod table;

#[cfg(test)]
pub(crate) mod memory;

pub use form::{Draft, EntityForm, FormMode, SubmitOutcome, Validation};
pub use guard::{DeleteGuard, NoDependents, StudyReleaseGuard};
pub use notification::{Notification, NotificationCenter, Severity};
pub use table::{DeleteDecision, EntityTable, PendingOperation, TableState};

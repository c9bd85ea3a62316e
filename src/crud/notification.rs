//! User-facing notifications with severity, history and auto-clear

use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map a push notification `type` onto a severity. Unknown types are informational.
    pub fn from_event_type(event_type: &str) -> Self {
        let lower = event_type.to_lowercase();
        if lower.contains("error") || lower.contains("fail") {
            Severity::Error
        } else if lower.contains("warn") {
            Severity::Warning
        } else if lower.contains("success") {
            Severity::Success
        } else {
            Severity::Info
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Success => "✓",
            Severity::Info => "ℹ",
            Severity::Warning => "⚠",
            Severity::Error => "✗",
        }
    }
}

/// A message with severity and timestamp
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Local>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Local::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.symbol(), self.message)
    }
}

/// Holds the transient toast and a bounded history
pub struct NotificationCenter {
    current: Option<Notification>,
    history: Vec<Notification>,
    max_history: usize,
    auto_clear_timeout: Option<Duration>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self {
            current: None,
            history: Vec::new(),
            max_history: 100,
            auto_clear_timeout: None,
        }
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn with_auto_clear(mut self, timeout: Duration) -> Self {
        self.auto_clear_timeout = Some(timeout);
        self
    }

    /// Show a notification, moving the previous one to history
    pub fn push(&mut self, notification: Notification) {
        self.archive_current();
        self.current = Some(notification);
    }

    pub fn clear(&mut self) {
        self.archive_current();
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[Notification] {
        &self.history
    }

    /// Whether the current notification has outlived the timeout
    pub fn should_auto_clear(&self) -> bool {
        if let (Some(timeout), Some(current)) = (self.auto_clear_timeout, &self.current) {
            let elapsed = Local::now().signed_duration_since(current.timestamp);
            return elapsed.to_std().unwrap_or_default() > timeout;
        }
        false
    }

    /// Clear the toast if it has expired. Returns true when something was cleared.
    pub fn tick(&mut self) -> bool {
        if self.should_auto_clear() {
            self.clear();
            true
        } else {
            false
        }
    }

    fn archive_current(&mut self) {
        if let Some(current) = self.current.take() {
            self.history.push(current);
            if self.history.len() > self.max_history {
                self.history.remove(0);
            }
        }
    }
}

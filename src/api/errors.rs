//! REST API error types and failure classification

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error (status {status}): {message}")]
    Http {
        status: u16,
        message: String,
        /// Machine-readable `code` from the error body, when the server sends one
        code: Option<String>,
    },

    #[error("Failed to parse API response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Build an HTTP error from a non-2xx status and its body text
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();

        let detail = parsed.as_ref().and_then(|json| {
            ["detail", "message", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        });
        let code = parsed
            .as_ref()
            .and_then(|json| json.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let message = match detail {
            Some(detail) => detail,
            None if !body.trim().is_empty() => body.trim().to_string(),
            None => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        ApiError::Http {
            status: status.as_u16(),
            message,
            code,
        }
    }

    /// The user-facing message, without the status prefix
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Network { source, .. } => format!("Could not reach the API: {}", source),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Network { .. } => FailureKind::Network,
            ApiError::Http { status, message, code } => {
                if let Some(kind) = code.as_deref().and_then(FailureKind::from_code) {
                    return kind;
                }
                match classify_message(message) {
                    FailureKind::Other if *status == 404 => FailureKind::NotFound,
                    kind => kind,
                }
            }
            ApiError::Decode { .. } | ApiError::Invalid(_) => FailureKind::Other,
        }
    }
}

/// What went wrong, as far as the client can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    /// A uniqueness constraint rejected the write
    Duplicate,
    /// The record still has dependents (delete blocked)
    HasDependents,
    NotFound,
    Other,
}

impl FailureKind {
    fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "duplicate" | "conflict" | "unique_violation" => Some(FailureKind::Duplicate),
            "has_dependents" | "foreign_key_violation" => Some(FailureKind::HasDependents),
            "not_found" => Some(FailureKind::NotFound),
            _ => None,
        }
    }
}

/// Best-effort mapping of free-form server messages.
///
/// The server makes no promise about this wording; keep every substring
/// rule in this one function.
pub fn classify_message(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if ["duplicate", "unique", "already exists"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        FailureKind::Duplicate
    } else if lower.contains("associated item") {
        FailureKind::HasDependents
    } else {
        FailureKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_field_becomes_message() {
        let err = ApiError::from_response(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Study with label 'ABC' already exists"}"#,
        );
        assert_eq!(err.message(), "Study with label 'ABC' already exists");
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.kind(), FailureKind::Duplicate);
    }

    #[test]
    fn test_plain_body_and_empty_body() {
        let err = ApiError::from_response(StatusCode::INTERNAL_SERVER_ERROR, "boom\n");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.kind(), FailureKind::Other);

        let err = ApiError::from_response(StatusCode::NOT_FOUND, "");
        assert_eq!(err.message(), "Not Found");
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_structured_code_wins_over_wording() {
        let err = ApiError::from_response(
            StatusCode::CONFLICT,
            r#"{"detail": "cannot delete", "code": "has_dependents"}"#,
        );
        assert_eq!(err.kind(), FailureKind::HasDependents);
    }

    #[test]
    fn test_classify_message_patterns() {
        assert_eq!(classify_message("UNIQUE constraint failed"), FailureKind::Duplicate);
        assert_eq!(classify_message("duplicate key value"), FailureKind::Duplicate);
        assert_eq!(
            classify_message("Cannot delete study with associated items"),
            FailureKind::HasDependents
        );
        assert_eq!(classify_message("validation failed"), FailureKind::Other);
    }
}

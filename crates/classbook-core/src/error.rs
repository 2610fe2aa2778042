//! Error types.
//!
//! `ApiError` represents failures when talking to the journal API. It is
//! defined here, next to the `JournalApi` trait, so services and views can
//! downcast an `anyhow::Error` and classify it by status instead of matching
//! on strings.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::Id;

/// Errors that can occur when interacting with the journal API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API returned a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<ErrorDetail>,
    },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build an HTTP error from a status and the raw response body.
    ///
    /// The body's `detail` field is parsed when it is JSON; otherwise the
    /// raw text becomes the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail);
        let message = match &detail {
            Some(d) => d.flatten(),
            None if body.trim().is_empty() => "no response body".to_string(),
            None => body.trim().to_string(),
        };
        ApiError::Http {
            status,
            message,
            detail,
        }
    }

    /// The HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 404 or 405: the endpoint is absent on this backend revision.
    pub fn is_missing_endpoint(&self) -> bool {
        matches!(self.status(), Some(404) | Some(405))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// The server-provided detail, flattened to one line.
    pub fn detail_message(&self) -> Option<String> {
        match self {
            ApiError::Http {
                detail: Some(d), ..
            } => Some(d.flatten()),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<ErrorDetail>,
}

/// The `detail` member of an error body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<FieldError>),
    Other(Value),
}

/// One entry of a request-validation failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
}

impl FieldError {
    fn location(&self) -> String {
        self.loc
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl ErrorDetail {
    /// Collapse the detail into a single user-facing line.
    pub fn flatten(&self) -> String {
        match self {
            ErrorDetail::Message(m) => m.clone(),
            ErrorDetail::Validation(errors) => {
                let parts: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.location(), e.msg))
                    .collect();
                format!("validation error: {}", parts.join(", "))
            }
            ErrorDetail::Other(v) => v.to_string(),
        }
    }
}

/// Map any failure to the string shown in an error banner.
///
/// Uses the server's detail when the error carries one, the fallback otherwise.
pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(api) => api.detail_message().unwrap_or_else(|| fallback.to_string()),
        None => fallback.to_string(),
    }
}

/// Returns `true` if the error is an `ApiError` for a missing endpoint.
pub fn is_missing_endpoint(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_missing_endpoint)
}

/// Guards checked before an entry form may be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("the entry form is not open")]
    NotOpen,

    #[error("a submission is already in progress")]
    AlreadySubmitting,

    #[error("select a subject")]
    SubjectMissing,

    #[error("select a class")]
    ClassMissing,

    #[error("enter the lesson topic")]
    TopicEmpty,

    #[error("enter the homework")]
    HomeworkEmpty,

    #[error("enter the lesson date")]
    DateMissing,

    #[error("attendance incomplete: {marked} of {roster} students marked")]
    AttendanceIncomplete { marked: usize, roster: usize },

    #[error("attendance lists student {0}, who is not in the selected class")]
    NotOnRoster(Id),

    #[error("unknown subject {0}")]
    UnknownSubject(Id),

    #[error("unknown class {0}")]
    UnknownClass(Id),
}

/// Failure of an entry form submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected before any request was made.
    #[error(transparent)]
    Invalid(#[from] FormError),

    /// The API call failed.
    #[error(transparent)]
    Api(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_becomes_message() {
        let err = ApiError::from_response(400, r#"{"detail": "Class already exists"}"#);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.detail_message().as_deref(), Some("Class already exists"));
        assert_eq!(err.to_string(), "API error (HTTP 400): Class already exists");
    }

    #[test]
    fn validation_detail_is_flattened() {
        let body = r#"{"detail": [
            {"loc": ["body", "topic"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["body", "attendance", 12], "msg": "invalid status"}
        ]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(
            err.detail_message().unwrap(),
            "validation error: body.topic: field required, body.attendance.12: invalid status"
        );
    }

    #[test]
    fn non_json_body_has_no_detail() {
        let err = ApiError::from_response(500, "Internal Server Error");
        assert!(err.detail_message().is_none());
        assert!(err.to_string().contains("Internal Server Error"));

        let any: anyhow::Error = err.into();
        assert_eq!(user_message(&any, "Login failed"), "Login failed");
    }

    #[test]
    fn user_message_prefers_detail() {
        let any: anyhow::Error =
            ApiError::from_response(401, r#"{"detail": "Incorrect username or password"}"#).into();
        assert_eq!(
            user_message(&any, "Login failed"),
            "Incorrect username or password"
        );
        assert_eq!(
            user_message(&anyhow::anyhow!("disk full"), "Login failed"),
            "Login failed"
        );
    }

    #[test]
    fn missing_endpoint_classification() {
        let not_found: anyhow::Error = ApiError::from_response(404, "").into();
        let not_allowed: anyhow::Error = ApiError::from_response(405, "").into();
        let server: anyhow::Error = ApiError::from_response(500, "").into();
        assert!(is_missing_endpoint(&not_found));
        assert!(is_missing_endpoint(&not_allowed));
        assert!(!is_missing_endpoint(&server));
        assert!(!is_missing_endpoint(&anyhow::Error::from(ApiError::Timeout(30))));
    }

    #[test]
    fn attendance_message_names_the_shortfall() {
        let err = FormError::AttendanceIncomplete {
            marked: 2,
            roster: 3,
        };
        assert!(err.to_string().starts_with("attendance incomplete"));
        assert!(err.to_string().contains("2 of 3"));
    }
}

//! Error types for the vector database client.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum Error {
    /// The service answered with a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never completed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response carried a body the client could not understand
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An embedding of the wrong width was supplied
    #[error("embedding must be {dim}-dimensional, got {0}", dim = crate::api::EMBEDDING_DIM)]
    InvalidEmbedding(usize),

    /// Required configuration is missing
    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// An error response from the service, carrying the HTTP status and whatever
/// detail the body held.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub detail: ErrorDetail,
}

impl ApiError {
    pub(crate) fn from_body(status_code: StatusCode, body: &str) -> Self {
        Self {
            status_code,
            detail: ErrorDetail::parse(status_code, body),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "api error (status {}): {}",
            self.status_code.as_u16(),
            self.detail
        )?;
        if let ErrorDetail::Fields(errors) = &self.detail {
            for err in errors {
                write!(f, "\n  {}: {}", err.location(), err.msg)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// The decoded body of an error response.
#[derive(Debug, Clone)]
pub enum ErrorDetail {
    /// A validation failure: the per-field error records the service returned
    Fields(Vec<FieldError>),
    /// Any other JSON body, kept verbatim
    Json(Value),
    /// A body that was empty or not JSON
    Text(String),
}

impl ErrorDetail {
    /// Field records are only recognized on a 422; every other body is kept as
    /// parsed JSON, falling back to raw text.
    fn parse(status_code: StatusCode, body: &str) -> Self {
        if body.is_empty() {
            return Self::Text(
                status_code
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string(),
            );
        }

        if status_code == StatusCode::UNPROCESSABLE_ENTITY {
            if let Ok(fields) = serde_json::from_str::<Vec<FieldError>>(body) {
                return Self::Fields(fields);
            }
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(body.to_string()),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(fields) => f.write_str(&serde_json::to_string(fields).unwrap()),
            Self::Json(value) => f.write_str(&value.to_string()),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One field-error record from a validation failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Path to the offending field, e.g. `["body", "name"]`
    pub loc: Vec<Value>,
    pub msg: String,
}

impl FieldError {
    /// Dotted path of the offending field, e.g. `body.name`.
    pub fn location(&self) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let body = r#"[{"loc": ["body", "name"], "msg": "field required"}]"#;
        let err = ApiError::from_body(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert!(matches!(err.detail, ErrorDetail::Fields(ref fields) if fields.len() == 1));

        let message = err.to_string();
        assert!(message.contains("loc"));
        assert!(message.contains("body.name"));
        assert!(message.contains("field required"));
    }

    #[test]
    fn location_joins_non_string_segments() {
        let body = r#"[{"loc": ["body", "chunks", 0, "text"], "msg": "field required"}]"#;
        let err = ApiError::from_body(StatusCode::UNPROCESSABLE_ENTITY, body);

        let ErrorDetail::Fields(fields) = &err.detail else {
            panic!("expected field records, got {:?}", err.detail);
        };
        assert_eq!(fields[0].location(), "body.chunks.0.text");
    }

    #[test]
    fn validation_error_with_unexpected_shape_stays_json() {
        let body = r#"{"detail": "name must not be empty"}"#;
        let err = ApiError::from_body(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert!(matches!(err.detail, ErrorDetail::Json(_)));
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn not_found_keeps_status_and_json_detail() {
        let err = ApiError::from_body(StatusCode::NOT_FOUND, r#"{"detail": "chunk not found"}"#);

        assert_eq!(err.status_code, StatusCode::NOT_FOUND);
        assert_eq!(err.status_code.as_u16(), 404);
        assert!(err.to_string().starts_with("api error (status 404):"));
    }

    #[test]
    fn unparseable_body_falls_back_to_raw_text() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "<html>nginx</html>");

        assert!(matches!(err.detail, ErrorDetail::Text(ref text) if text == "<html>nginx</html>"));
    }

    #[test]
    fn empty_body_uses_the_status_reason() {
        let err = ApiError::from_body(StatusCode::NOT_FOUND, "");

        assert!(matches!(err.detail, ErrorDetail::Text(ref text) if text == "Not Found"));
    }
}

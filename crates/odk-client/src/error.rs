//! Error classification for order service calls.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Fallback text when neither the server nor the transport said anything useful.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Errors an [`crate::OrderService`] / [`crate::TicketService`] call may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// HTTP 404. Terminal for the screen that asked.
    NotFound { detail: Option<String> },
    /// Any other non-2xx answer (validation or business-rule rejection,
    /// server error). `detail` is the body's `detail` field when present.
    Rejected { status: u16, detail: Option<String> },
    /// Network or transport failure; the request may not have reached the server.
    Transport(String),
    /// A 2xx body could not be decoded into the expected shape.
    Decode(String),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }

    /// Human-readable message: the server's `detail` first, then the
    /// transport-level message, then [`UNEXPECTED_ERROR`].
    pub fn user_message(&self) -> String {
        let msg = match self {
            ServiceError::NotFound { detail } => {
                detail.clone().unwrap_or_else(|| "Not found".to_string())
            }
            ServiceError::Rejected {
                detail: Some(d), ..
            } if !d.trim().is_empty() => d.clone(),
            ServiceError::Rejected { status, .. } => {
                format!("Request failed with status code {status}")
            }
            ServiceError::Transport(m) | ServiceError::Decode(m) => m.clone(),
        };
        if msg.trim().is_empty() {
            UNEXPECTED_ERROR.to_string()
        } else {
            msg
        }
    }

    /// Classify a non-2xx response from its status and raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        if status == 404 {
            ServiceError::NotFound { detail }
        } else {
            ServiceError::Rejected { status, detail }
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NotFound { detail } => match detail {
                Some(d) => write!(f, "not found: {d}"),
                None => write!(f, "not found"),
            },
            ServiceError::Rejected { status, detail } => match detail {
                Some(d) => write!(f, "rejected status={status}: {d}"),
                None => write!(f, "rejected status={status}"),
            },
            ServiceError::Transport(m) => write!(f, "transport error: {m}"),
            ServiceError::Decode(m) => write!(f, "decode error: {m}"),
        }
    }
}

impl std::error::Error for ServiceError {}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Pull `detail` out of an error body.
///
/// FastAPI-style services send a string for business errors and an array of
/// field errors for validation failures; the latter is kept as compact JSON.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_used_verbatim() {
        let e = ServiceError::from_status(400, r#"{"detail":"Invalid transition from confirmed"}"#);
        assert_eq!(e.user_message(), "Invalid transition from confirmed");
        assert!(!e.is_not_found());
    }

    #[test]
    fn not_found_classified_from_404() {
        let e = ServiceError::from_status(404, r#"{"detail":"Order not found"}"#);
        assert!(e.is_not_found());
        assert_eq!(e.user_message(), "Order not found");
    }

    #[test]
    fn missing_detail_falls_back_to_status_message() {
        let e = ServiceError::from_status(502, "<html>bad gateway</html>");
        assert_eq!(e.user_message(), "Request failed with status code 502");
    }

    #[test]
    fn validation_array_detail_kept_as_json() {
        let e = ServiceError::from_status(422, r#"{"detail":[{"loc":["body","amount"]}]}"#);
        assert_eq!(e.user_message(), r#"[{"loc":["body","amount"]}]"#);
    }

    #[test]
    fn empty_transport_message_uses_generic_text() {
        assert_eq!(ServiceError::Transport(String::new()).user_message(), UNEXPECTED_ERROR);
        assert_eq!(
            ServiceError::Transport("connection refused".into()).user_message(),
            "connection refused"
        );
    }

    #[test]
    fn display_mentions_class() {
        let e = ServiceError::Rejected {
            status: 409,
            detail: Some("busy".into()),
        };
        assert_eq!(e.to_string(), "rejected status=409: busy");
    }
}

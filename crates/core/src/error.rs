//! Uniform error model surfaced by every API call.

use serde_json::Value;
use thiserror::Error;

/// Result type used across the client.
pub type ApiResult<T> = Result<T, ApiError>;

/// Business failure reported inside a well-formed response envelope.
///
/// Carries the raw envelope for diagnostics; callers should present
/// `message` verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationError {
    pub code: String,
    pub message: String,
    pub api: String,
    pub platform: String,
    pub envelope: Value,
}

impl core::fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.code)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Client-side error taxonomy.
///
/// Every variant is rejected back to the caller with the same shape: a
/// machine-readable [`ApiError::code`] and a human-readable
/// [`ApiError::message`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// The server violated the envelope protocol (not an object, missing or
    /// empty `ret`, undecodable `data`).
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Envelope-level business failure (`<CODE>::<message>`).
    #[error("{0}")]
    Application(Box<ApplicationError>),

    /// HTTP 401 without a usable envelope. The session has been cleared.
    #[error("session expired, please sign in again")]
    Unauthorized,

    /// HTTP 403 without a usable envelope.
    #[error("access forbidden")]
    Forbidden,

    /// Any other non-success HTTP status without a usable envelope.
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be constructed on the client side.
    #[error("invalid request: {0}")]
    RequestConfig(String),
}

impl ApiError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn request_config(msg: impl Into<String>) -> Self {
        Self::RequestConfig(msg.into())
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &str {
        match self {
            ApiError::InvalidResponse(_) => "INVALID_RESPONSE",
            ApiError::Application(e) => &e.code,
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::Status { .. } => "HTTP_ERROR",
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::RequestConfig(_) => "REQUEST_CONFIG_ERROR",
        }
    }

    /// Message of the uniform error shape. Application errors return the
    /// envelope message verbatim, which may be empty.
    pub fn message(&self) -> String {
        match self {
            ApiError::Application(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// Text for the single user notification; never empty.
    pub fn notice(&self) -> String {
        self.to_string()
    }

    /// HTTP status that produced this error, for status-driven variants.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn as_application(&self) -> Option<&ApplicationError> {
        match self {
            ApiError::Application(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_error(code: &str, message: &str) -> ApiError {
        ApiError::Application(Box::new(ApplicationError {
            code: code.to_string(),
            message: message.to_string(),
            api: "/auth/login".to_string(),
            platform: "LICENSE".to_string(),
            envelope: Value::Null,
        }))
    }

    #[test]
    fn application_error_surfaces_code_and_message_verbatim() {
        let err = app_error("ERROR", "bad input");
        assert_eq!(err.code(), "ERROR");
        assert_eq!(err.message(), "bad input");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn application_error_without_message_keeps_it_empty() {
        let err = app_error("ERROR", "");
        assert_eq!(err.code(), "ERROR");
        assert_eq!(err.message(), "");
        // The notification still has something to show.
        assert_eq!(err.notice(), "ERROR");
    }

    #[test]
    fn status_driven_variants_expose_status() {
        assert_eq!(ApiError::Unauthorized.status(), Some(401));
        assert_eq!(ApiError::Forbidden.status(), Some(403));
        let err = ApiError::Status {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.code(), "HTTP_ERROR");
        assert!(err.message().contains("boom"));
    }
}

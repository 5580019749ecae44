// Error handling module
// Defines the error taxonomy surfaced by the client

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while talking to the Scribe backend
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request was rejected and there is no session to refresh
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// The refresh exchange failed; the session has been cleared
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Transport-level failure (DNS, connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any non-2xx response other than the recovered 401
    #[error("backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    /// The persistent session store failed
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// Internal error (unclonable request body, malformed header value)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status carried by the error, when there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            ApiError::Unauthenticated(_) | ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// True when the error means the caller must re-authenticate
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthenticated(_) | ApiError::SessionExpired)
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ApiError::Unauthenticated("no session".to_string());
        assert_eq!(err.to_string(), "authentication required: no session");

        let err = ApiError::SessionExpired;
        assert_eq!(err.to_string(), "session expired, please log in again");

        let err = ApiError::Backend {
            status: 404,
            message: "Post not found".to_string(),
        };
        assert_eq!(err.to_string(), "backend error: 404 - Post not found");
    }

    #[test]
    fn test_internal_error_message() {
        let err = ApiError::Internal(anyhow::anyhow!("something went wrong"));
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_status_mapping() {
        let err = ApiError::Backend {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(ApiError::SessionExpired.status(), Some(401));
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("internal")).status(),
            None
        );
    }

    #[test]
    fn test_requires_login() {
        assert!(ApiError::SessionExpired.requires_login());
        assert!(ApiError::Unauthenticated("rejected".to_string()).requires_login());
        assert!(!ApiError::Backend {
            status: 403,
            message: "forbidden".to_string()
        }
        .requires_login());
    }
}

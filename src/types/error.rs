//! Error types for Wicket
//!
//! Every failure of the token lifecycle is one variant of [`WicketError`].
//! The HTTP layer maps each variant to a distinct status code and a stable
//! machine-readable `code` string.

use hyper::StatusCode;

/// Main error type for Wicket operations
#[derive(Debug, thiserror::Error)]
pub enum WicketError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Purchase does not belong to the requesting buyer")]
    OwnershipMismatch,

    #[error("Malformed download token")]
    Malformed,

    #[error("Download token signature is invalid")]
    BadSignature,

    #[error("Download link has expired")]
    Expired,

    #[error("Download link has already been used")]
    AlreadyUsed,

    #[error("Token limit of {0} reached for this purchase")]
    ReissueLimit(u32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WicketError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::OwnershipMismatch => StatusCode::FORBIDDEN,
            Self::Malformed => StatusCode::BAD_REQUEST,
            Self::BadSignature => StatusCode::UNAUTHORIZED,
            Self::Expired => StatusCode::GONE,
            Self::AlreadyUsed => StatusCode::CONFLICT,
            Self::ReissueLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for response bodies and audit records
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::OwnershipMismatch => "ownership_mismatch",
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::AlreadyUsed => "already_used",
            Self::ReissueLimit(_) => "reissue_limit",
            Self::Database(_) => "database",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
            Self::Http(_) => "http",
            Self::Config(_) => "config",
        }
    }

    /// Whether this error belongs to the token lifecycle taxonomy, as opposed
    /// to an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::NotFound(_)
                | Self::OwnershipMismatch
                | Self::Malformed
                | Self::BadSignature
                | Self::Expired
                | Self::AlreadyUsed
                | Self::ReissueLimit(_)
        )
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for WicketError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for WicketError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for WicketError {
    fn from(err: hyper::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<mongodb::error::Error> for WicketError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for WicketError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::BadSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                Self::Internal(format!("Signing key error: {}", err))
            }
            _ => Self::Malformed,
        }
    }
}

/// Result type alias for Wicket operations
pub type Result<T> = std::result::Result<T, WicketError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rejections_map_to_distinct_statuses() {
        let errors = [
            WicketError::NotFound("purchase".into()),
            WicketError::OwnershipMismatch,
            WicketError::Malformed,
            WicketError::BadSignature,
            WicketError::Expired,
            WicketError::AlreadyUsed,
        ];

        let statuses: HashSet<_> = errors.iter().map(|e| e.status_code()).collect();
        assert_eq!(statuses.len(), errors.len());
    }

    #[test]
    fn test_infrastructure_errors_are_not_rejections() {
        assert!(!WicketError::Database("down".into()).is_rejection());
        assert!(!WicketError::Timeout("store".into()).is_rejection());
        assert!(WicketError::AlreadyUsed.is_rejection());
    }

    #[test]
    fn test_jwt_error_mapping() {
        use jsonwebtoken::errors::{Error, ErrorKind};

        let sig: WicketError = Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(sig, WicketError::BadSignature));

        let shape: WicketError = Error::from(ErrorKind::InvalidToken).into();
        assert!(matches!(shape, WicketError::Malformed));
    }
}

//! Caller-facing error type shared by the route handlers.

use thiserror::Error;

/// Error surfaced to the route handlers that sit in front of the record store.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
///
/// The inner strings are for logs. Only [`ServiceError::user_message`] should
/// ever reach an end user.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed, e.g. a required field was missing.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested record does not exist or is not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Encrypting or decrypting a protected field failed.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// A required dependency (the encryption secret, the database) is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`ErrorResponse`](crate::protocol::ErrorResponse).
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::EncryptionFailure(_) => "internal_error",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Generic message safe to show to an end user.
    ///
    /// Crypto and configuration failures collapse into the same wording so that
    /// nothing about the failing layer leaks out.
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "the request could not be processed",
            ServiceError::NotFound(_) => "the requested resource does not exist",
            ServiceError::EncryptionFailure(_)
            | ServiceError::Unavailable(_)
            | ServiceError::Internal(_) => "the operation failed, please try again later",
        }
    }
}

//! Shared error type across askrelay crates.

use thiserror::Error;

/// Caller-facing error codes (stable API, carried in `meta["error"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No peer matched the scope when the request was submitted.
    NoClients,
    /// No reply arrived before the deadline.
    Timeout,
    /// The caller (or an operator) withdrew the request.
    Cancelled,
    /// A reply or lookup referenced an id that is not pending.
    UnknownRequest,
    /// Chat peers do not share a scope token.
    ScopeMismatch,
    /// Chat peer is not connected.
    NotFound,
    /// A reply carried a content item that failed validation.
    InvalidContent,
    /// Request id already pending.
    DuplicateRequest,
    /// Malformed input.
    BadRequest,
    /// Internal server error.
    Internal,
}

impl ErrorCode {
    /// String representation used in `meta["error"]`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoClients => "no_clients",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::UnknownRequest => "unknown_request",
            ErrorCode::ScopeMismatch => "scope_mismatch",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidContent => "invalid_content",
            ErrorCode::DuplicateRequest => "duplicate_request",
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no peers available to handle the request")]
    NoClients,
    #[error("request timed out after {0} seconds")]
    Timeout(u64),
    #[error("{0}")]
    Cancelled(String),
    #[error("unknown request: {0}")]
    UnknownRequest(String),
    #[error("peers do not share a scope token")]
    ScopeMismatch,
    #[error("peer not found: {0}")]
    NotFound(String),
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("duplicate request id: {0}")]
    DuplicateRequest(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RelayError {
    /// Map the error to its stable caller-facing code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RelayError::NoClients => ErrorCode::NoClients,
            RelayError::Timeout(_) => ErrorCode::Timeout,
            RelayError::Cancelled(_) => ErrorCode::Cancelled,
            RelayError::UnknownRequest(_) => ErrorCode::UnknownRequest,
            RelayError::ScopeMismatch => ErrorCode::ScopeMismatch,
            RelayError::NotFound(_) => ErrorCode::NotFound,
            RelayError::InvalidContent(_) => ErrorCode::InvalidContent,
            RelayError::DuplicateRequest(_) => ErrorCode::DuplicateRequest,
            RelayError::BadRequest(_) => ErrorCode::BadRequest,
            RelayError::Internal(_) => ErrorCode::Internal,
        }
    }
}

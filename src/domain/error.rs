use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kind tags the Adaptive Queue's retry classifier reads.
///
/// These mirror the error kinds enumerated in the finalization pipeline's
/// error handling design: each kind carries a fixed retry disposition and
/// HTTP status mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayError {
    /// Malformed input; never retried; 400.
    Validation(String),
    /// No such record; 404.
    NotFound(String),
    /// Recognized operation the router has no effector for; 400, non-retriable.
    Unsupported(String),
    /// Recognized-but-unimplemented chain family; 501, non-retriable.
    NotImplemented(String),
    /// Effector returned 429; retried with emphasis, honoring `retry_after` when present.
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },
    /// Timeouts, connection errors, upstream 5xx; retried.
    TransientNetwork(String),
    /// CAS miss at terminal commit; non-retriable at this layer, the record already moved.
    StateConflict(String),
    /// `maxTime` has passed; non-retriable, terminal `failed`.
    Expired(String),
    /// Programming error; escalates to process-level graceful shutdown.
    Fatal(String),
    /// Structured chain-effector error with enrichment fields preserved for the classifier.
    Blockchain(BlockchainError),
    /// Underlying storage failure.
    Storage(StorageError),
    /// Security/authn/authz failure on an admin endpoint.
    Security(SecurityError),
    /// Catch-all for errors that don't need their own variant.
    Generic(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Validation(msg) => write!(f, "Validation error: {msg}"),
            RelayError::NotFound(msg) => write!(f, "Not found: {msg}"),
            RelayError::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            RelayError::NotImplemented(msg) => write!(f, "Not implemented: {msg}"),
            RelayError::RateLimited { message, .. } => write!(f, "Rate limited: {message}"),
            RelayError::TransientNetwork(msg) => write!(f, "Transient network error: {msg}"),
            RelayError::StateConflict(msg) => write!(f, "State conflict: {msg}"),
            RelayError::Expired(msg) => write!(f, "Expired: {msg}"),
            RelayError::Fatal(msg) => write!(f, "Fatal error: {msg}"),
            RelayError::Blockchain(e) => write!(f, "Blockchain error: {e}"),
            RelayError::Storage(e) => write!(f, "Storage error: {e}"),
            RelayError::Security(e) => write!(f, "Security error: {e}"),
            RelayError::Generic(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl ResponseError for RelayError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, body) = self.to_http_response();
        HttpResponse::build(status_code).json(body)
    }
}

impl RelayError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        use actix_web::http::StatusCode;
        let (status_code, error_type) = match self {
            RelayError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            RelayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            RelayError::Unsupported(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED"),
            RelayError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
            RelayError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            RelayError::TransientNetwork(_) => (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT_NETWORK"),
            RelayError::StateConflict(_) => (StatusCode::CONFLICT, "STATE_CONFLICT"),
            RelayError::Expired(_) => (StatusCode::GONE, "EXPIRED"),
            RelayError::Fatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "FATAL"),
            RelayError::Blockchain(e) => return e.to_http_response(),
            RelayError::Storage(e) => return e.to_http_response(),
            RelayError::Security(e) => return e.to_http_response(),
            RelayError::Generic(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        (status_code, serde_json::json!({
            "error": error_type,
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    /// Whether the Adaptive Queue's retry classifier should retry this error.
    pub fn is_retriable(&self) -> bool {
        match self {
            RelayError::Validation(_)
            | RelayError::NotFound(_)
            | RelayError::Unsupported(_)
            | RelayError::NotImplemented(_)
            | RelayError::StateConflict(_)
            | RelayError::Expired(_)
            | RelayError::Fatal(_) => false,
            RelayError::RateLimited { .. } | RelayError::TransientNetwork(_) => true,
            RelayError::Blockchain(e) => e.is_retriable(),
            RelayError::Storage(_) => true,
            RelayError::Security(_) => false,
            RelayError::Generic(_) => true,
        }
    }

    /// `Retry-After` seconds, when the error carries one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RelayError::RateLimited { retry_after_secs, .. } => *retry_after_secs,
            RelayError::Blockchain(e) => e.retry_after_secs,
            _ => None,
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::Generic(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Storage(StorageError::IO(err.to_string()))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Validation(format!("invalid JSON: {err}"))
    }
}

impl From<hex::FromHexError> for RelayError {
    fn from(err: hex::FromHexError) -> Self {
        RelayError::Validation(format!("invalid hex: {err}"))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            RelayError::TransientNetwork(err.to_string())
        } else if let Some(status) = err.status() {
            if status.as_u16() == 429 {
                RelayError::RateLimited { message: err.to_string(), retry_after_secs: None }
            } else if status.is_client_error() {
                RelayError::Validation(err.to_string())
            } else {
                RelayError::TransientNetwork(err.to_string())
            }
        } else {
            RelayError::TransientNetwork(err.to_string())
        }
    }
}

/// Structured blockchain-effector error. Preserves the fields the reference
/// chain's HTTP error bodies carry so the retry classifier can distinguish
/// 429 (retry, respecting `Retry-After`) from 400-class (never retry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainError {
    pub kind: BlockchainErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub detail: Option<String>,
    pub result_codes: Option<serde_json::Value>,
    pub operation_codes: Option<Vec<String>>,
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BlockchainErrorKind {
    InvalidChainId,
    UnsupportedChain,
    InvalidAddress,
    RpcError,
    NetworkError,
    SubmissionRejected,
    NotImplemented,
}

impl BlockchainError {
    pub fn new(kind: BlockchainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            detail: None,
            result_codes: None,
            operation_codes: None,
            retry_after_secs: None,
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self.kind {
            BlockchainErrorKind::UnsupportedChain
            | BlockchainErrorKind::NotImplemented
            | BlockchainErrorKind::InvalidChainId
            | BlockchainErrorKind::InvalidAddress => false,
            BlockchainErrorKind::SubmissionRejected => {
                matches!(self.status, Some(429)) || matches!(self.status, Some(s) if s >= 500)
            }
            BlockchainErrorKind::RpcError | BlockchainErrorKind::NetworkError => true,
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl BlockchainError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        use actix_web::http::StatusCode;
        let status_code = match self.kind {
            BlockchainErrorKind::InvalidChainId
            | BlockchainErrorKind::UnsupportedChain
            | BlockchainErrorKind::InvalidAddress => StatusCode::BAD_REQUEST,
            BlockchainErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            BlockchainErrorKind::RpcError | BlockchainErrorKind::NetworkError => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            BlockchainErrorKind::SubmissionRejected => self
                .status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_REQUEST),
        };

        (status_code, serde_json::json!({
            "error": format!("{:?}", self.kind),
            "message": self.message,
            "detail": self.detail,
            "result_codes": self.result_codes,
            "operation_codes": self.operation_codes,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

// Storage Errors (kept from the teacher's taxonomy, trimmed to what the
// content-addressed Store actually raises).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageError {
    IO(String),
    Serialization(String),
    TransactionNotFound(String),
    CorruptedData(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::IO(msg) => write!(f, "IO error: {msg}"),
            StorageError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            StorageError::TransactionNotFound(id) => write!(f, "Transaction not found: {id}"),
            StorageError::CorruptedData(msg) => write!(f, "Corrupted data: {msg}"),
        }
    }
}

impl StorageError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        let status_code = match self {
            StorageError::TransactionNotFound(_) => actix_web::http::StatusCode::NOT_FOUND,
            _ => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status_code, serde_json::json!({
            "error": "STORAGE_ERROR",
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

// Security Errors (kept for the admin-endpoint auth guard).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SecurityError {
    AuthenticationFailed(String),
    AuthorizationFailed(String),
    InvalidToken(String),
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {msg}"),
            SecurityError::AuthorizationFailed(msg) => write!(f, "Authorization failed: {msg}"),
            SecurityError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
        }
    }
}

impl SecurityError {
    pub fn to_http_response(&self) -> (actix_web::http::StatusCode, serde_json::Value) {
        let status_code = match self {
            SecurityError::AuthorizationFailed(_) => actix_web::http::StatusCode::FORBIDDEN,
            _ => actix_web::http::StatusCode::UNAUTHORIZED,
        };

        (status_code, serde_json::json!({
            "error": "SECURITY_ERROR",
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_not_retriable() {
        assert!(!RelayError::Validation("bad input".into()).is_retriable());
        assert!(!RelayError::Expired("past maxTime".into()).is_retriable());
        assert!(!RelayError::Unsupported("no effector".into()).is_retriable());
    }

    #[test]
    fn transient_and_rate_limited_are_retriable() {
        assert!(RelayError::TransientNetwork("timeout".into()).is_retriable());
        assert!(RelayError::RateLimited { message: "429".into(), retry_after_secs: Some(5) }
            .is_retriable());
    }

    #[test]
    fn blockchain_submission_rejected_retry_depends_on_status() {
        let mut e = BlockchainError::new(BlockchainErrorKind::SubmissionRejected, "rejected");
        e.status = Some(400);
        assert!(!e.is_retriable());
        e.status = Some(429);
        assert!(e.is_retriable());
        e.status = Some(503);
        assert!(e.is_retriable());
    }
}

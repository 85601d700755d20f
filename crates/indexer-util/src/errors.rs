use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Unified error type for the indexing proxy, covering every wire-visible
/// failure kind plus the I/O and database failures that map to InternalError.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Malformed path, bad content-length, malformed JAR, checksum mismatch,
    /// snapshot on a non-snapshot project, unknown build type, and similar.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// HTTP Basic Auth failed.
    #[error("unauthorized")]
    Unauthorized,

    /// GET for non-metadata, PUT of metadata without a prior lock, missing
    /// or unknown session.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Backend reported not-found, or the resource is unknown to the proxy.
    #[error("not found: {0}")]
    NotFound(String),

    /// Artifact slot already uploaded.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Content-Length missing.
    #[error("length required")]
    LengthRequired,

    /// Content-Length exceeds the maximum file size.
    #[error("payload too large")]
    PayloadTooLarge,

    /// Maven metadata is currently locked by another session.
    #[error("locked")]
    Locked,

    /// The session has already failed; publisher must restart with a fresh
    /// cookie.
    #[error("failed dependency")]
    FailedDependency,

    /// Database, backend, or changelog synthesis failure.
    #[error("internal error: {0}")]
    InternalError(String),

    /// Storage backend transport failure.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// Storage backend timed out.
    #[error("gateway timeout: {0}")]
    GatewayTimeout(String),
}

impl IndexerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IndexerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IndexerError::Unauthorized => StatusCode::UNAUTHORIZED,
            IndexerError::Forbidden(_) => StatusCode::FORBIDDEN,
            IndexerError::NotFound(_) => StatusCode::NOT_FOUND,
            IndexerError::Conflict(_) => StatusCode::CONFLICT,
            IndexerError::LengthRequired => StatusCode::LENGTH_REQUIRED,
            IndexerError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            IndexerError::Locked => StatusCode::LOCKED,
            IndexerError::FailedDependency => StatusCode::FAILED_DEPENDENCY,
            IndexerError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IndexerError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            IndexerError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Every non-2xx response marks the owning session as failed, per the
    /// post-handler rule. NotFound on a GET is exempted by the caller, not
    /// here, since it depends on request context this type doesn't carry.
    pub fn fails_session(&self) -> bool {
        true
    }
}

impl From<std::io::Error> for IndexerError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => IndexerError::NotFound(e.to_string()),
            _ => IndexerError::InternalError(e.to_string()),
        }
    }
}

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(%status, error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}

/// Convenience alias, mirroring `std::result::Result` with [`IndexerError`]
/// fixed as the error type.
pub type IndexerResult<T> = Result<T, IndexerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec() {
        assert_eq!(IndexerError::Locked.status_code(), StatusCode::LOCKED);
        assert_eq!(
            IndexerError::FailedDependency.status_code(),
            StatusCode::FAILED_DEPENDENCY
        );
        assert_eq!(
            IndexerError::LengthRequired.status_code(),
            StatusCode::LENGTH_REQUIRED
        );
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: IndexerError = io.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}

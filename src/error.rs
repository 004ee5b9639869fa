use std::time::Duration;

use thiserror::Error;

/// Reasons a request path segment is rejected as a content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentIdError {
    #[error("Content identifier is empty")]
    Empty,

    #[error("Content identifier exceeds {max} bytes (got {len})")]
    TooLong { len: usize, max: usize },

    /// Leading dots, `..`, separators or NUL bytes
    #[error("Content identifier contains a traversal pattern: {0:?}")]
    Traversal(String),

    #[error("Content identifier contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Errors reading markdown sources from the views directory.
#[derive(Debug, Clone, Error)]
pub enum ContentError {
    /// Reading a file that was expected to exist failed
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// Listing a content directory failed
    #[error("Failed to list {path}: {message}")]
    List { path: String, message: String },

    /// Writing rendered output failed (static build)
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Errors talking to the external identity service.
///
/// The access gate never surfaces these to the caller; any of them means
/// "not a member".
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a status the client does not understand
    #[error("Unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider rejected the OAuth exchange
    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Identity request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors during the publish pass.
#[derive(Debug, Clone, Error)]
pub enum DeployError {
    /// Walking the build output tree failed
    #[error("Failed to walk {path}: {message}")]
    Walk { path: String, message: String },

    /// Reading a file body failed
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// The object store rejected the PUT
    #[error("Failed to upload {key}: {message}")]
    Upload { key: String, message: String },

    /// The CDN purge call failed
    #[error("CDN invalidation failed: {0}")]
    Invalidation(String),
}

/// Errors decoding a session cookie.
///
/// Like [`IdentityError`], these never reach the caller: an undecodable
/// cookie is an empty session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Malformed session cookie")]
    Malformed,

    #[error("Invalid session signature")]
    InvalidSignature,

    #[error("Session issued at {issued_at} is older than {max_age}s")]
    Expired { issued_at: u64, max_age: u64 },
}

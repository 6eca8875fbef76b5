//! Lifecycle errors and viewer protocol outcomes.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session name length {len} exceeds maximum {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("hostname length {len} exceeds maximum {max}")]
    HostnameTooLong { len: usize, max: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TraceError {
    #[error("session {session_id} is closing; cannot create trace at `{subpath}`")]
    SessionVanishing { session_id: u64, subpath: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChunkError {
    #[error("trace chunk {id} is closed")]
    Closed { id: u64 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DetachError {
    #[error("viewer is not attached to session {session_id}")]
    NotAttached { session_id: u64 },
}

/// Outcome of a viewer attach. Not an error: each value maps 1:1 onto a
/// live viewer protocol return code (`LTTNG_VIEWER_ATTACH_OK`, `_ALREADY`,
/// `_UNK`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachStatus {
    Ok,
    AlreadyAttached,
    /// The session vanished or its trace chunk could not be copied; viewers
    /// handle this as if the session no longer existed.
    Unknown,
}

use thiserror::Error;

use crate::model::ModelError;
use crate::relay::{ChunkError, DetachError, SessionError, TraceError};
use crate::tsdl::EmitError;

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over canonical capability errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Detach(#[from] DetachError),
}

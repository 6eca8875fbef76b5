//! Construction errors of the trace object model.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("field location path is empty")]
    EmptyFieldLocation,

    #[error("clock class `{name}` is already defined on this trace class")]
    DuplicateClockClass { name: String },

    #[error("stream class id {id} is already defined on this trace class")]
    DuplicateStreamClass { id: u64 },

    #[error("event class id {id} is already defined on stream class {stream_class_id}")]
    DuplicateEventClass { id: u64, stream_class_id: u64 },

    #[error(
        "stream class {id} has a field mapped to the default clock but no default clock class name"
    )]
    MissingDefaultClockClass { id: u64 },
}

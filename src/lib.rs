#![forbid(unsafe_code)]

//! Core of a live-trace relay: the concurrent object graph a relay daemon
//! manages (sessions, traces, streams, viewers), the typed model of a CTF
//! trace, and the TSDL 1.8 metadata serializer consumers and viewers rely
//! on. Socket loops, wire framing and on-disk layout live in external
//! collaborators.

pub mod config;
pub mod epoch;
pub mod error;
pub mod model;
pub mod relay;
pub mod telemetry;
pub mod tsdl;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the working set at crate root for convenience.
pub use crate::config::Limits;
pub use crate::epoch::{LookupTable, RefCount, Reclaim, StrongRef, WeakLookup, epoch_read};
pub use crate::model::{
    Abi, ByteOrder, ClockClass, EventClass, Field, FieldType, StreamClass, TraceClass,
};
pub use crate::relay::{
    AttachStatus, CtfTrace, Registry, RelaySession, RelayStream, StreamState, TraceChunk,
    ViewerSession, ViewerStream,
};
pub use crate::tsdl::{MetadataSink, TsdlEmitter};

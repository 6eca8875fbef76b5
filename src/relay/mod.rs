//! Runtime lifecycle of the relay: sessions, traces, streams and viewers.
//!
//! Ownership flows upward: a stream references its trace, a trace its
//! session. Teardown flows the other way through the close protocols, and
//! every lookup table hands out references only through the epoch-guarded
//! acquire path.

pub mod chunk;
pub mod error;
pub mod registry;
pub mod session;
pub mod stream;
pub mod trace;
pub mod viewer;

pub use chunk::TraceChunk;
pub use error::{AttachStatus, ChunkError, DetachError, SessionError, TraceError};
pub use registry::Registry;
pub use session::RelaySession;
pub use stream::{RelayStream, StreamState};
pub use trace::CtfTrace;
pub use viewer::{ViewerSession, ViewerStream};

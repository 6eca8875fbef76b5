//! CTF 1.8 TSDL serialization of the trace object model.
//!
//! Output is bit-stable against established readers (Babeltrace 1.x/2.x):
//! identifier escaping, indentation and fragment layout are part of the
//! contract and must not be "improved".

pub mod emitter;
pub mod escape;

use std::io;

use thiserror::Error;

pub use emitter::TsdlEmitter;
pub use escape::{escape_env_string, escape_identifier};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    #[error("invalid zero-length identifier in trace description")]
    InvalidIdentifier,

    #[error("field maps to the default clock but the stream class names no default clock class")]
    MissingDefaultClock,

    #[error("failed to append metadata fragment")]
    Append(#[from] io::Error),
}

/// Receives top-level TSDL fragments in emission order. Fragments are
/// self-terminating; concatenation yields a valid TSDL document.
pub trait MetadataSink {
    fn append(&mut self, fragment: &str) -> io::Result<()>;
}

/// In-memory accumulation, the common case for the session daemon's
/// metadata cache.
impl MetadataSink for String {
    fn append(&mut self, fragment: &str) -> io::Result<()> {
        self.push_str(fragment);
        Ok(())
    }
}

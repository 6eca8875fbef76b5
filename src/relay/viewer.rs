//! Viewer sessions and viewer streams.
//!
//! A viewer session is one live-reading client. Attaching to a relay
//! session transfers a session reference into the viewer's session list;
//! viewer streams shadow relay streams and are reachable both from the
//! global viewer-streams table and from the viewer session that created
//! them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::epoch::{RefCount, Reclaim, StrongRef};

use super::chunk::TraceChunk;
use super::error::{AttachStatus, DetachError};
use super::registry::Registry;
use super::session::RelaySession;
use super::stream::RelayStream;

/// Shadow of a relay stream for one viewer. Two references keep it alive:
/// the global table's and the viewer session's; dropping both tears it
/// down.
pub struct ViewerStream {
    id: u64,
    stream: StrongRef<RelayStream>,
    refcount: RefCount,
}

impl ViewerStream {
    /// Creates the shadow and publishes it in the global table. A metadata
    /// stream's shadow is also published on the owning trace so consumers
    /// can hand viewers the metadata stream directly.
    pub(crate) fn create(
        registry: &Arc<Registry>,
        stream: &StrongRef<RelayStream>,
    ) -> StrongRef<Self> {
        let viewer_stream = StrongRef::new(Self {
            id: stream.id(),
            stream: stream.clone(),
            refcount: RefCount::new(),
        });
        registry.viewer_streams().insert(viewer_stream.clone());
        if stream.is_metadata() {
            stream.trace().set_viewer_metadata_stream(&viewer_stream);
        }
        tracing::debug!(id = viewer_stream.id, "created viewer stream");
        viewer_stream
    }

    /// Shares the shadowed relay stream's id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stream(&self) -> &RelayStream {
        &self.stream
    }
}

impl Reclaim for ViewerStream {
    fn refcount(&self) -> &RefCount {
        &self.refcount
    }

    fn unpublish(&self) {
        // The global table holds a counted reference, so reaching zero
        // means the entry is already gone; only the trace's metadata slot
        // may still point here.
        if self.stream.is_metadata() {
            self.stream.trace().clear_viewer_metadata_stream(self.id);
        }
    }
}

impl Drop for ViewerStream {
    fn drop(&mut self) {
        tracing::debug!(id = self.id, "destroying viewer stream");
    }
}

pub struct ViewerSession {
    registry: Arc<Registry>,
    current_trace_chunk: Mutex<Option<TraceChunk>>,
    /// Attached relay sessions; each entry owns a session reference.
    sessions: Mutex<Vec<StrongRef<RelaySession>>>,
    /// Viewer-session references of the streams this viewer reads.
    streams: Mutex<Vec<StrongRef<ViewerStream>>>,
}

impl ViewerSession {
    pub fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: Arc::clone(registry),
            current_trace_chunk: Mutex::new(None),
            sessions: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Attaches this viewer to `session`, under the session lock.
    ///
    /// On success the session is inserted into the viewer's session list
    /// with a transferred reference and the session's current trace chunk
    /// is copied for the viewer. A chunk copy failure reports `Unknown`:
    /// the live protocol has no generic attach error, and viewers already
    /// handle vanished sessions.
    pub fn attach(&self, session: &StrongRef<RelaySession>) -> AttachStatus {
        let mut state = session.lock_state();

        if state.viewer_attached {
            return AttachStatus::AlreadyAttached;
        }

        let viewer_chunk = match &state.current_trace_chunk {
            Some(chunk) => match chunk.copy_for_viewer() {
                Ok(copy) => Some(copy),
                Err(err) => {
                    tracing::debug!(
                        session_id = session.id(),
                        session_name = session.session_name(),
                        %err,
                        "failed to copy the session's trace chunk for the viewer, \
                         reporting the session as unknown"
                    );
                    return AttachStatus::Unknown;
                }
            },
            None => None,
        };

        state.viewer_attached = true;
        *self.current_trace_chunk.lock() = viewer_chunk;
        // Ownership of this reference is transferred to the list.
        self.sessions.lock().push(session.clone());

        tracing::debug!(
            session_id = session.id(),
            session_name = session.session_name(),
            "viewer attached to session"
        );
        AttachStatus::Ok
    }

    /// Detaches this viewer from `session`, under the session lock,
    /// releasing the list's session reference.
    pub fn detach(&self, session: &RelaySession) -> Result<(), DetachError> {
        let removed;
        {
            let mut state = session.lock_state();
            if !state.viewer_attached {
                return Err(DetachError::NotAttached {
                    session_id: session.id(),
                });
            }
            state.viewer_attached = false;

            let mut sessions = self.sessions.lock();
            let index = sessions.iter().position(|entry| entry.id() == session.id());
            removed = index.map(|index| sessions.swap_remove(index));
        }
        drop(removed);

        tracing::debug!(session_id = session.id(), "viewer detached from session");
        Ok(())
    }

    /// Whether this viewer is attached to `session`.
    pub fn is_attached(&self, session: &RelaySession) -> bool {
        let state = session.lock_state();
        if !state.viewer_attached {
            return false;
        }
        self.sessions
            .lock()
            .iter()
            .any(|entry| entry.id() == session.id())
    }

    pub fn current_trace_chunk(&self) -> Option<TraceChunk> {
        self.current_trace_chunk.lock().clone()
    }

    /// Creates the viewer-side shadow of `stream` and tracks it in this
    /// viewer session.
    pub fn track_stream(&self, stream: &StrongRef<RelayStream>) -> StrongRef<ViewerStream> {
        let viewer_stream = ViewerStream::create(&self.registry, stream);
        self.streams.lock().push(viewer_stream.clone());
        viewer_stream
    }

    /// Releases ownership of every stream of the given session and
    /// detaches the viewer from it.
    fn close_one_session(&self, session: &StrongRef<RelaySession>) {
        for viewer_stream in self.registry.viewer_streams().snapshot() {
            if viewer_stream.stream().trace().session().id() != session.id() {
                continue;
            }
            // The stream has reached one of its lifetime end conditions:
            // drop the table's reference and this viewer's reference.
            self.registry.viewer_streams().remove(viewer_stream.id());
            self.streams
                .lock()
                .retain(|entry| entry.id() != viewer_stream.id());
        }

        *self.current_trace_chunk.lock() = None;
        let _ = self.detach(session);
    }

    /// Closes the viewer: every attached session is released.
    pub fn close(&self) {
        let sessions: Vec<_> = self.sessions.lock().clone();
        for session in &sessions {
            self.close_one_session(session);
        }
    }
}

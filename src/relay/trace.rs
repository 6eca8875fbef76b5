//! CTF traces within a relay session, keyed by destination subpath.

use parking_lot::Mutex;

use crate::epoch::{RefCount, Reclaim, StrongRef, WeakLookup, epoch_read};

use super::error::TraceError;
use super::session::RelaySession;
use super::stream::RelayStream;
use super::viewer::ViewerStream;

/// There is no open/close pair for a trace: it is created on first use and
/// lives exactly as long as streams reference it. When the last stream puts
/// its reference the trace unpublishes itself from the session's table and
/// is destroyed after the grace period.
pub struct CtfTrace {
    id: u64,
    subpath: String,
    session: StrongRef<RelaySession>,
    refcount: RefCount,
    /// Publication references of the streams currently part of the trace.
    streams: Mutex<Vec<StrongRef<RelayStream>>>,
    /// Viewer-side shadow of the metadata stream, once one is published.
    viewer_metadata_stream: Mutex<Option<WeakLookup<ViewerStream>>>,
}

impl CtfTrace {
    /// Returns the trace at `subpath`, creating it if needed. Creation is
    /// exactly-once under concurrent callers: losers discard their
    /// allocation and share the winner's object.
    pub fn get_by_path_or_create(
        session: &StrongRef<RelaySession>,
        subpath: &str,
    ) -> Result<StrongRef<CtfTrace>, TraceError> {
        if let Some(trace) = session.ctf_traces().get(subpath) {
            return Ok(trace);
        }
        tracing::debug!(subpath, "trace path not found, creating");

        // A closing session must not grow new traces.
        if session.connection_closed() {
            return Err(TraceError::SessionVanishing {
                session_id: session.id(),
                subpath: subpath.to_string(),
            });
        }

        let trace = StrongRef::new(CtfTrace {
            id: session.registry().allocate_trace_id(),
            subpath: subpath.to_string(),
            session: session.clone(),
            refcount: RefCount::new(),
            streams: Mutex::new(Vec::new()),
            viewer_metadata_stream: Mutex::new(None),
        });

        match session
            .ctf_traces()
            .publish_or_acquire(subpath.to_string(), &trace)
        {
            Some(winner) => {
                // Lost the creation race; drop the fresh allocation.
                drop(trace);
                Ok(winner)
            }
            None => {
                tracing::debug!(
                    id = trace.id,
                    session_id = session.id(),
                    session_name = session.session_name(),
                    hostname = session.hostname(),
                    subpath,
                    "created trace"
                );
                Ok(trace)
            }
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    pub fn session(&self) -> &RelaySession {
        &self.session
    }

    /// Closes every stream currently linked to the trace. Idempotent; the
    /// trace's own lifetime is driven by its streams, so there is no
    /// self-reference to put here.
    pub fn close(&self) {
        for stream in self.streams() {
            stream.try_close();
        }
    }

    /// Snapshot of the streams currently linked.
    pub fn streams(&self) -> Vec<StrongRef<RelayStream>> {
        self.streams.lock().clone()
    }

    pub(crate) fn link_stream(&self, stream: StrongRef<RelayStream>) {
        self.streams.lock().push(stream);
    }

    pub(crate) fn unlink_stream(&self, stream_id: u64) -> Option<StrongRef<RelayStream>> {
        let mut streams = self.streams.lock();
        let index = streams.iter().position(|stream| stream.id() == stream_id)?;
        Some(streams.swap_remove(index))
    }

    /// The viewer-side metadata stream, if one has been published and is
    /// still alive.
    pub fn viewer_metadata_stream(&self) -> Option<StrongRef<ViewerStream>> {
        epoch_read(|| self.viewer_metadata_stream.lock().as_ref()?.try_acquire())
    }

    pub(crate) fn set_viewer_metadata_stream(&self, viewer_stream: &StrongRef<ViewerStream>) {
        *self.viewer_metadata_stream.lock() = Some(StrongRef::downgrade(viewer_stream));
    }

    pub(crate) fn clear_viewer_metadata_stream(&self, viewer_stream_id: u64) {
        let mut slot = self.viewer_metadata_stream.lock();
        if slot
            .as_ref()
            .is_some_and(|entry| entry.peek().id() == viewer_stream_id)
        {
            *slot = None;
        }
    }
}

impl Reclaim for CtfTrace {
    fn refcount(&self) -> &RefCount {
        &self.refcount
    }

    fn unpublish(&self) {
        self.session
            .ctf_traces()
            .remove_if(&self.subpath, |trace| trace.id == self.id);
    }
}

impl Drop for CtfTrace {
    fn drop(&mut self) {
        // Streams hold trace references; by the time the trace is destroyed
        // they have all been closed and put back.
        debug_assert!(self.streams.lock().is_empty(), "trace destroyed with live streams");
        tracing::debug!(id = self.id, subpath = self.subpath, "destroying trace");
    }
}

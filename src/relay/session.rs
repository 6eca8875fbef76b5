//! Relay sessions: one per tracing session announced by a session daemon.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::epoch::{LookupTable, RefCount, Reclaim, StrongRef, WeakLookup, epoch_read};

use super::chunk::TraceChunk;
use super::error::SessionError;
use super::registry::Registry;
use super::stream::RelayStream;
use super::trace::CtfTrace;

pub(crate) struct SessionState {
    pub(crate) viewer_attached: bool,
    pub(crate) connection_closed: bool,
    pub(crate) aborted: bool,
    pub(crate) current_trace_chunk: Option<TraceChunk>,
}

/// Owned by the control connection that announced it. Traces keep the
/// session alive through their own references; the connection's reference
/// is released by [`RelaySession::close`].
pub struct RelaySession {
    id: u64,
    session_name: String,
    hostname: String,
    live_timer: Duration,
    snapshot: bool,
    sessiond_uuid: Uuid,
    registry: Arc<Registry>,
    refcount: RefCount,
    ctf_traces: LookupTable<String, CtfTrace>,
    state: Mutex<SessionState>,
    /// Streams announced but not yet published into a trace's stream list.
    unpublished_streams: Mutex<Vec<WeakLookup<RelayStream>>>,
}

impl RelaySession {
    pub fn create(
        registry: &Arc<Registry>,
        session_name: &str,
        hostname: &str,
        live_timer: Duration,
        snapshot: bool,
        sessiond_uuid: Uuid,
        current_trace_chunk: Option<TraceChunk>,
    ) -> Result<StrongRef<Self>, SessionError> {
        let limits = registry.limits();
        if session_name.len() > limits.max_session_name_len {
            tracing::warn!(len = session_name.len(), "session name exceeds maximal allowed length");
            return Err(SessionError::NameTooLong {
                len: session_name.len(),
                max: limits.max_session_name_len,
            });
        }
        if hostname.len() > limits.max_hostname_len {
            tracing::warn!(len = hostname.len(), "hostname exceeds maximal allowed length");
            return Err(SessionError::HostnameTooLong {
                len: hostname.len(),
                max: limits.max_hostname_len,
            });
        }

        let id = registry.allocate_session_id();
        let session = StrongRef::new(Self {
            id,
            session_name: session_name.to_string(),
            hostname: hostname.to_string(),
            live_timer,
            snapshot,
            sessiond_uuid,
            registry: Arc::clone(registry),
            refcount: RefCount::new(),
            ctf_traces: LookupTable::new(),
            state: Mutex::new(SessionState {
                viewer_attached: false,
                connection_closed: false,
                aborted: false,
                current_trace_chunk,
            }),
            unpublished_streams: Mutex::new(Vec::new()),
        });

        let displaced = registry.sessions().publish_or_acquire(id, &session);
        debug_assert!(displaced.is_none(), "session id allocated twice");

        tracing::debug!(id, session_name, hostname, "created relay session");
        Ok(session)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn live_timer(&self) -> Duration {
        self.live_timer
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    pub fn sessiond_uuid(&self) -> Uuid {
        self.sessiond_uuid
    }

    pub fn viewer_attached(&self) -> bool {
        self.state.lock().viewer_attached
    }

    pub fn connection_closed(&self) -> bool {
        self.state.lock().connection_closed
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    pub fn current_trace_chunk(&self) -> Option<TraceChunk> {
        self.state.lock().current_trace_chunk.clone()
    }

    /// Installed by the chunk registry collaborator on rotation.
    pub fn set_current_trace_chunk(&self, chunk: Option<TraceChunk>) {
        self.state.lock().current_trace_chunk = chunk;
    }

    /// Looks up a trace of this session without creating it.
    pub fn trace_by_path(&self, subpath: &str) -> Option<StrongRef<CtfTrace>> {
        self.ctf_traces.get(subpath)
    }

    pub(crate) fn ctf_traces(&self) -> &LookupTable<String, CtfTrace> {
        &self.ctf_traces
    }

    pub(crate) fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    pub(crate) fn add_unpublished_stream(&self, stream: &StrongRef<RelayStream>) {
        self.unpublished_streams
            .lock()
            .push(StrongRef::downgrade(stream));
    }

    pub(crate) fn remove_unpublished_stream(&self, stream_id: u64) {
        self.unpublished_streams
            .lock()
            .retain(|entry| entry.peek().id() != stream_id);
    }

    /// Tears the session down from the control side: every trace is closed
    /// (which closes its streams), streams that were never published are
    /// closed directly, and the reference from [`RelaySession::create`] is
    /// released.
    pub fn close(this: StrongRef<Self>) {
        {
            let mut state = this.state.lock();
            tracing::debug!(
                id = this.id,
                already_closed = state.connection_closed,
                "closing relay session"
            );
            state.connection_closed = true;
        }

        for trace in this.ctf_traces.acquire_all() {
            trace.close();
        }

        let unpublished: Vec<_> = this.unpublished_streams.lock().clone();
        for entry in unpublished {
            if let Some(stream) = epoch_read(|| entry.try_acquire()) {
                stream.try_close();
            }
        }

        drop(this);
    }

    /// Marks the session aborted; readers of live data stop serving it.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        tracing::debug!(id = self.id, "aborting relay session");
        state.aborted = true;
    }
}

impl Reclaim for RelaySession {
    fn refcount(&self) -> &RefCount {
        &self.refcount
    }

    fn unpublish(&self) {
        self.registry
            .sessions()
            .remove_if(&self.id, |session| session.id == self.id);
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        // Every trace holds a session reference; none can remain here.
        debug_assert!(self.ctf_traces.is_empty(), "session destroyed with live traces");
        tracing::debug!(id = self.id, "destroying relay session");
    }
}

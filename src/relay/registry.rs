//! Process-scoped relay state.
//!
//! The sessions table, the global viewer-streams table and the monotonic id
//! counters used to be process globals; they live in one explicit value
//! created at daemon start and passed to everything that needs it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Limits;
use crate::epoch::{LookupTable, StrongRef};

use super::session::RelaySession;
use super::viewer::ViewerStream;

pub struct Registry {
    limits: Limits,
    sessions: LookupTable<u64, RelaySession>,
    viewer_streams: ViewerStreamTable,
    next_session_id: Mutex<u64>,
    next_trace_id: Mutex<u64>,
    next_stream_id: Mutex<u64>,
}

impl Registry {
    pub fn new(limits: Limits) -> Arc<Self> {
        Arc::new(Self {
            limits,
            sessions: LookupTable::new(),
            viewer_streams: ViewerStreamTable::new(),
            next_session_id: Mutex::new(0),
            next_trace_id: Mutex::new(0),
            next_stream_id: Mutex::new(0),
        })
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Looks up a session by id, taking a reference on it.
    pub fn session_by_id(&self, id: u64) -> Option<StrongRef<RelaySession>> {
        let session = self.sessions.get(&id);
        if session.is_none() {
            tracing::debug!(id, "session not found by id");
        }
        session
    }

    pub(crate) fn sessions(&self) -> &LookupTable<u64, RelaySession> {
        &self.sessions
    }

    pub(crate) fn viewer_streams(&self) -> &ViewerStreamTable {
        &self.viewer_streams
    }

    /// Number of viewer streams currently published.
    pub fn viewer_stream_count(&self) -> usize {
        self.viewer_streams.len()
    }

    pub(crate) fn allocate_session_id(&self) -> u64 {
        let mut next = self.next_session_id.lock();
        *next += 1;
        *next
    }

    pub(crate) fn allocate_trace_id(&self) -> u64 {
        let mut next = self.next_trace_id.lock();
        *next += 1;
        *next
    }

    pub(crate) fn allocate_stream_id(&self) -> u64 {
        let mut next = self.next_stream_id.lock();
        *next += 1;
        *next
    }
}

/// Global table of viewer streams, keyed by the shadowed relay stream's id.
///
/// Unlike the weak tables, entries here are counted: the table owns one of
/// the viewer stream's two references, the viewer session the other.
pub(crate) struct ViewerStreamTable {
    entries: Mutex<HashMap<u64, StrongRef<ViewerStream>>>,
}

impl ViewerStreamTable {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, viewer_stream: StrongRef<ViewerStream>) {
        let previous = self
            .entries
            .lock()
            .insert(viewer_stream.id(), viewer_stream);
        debug_assert!(previous.is_none(), "viewer stream already published");
    }

    /// Removes the entry, releasing the table's reference.
    pub(crate) fn remove(&self, id: u64) -> Option<StrongRef<ViewerStream>> {
        self.entries.lock().remove(&id)
    }

    /// References to every current entry, in no particular order.
    pub(crate) fn snapshot(&self) -> Vec<StrongRef<ViewerStream>> {
        self.entries.lock().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

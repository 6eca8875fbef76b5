//! Relay streams: one per-CPU data stream (or metadata stream) of a trace.

use parking_lot::Mutex;

use crate::epoch::{RefCount, Reclaim, StrongRef};

use super::trace::CtfTrace;

/// Readiness of a stream as seen through the lifecycle operations.
///
/// `Allocated` streams are announced but not yet part of their trace;
/// `publish` links them in. A data boundary (first complete packet index)
/// makes them `Ready`. `try_close` moves any state to `Closing`; the object
/// is destroyed once the remaining references drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Allocated,
    Indexed,
    Ready,
    Closing,
}

pub struct RelayStream {
    id: u64,
    trace: StrongRef<CtfTrace>,
    is_metadata: bool,
    refcount: RefCount,
    state: Mutex<StreamState>,
}

impl RelayStream {
    /// Announces a new stream of `trace`. The stream holds a trace
    /// reference for as long as it lives; the trace's lifetime is the sum
    /// of its streams'.
    pub fn create(trace: &StrongRef<CtfTrace>, is_metadata: bool) -> StrongRef<Self> {
        let stream = StrongRef::new(Self {
            id: trace.session().registry().allocate_stream_id(),
            trace: trace.clone(),
            is_metadata,
            refcount: RefCount::new(),
            state: Mutex::new(StreamState::Allocated),
        });
        trace.session().add_unpublished_stream(&stream);
        tracing::debug!(
            id = stream.id,
            trace_id = trace.id(),
            is_metadata,
            "created relay stream"
        );
        stream
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn trace(&self) -> &CtfTrace {
        &self.trace
    }

    pub fn is_metadata(&self) -> bool {
        self.is_metadata
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Links the stream into its trace, making it visible to viewers. No
    /// effect unless the stream is still `Allocated`.
    pub fn publish(this: &StrongRef<Self>) {
        let mut state = this.state.lock();
        if *state != StreamState::Allocated {
            return;
        }
        *state = StreamState::Indexed;
        this.trace.link_stream(this.clone());
        this.trace.session().remove_unpublished_stream(this.id);
    }

    /// Records that the stream has reached a complete data boundary.
    pub fn mark_data_ready(&self) {
        let mut state = self.state.lock();
        if *state == StreamState::Indexed {
            *state = StreamState::Ready;
        }
    }

    /// Begins teardown: the stream leaves its trace's stream list (putting
    /// the publication reference) and no new readers can reach it through
    /// the session's tables. Idempotent. Readers still holding references
    /// keep a consistent object until they put them back.
    pub fn try_close(&self) {
        let unlinked = {
            let mut state = self.state.lock();
            match *state {
                StreamState::Closing => return,
                StreamState::Allocated => {
                    *state = StreamState::Closing;
                    self.trace.session().remove_unpublished_stream(self.id);
                    None
                }
                StreamState::Indexed | StreamState::Ready => {
                    *state = StreamState::Closing;
                    self.trace.unlink_stream(self.id)
                }
            }
        };
        tracing::debug!(id = self.id, "closed relay stream");
        // Dropped outside the state lock: this may be the last reference.
        drop(unlinked);
    }
}

impl Reclaim for RelayStream {
    fn refcount(&self) -> &RefCount {
        &self.refcount
    }

    fn unpublish(&self) {
        // A linked stream is kept alive by its publication reference, so a
        // zero count implies the stream is no longer in its trace's list.
        // Only the announcement entry may remain.
        self.trace.session().remove_unpublished_stream(self.id);
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        tracing::debug!(id = self.id, "destroying relay stream");
    }
}

//! Opaque trace chunk handles.
//!
//! Chunk contents and on-disk layout belong to the chunk registry
//! collaborator; the core only moves handles around and copies them for
//! viewers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::ChunkError;

#[derive(Clone, Debug)]
pub struct TraceChunk {
    inner: Arc<ChunkInner>,
}

#[derive(Debug)]
struct ChunkInner {
    id: u64,
    closed: AtomicBool,
}

impl TraceChunk {
    pub fn new(id: u64) -> Self {
        Self {
            inner: Arc::new(ChunkInner {
                id,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Marks the chunk closed; further viewer copies fail.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// A viewer's handle onto the same chunk. Fails once the chunk has been
    /// closed by its owner.
    pub fn copy_for_viewer(&self) -> Result<TraceChunk, ChunkError> {
        if self.is_closed() {
            return Err(ChunkError::Closed { id: self.inner.id });
        }
        Ok(self.clone())
    }
}

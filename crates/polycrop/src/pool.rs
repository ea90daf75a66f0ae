//! Buffer pool collaborator.
//!
//! The transformation borrows every buffer it writes (the result and any
//! temporary format-conversion copy) from a [`BufferPool`], and returns
//! the ones it does not hand back to the caller. Hosting pipelines usually
//! bring their own pool; [`RecyclingPool`] is the bundled implementation
//! for hosts (and tests) that do not.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::types::{PixelBuffer, PixelFormat};

/// Errors produced by buffer-pool implementations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool's memory limit would be exceeded by this allocation.
    #[error(
        "pool memory limit exceeded (requested: {requested} bytes, live: {live}, limit: {limit})"
    )]
    MemoryLimitExceeded {
        /// Size of the requested buffer in bytes.
        requested: u64,
        /// Bytes currently checked out of the pool.
        live: u64,
        /// The configured limit in bytes.
        limit: u64,
    },

    /// The pool could not produce a buffer for an implementation-specific
    /// reason.
    #[error("buffer allocation failed: {0}")]
    AllocationFailed(String),
}

/// Supplies and reclaims pixel buffers.
///
/// Implementations must be thread-safe: the transformation is invoked from
/// arbitrary worker threads. Buffers handed out by [`acquire`](Self::acquire)
/// are zero-filled; callers own them until they are passed back through
/// [`release`](Self::release) (at most once).
pub trait BufferPool: Send + Sync {
    /// Borrow a zero-filled `width`×`height` buffer in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] when the pool cannot produce the buffer.
    fn acquire(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<PixelBuffer, PoolError>;

    /// Return a previously acquired buffer.
    fn release(&self, buffer: PixelBuffer);
}

type BufferKey = (u32, u32, PixelFormat);

/// Thread-safe pool that retains released buffers for exact-size reuse.
///
/// Idle buffers are kept in per-`(width, height, format)` free lists; an
/// acquire that matches an idle buffer wipes and reuses it instead of
/// allocating. An optional limit caps the bytes checked out at any moment
/// (idle buffers are dropped first to make room).
#[derive(Debug, Default)]
pub struct RecyclingPool {
    idle: Mutex<HashMap<BufferKey, Vec<PixelBuffer>>>,
    live_bytes: AtomicU64,
    max_live_bytes: Option<u64>,
}

impl RecyclingPool {
    /// Create an unbounded pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool that refuses to let checked-out buffers exceed
    /// `max_live_bytes` in total.
    #[must_use]
    pub fn with_limit(max_live_bytes: u64) -> Self {
        Self {
            max_live_bytes: Some(max_live_bytes),
            ..Self::default()
        }
    }

    /// Number of idle buffers currently retained.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.lock_idle().values().map(Vec::len).sum()
    }

    /// Bytes currently checked out (acquired and not yet released).
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// Drop all idle buffers.
    pub fn clear(&self) {
        self.lock_idle().clear();
    }

    fn lock_idle(&self) -> std::sync::MutexGuard<'_, HashMap<BufferKey, Vec<PixelBuffer>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BufferPool for RecyclingPool {
    fn acquire(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<PixelBuffer, PoolError> {
        let requested =
            u64::from(width) * u64::from(height) * format.bytes_per_pixel() as u64;

        if let Some(limit) = self.max_live_bytes {
            let live = self.live_bytes();
            if live + requested > limit {
                // Idle buffers hold no live bytes, but dropping them frees
                // allocator memory before we refuse the caller.
                self.clear();
                return Err(PoolError::MemoryLimitExceeded {
                    requested,
                    live,
                    limit,
                });
            }
        }

        let reused = self
            .lock_idle()
            .get_mut(&(width, height, format))
            .and_then(Vec::pop);

        let buffer = match reused {
            Some(mut buffer) => {
                // Reused buffers are wiped so pool history never reaches
                // the caller.
                buffer.wipe();
                buffer
            }
            None => PixelBuffer::new(format, width, height),
        };

        self.live_bytes.fetch_add(requested, Ordering::Relaxed);
        Ok(buffer)
    }

    fn release(&self, buffer: PixelBuffer) {
        self.live_bytes
            .fetch_sub(buffer.byte_size() as u64, Ordering::Relaxed);
        let key = (buffer.width(), buffer.height(), buffer.format());
        self.lock_idle().entry(key).or_default().push(buffer);
    }
}

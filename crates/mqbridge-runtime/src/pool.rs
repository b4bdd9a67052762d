//! Output buffer pool
//!
//! Template execution writes into pooled `Vec<u8>` buffers. A buffer is
//! checked out as a [`PooledBuffer`] guard, which clears it and hands it back
//! when dropped, on success and error paths alike.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Idle buffers kept by default
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Buffers that grew beyond this capacity are freed instead of pooled
pub const DEFAULT_MAX_CAPACITY: usize = 64 * 1024;

/// A pool of reusable byte buffers
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    max_capacity: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE, DEFAULT_MAX_CAPACITY)
    }
}

impl BufferPool {
    /// Pool keeping up to `max_idle` buffers of at most `max_capacity` bytes
    pub fn new(max_idle: usize, max_capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            max_capacity,
        }
    }

    /// Check out an empty buffer
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut buf = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        buf.clear();
        PooledBuffer { pool: self, buf }
    }

    /// Buffers currently waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_capacity {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

/// A buffer checked out of a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    pool: &'p BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

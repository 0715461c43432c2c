//! Bounded producer/consumer ring buffer
//!
//! Decouples frame production (worker thread) from consumption (reader
//! thread). A single mutex protects the queue; two condition variables
//! (not-empty, not-full) keep wakeups targeted. Strict FIFO, no other
//! ordering guarantee.
//!
//! The real-time production path only ever uses the non-blocking
//! operations: a push onto a full buffer fails rather than overwriting
//! or blocking. `pop_or_wait` exists for consumers that can tolerate
//! blocking.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Fixed-capacity circular FIFO queue, safe to share between one
/// producer and one consumer thread (or several of each).
pub struct RingBuffer<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Push without blocking. On a full buffer the item is handed back
    /// to the caller and the contents are untouched.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= self.capacity {
            return Err(item);
        }

        queue.push_back(item);
        drop(queue);

        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop without blocking; `None` if the buffer is empty
    pub fn try_pop(&self) -> Option<T> {
        let mut queue = self.inner.lock().unwrap();
        let item = queue.pop_front()?;
        drop(queue);

        self.not_full.notify_one();
        Some(item)
    }

    /// Block until an item is available.
    ///
    /// Never called on the frame-production path; a worker must not
    /// stall on one player's consumer.
    pub fn pop_or_wait(&self) -> T {
        let mut queue = self.inner.lock().unwrap();
        loop {
            if let Some(item) = queue.pop_front() {
                drop(queue);
                self.not_full.notify_one();
                return item;
            }
            queue = self.not_empty.wait(queue).unwrap();
        }
    }

    /// Discard all buffered items and wake any waiter.
    ///
    /// Used on seek/stop so stale audio is never served.
    pub fn clear(&self) {
        let mut queue = self.inner.lock().unwrap();
        queue.clear();
        drop(queue);

        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

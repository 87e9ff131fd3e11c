//! Bounded blocking FIFO shared by the two ends of a loopback channel.
//!
//! The queue owns its synchronization: a `parking_lot::Mutex` around a
//! `VecDeque` plus one condition variable per direction. Producers wait on
//! `not_full`, consumers wait on `not_empty`.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Element carried by the loopback queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItem {
    /// One transmitted byte.
    Data(u8),
    /// Pushed by `close()` to wake a blocked reader.
    EndOfStream,
}

/// Returned by [`BoundedQueue::push`] when no room opened up in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

#[derive(Debug)]
struct Inner<T> {
    /// Each item is tagged with whether it counts against the capacity.
    items: VecDeque<(T, bool)>,
    /// Number of queued items that count against the capacity.
    bounded: usize,
}

/// Bounded, thread-safe FIFO with timeout-capable push and pop.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue holding at most `capacity` items.
    ///
    /// A capacity of zero is bumped to one so pushes can ever succeed.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                bounded: 0,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued items that count against the capacity.
    ///
    /// Items added with [`push_unbounded`](Self::push_unbounded) are not
    /// included, though [`pop`](Self::pop) still returns them.
    pub fn len(&self) -> usize {
        self.inner.lock().bounded
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an item, waiting up to `timeout` for room.
    ///
    /// `None`, or a timeout too large to represent as an instant, waits
    /// indefinitely. On timeout the item is handed back.
    pub fn push(&self, item: T, timeout: Option<Duration>) -> Result<(), Full<T>> {
        let deadline = deadline_after(timeout);
        let mut inner = self.inner.lock();

        while inner.bounded >= self.capacity {
            match deadline {
                Some(deadline) => {
                    if self.not_full.wait_until(&mut inner, deadline).timed_out()
                        && inner.bounded >= self.capacity
                    {
                        return Err(Full(item));
                    }
                }
                None => self.not_full.wait(&mut inner),
            }
        }

        inner.items.push_back((item, true));
        inner.bounded += 1;
        drop(inner);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append an item without waiting for room.
    ///
    /// The item does not count against the capacity, so this never blocks.
    pub fn push_unbounded(&self, item: T) {
        let mut inner = self.inner.lock();
        inner.items.push_back((item, false));
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive.
    ///
    /// `None`, or a timeout too large to represent as an instant, waits
    /// indefinitely. Returns `None` on timeout.
    pub fn pop(&self, timeout: Option<Duration>) -> Option<T> {
        let deadline = deadline_after(timeout);
        let mut inner = self.inner.lock();

        loop {
            if let Some((item, bounded)) = inner.items.pop_front() {
                if bounded {
                    inner.bounded -= 1;
                    drop(inner);
                    self.not_full.notify_one();
                }
                return Some(item);
            }

            match deadline {
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut inner, deadline).timed_out()
                        && inner.items.is_empty()
                    {
                        return None;
                    }
                }
                None => self.not_empty.wait(&mut inner),
            }
        }
    }

    /// Remove the oldest item if one is queued right now.
    pub fn try_pop(&self) -> Option<T> {
        self.pop(Some(Duration::ZERO))
    }

    /// Discard everything queued. Returns how many items were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.items.len();
        inner.items.clear();
        inner.bounded = 0;
        drop(inner);
        self.not_full.notify_all();
        dropped
    }
}

/// Instant `timeout` from now, or `None` when it cannot be represented.
pub(crate) fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

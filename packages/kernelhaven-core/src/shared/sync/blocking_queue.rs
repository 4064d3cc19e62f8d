//! BlockingQueue - FIFO hand-off between producer and consumer threads
//!
//! Consumers suspend on a condition variable until an element arrives or the
//! producer side signals end-of-stream. End-of-stream is an explicit tagged
//! value ([`Next::End`]) rather than an absent element.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Outcome of pulling from a [`BlockingQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next<T> {
    /// The next element of the stream
    Item(T),
    /// The queue is drained and no element will ever be added again
    End,
}

impl<T> Next<T> {
    pub fn into_item(self) -> Option<T> {
        match self {
            Next::Item(item) => Some(item),
            Next::End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Next::End)
    }

    pub fn as_ref(&self) -> Next<&T> {
        match self {
            Next::Item(item) => Next::Item(item),
            Next::End => Next::End,
        }
    }
}

/// Neither an element nor end-of-stream arrived within the bound
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Timed out after {waited_ms} ms waiting on queue")]
pub struct QueueTimeout {
    pub waited_ms: u64,
}

struct State<T> {
    items: VecDeque<T>,
    ended: bool,
}

/// Unbounded thread-safe FIFO with blocking/timed `get` and `peek`
///
/// # Example
/// ```
/// use kernelhaven_core::shared::sync::{BlockingQueue, Next};
///
/// let queue = BlockingQueue::new();
/// queue.add(1);
/// queue.end();
///
/// assert_eq!(queue.get(), Next::Item(1));
/// assert_eq!(queue.get(), Next::End);
/// ```
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                ended: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an element and wake waiting consumers.
    ///
    /// Returns `false` (and drops the element) if the queue has already ended.
    pub fn add(&self, item: T) -> bool {
        let mut state = self.state.lock();
        if state.ended {
            tracing::warn!("Element added to a queue after end of stream; dropping it");
            return false;
        }
        state.items.push_back(item);
        // Peekers and getters share the condvar, so a single wake-up could land on
        // a peeker and leave a getter asleep next to a non-empty queue.
        self.available.notify_all();
        true
    }

    /// Signal that no more elements will be added. Idempotent.
    pub fn end(&self) {
        let mut state = self.state.lock();
        state.ended = true;
        self.available.notify_all();
    }

    /// Remove and return the head, waiting as long as necessary.
    pub fn get(&self) -> Next<T> {
        let mut state = self.wait_for_head(None);
        Self::pop(&mut state)
    }

    /// Remove and return the head, waiting at most `timeout` (`Duration::ZERO` = forever).
    pub fn get_timeout(&self, timeout: Duration) -> Result<Next<T>, QueueTimeout> {
        let mut state = self.wait_with_timeout(timeout)?;
        Ok(Self::pop(&mut state))
    }

    /// `true` once the queue is both drained and ended.
    pub fn is_end(&self) -> bool {
        let state = self.state.lock();
        state.ended && state.items.is_empty()
    }

    /// `true` once `end()` was called, even if elements are still pending.
    pub fn is_closed(&self) -> bool {
        self.state.lock().ended
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Draining iterator: yields elements until end-of-stream.
    pub fn iter(&self) -> QueueIter<'_, T> {
        QueueIter { queue: self }
    }

    fn pop(state: &mut State<T>) -> Next<T> {
        match state.items.pop_front() {
            Some(item) => Next::Item(item),
            None => Next::End,
        }
    }

    fn wait_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<MutexGuard<'_, State<T>>, QueueTimeout> {
        if timeout.is_zero() {
            return Ok(self.wait_for_head(None));
        }
        // A deadline beyond the clock's range is the same as no deadline.
        let state = self.wait_for_head(Instant::now().checked_add(timeout));
        if state.items.is_empty() && !state.ended {
            return Err(QueueTimeout {
                waited_ms: saturating_millis(timeout),
            });
        }
        Ok(state)
    }

    /// Wait until the queue has a head element or has ended, or the deadline passes.
    fn wait_for_head(&self, deadline: Option<Instant>) -> MutexGuard<'_, State<T>> {
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.ended {
            match deadline {
                None => self.available.wait(&mut state),
                Some(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        state
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<T: Clone> BlockingQueue<T> {
    /// Return a copy of the head without removing it, waiting as long as necessary.
    pub fn peek(&self) -> Next<T> {
        let state = self.wait_for_head(None);
        Self::front(&state)
    }

    /// Like [`peek`](Self::peek) but waits at most `timeout` (`Duration::ZERO` = forever).
    pub fn peek_timeout(&self, timeout: Duration) -> Result<Next<T>, QueueTimeout> {
        let state = self.wait_with_timeout(timeout)?;
        Ok(Self::front(&state))
    }

    fn front(state: &State<T>) -> Next<T> {
        match state.items.front() {
            Some(item) => Next::Item(item.clone()),
            None => Next::End,
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("pending", &state.items.len())
            .field("ended", &state.ended)
            .finish()
    }
}

/// Iterator returned by [`BlockingQueue::iter`]
pub struct QueueIter<'a, T> {
    queue: &'a BlockingQueue<T>,
}

impl<T> Iterator for QueueIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.get().into_item()
    }
}

impl<'a, T> IntoIterator for &'a BlockingQueue<T> {
    type Item = T;
    type IntoIter = QueueIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

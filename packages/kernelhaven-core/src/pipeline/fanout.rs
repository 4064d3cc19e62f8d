//! One-to-many hand-off shared by split components and provider feeds

use crate::shared::sync::BlockingQueue;
use parking_lot::Mutex;
use std::sync::Arc;

struct State<T> {
    queues: Vec<Arc<BlockingQueue<T>>>,
    sealed: bool,
}

/// Set of branch queues that is sealed once broadcasting begins
pub(crate) struct BranchSet<T> {
    owner: String,
    state: Mutex<State<T>>,
}

impl<T> BranchSet<T> {
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: Mutex::new(State {
                queues: Vec::new(),
                sealed: false,
            }),
        }
    }

    /// Register a new branch. After sealing the branch is already ended.
    pub(crate) fn add_branch(&self) -> Arc<BlockingQueue<T>> {
        let queue = Arc::new(BlockingQueue::new());
        let mut state = self.state.lock();
        if state.sealed {
            tracing::warn!(
                component = %self.owner,
                "Output branch created after broadcasting started; it will stay empty"
            );
            queue.end();
        } else {
            state.queues.push(Arc::clone(&queue));
        }
        queue
    }

    /// Seal the set; only the first caller gets the broadcast handle.
    pub(crate) fn seal(&self) -> Option<Broadcast<T>> {
        let mut state = self.state.lock();
        if state.sealed {
            return None;
        }
        state.sealed = true;
        Some(Broadcast {
            queues: state.queues.clone(),
        })
    }

    pub(crate) fn branch_count(&self) -> usize {
        self.state.lock().queues.len()
    }
}

/// Writes every element to all sealed branches; ends them all when dropped
pub(crate) struct Broadcast<T> {
    queues: Vec<Arc<BlockingQueue<T>>>,
}

impl<T: Clone> Broadcast<T> {
    pub(crate) fn send(&self, item: T) {
        if let Some((last, rest)) = self.queues.split_last() {
            for queue in rest {
                queue.add(item.clone());
            }
            last.add(item);
        }
    }
}

impl<T> Drop for Broadcast<T> {
    fn drop(&mut self) {
        for queue in &self.queues {
            queue.end();
        }
    }
}

//! Order-preserving parallel map
//!
//! Inputs are processed by a pool of worker threads in any order, while a
//! single collector thread hands the outputs to the consumer in the order the
//! inputs were added. An input whose function panics is skipped; later outputs
//! are still delivered.

use super::blocking_queue::{BlockingQueue, Next};
use crate::shared::utils::panic_message;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParallelizerError {
    #[error("Parallelizer needs at least one thread, got {0}")]
    InvalidThreadCount(usize),

    #[error("Could not spawn thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Thread '{0}' terminated abnormally")]
    Panicked(String),
}

/// Runs a function over its inputs in parallel and consumes the outputs in input order
///
/// ```ignore
/// let mut doubler = OrderPreservingParallelizer::new("doubler", |n: u32| n * 2, |n| println!("{n}"), 4)?;
/// for n in 0..10 {
///     doubler.add(n);
/// }
/// doubler.join()?;
/// ```
pub struct OrderPreservingParallelizer<I> {
    name: String,
    todo: Arc<BlockingQueue<(usize, I)>>,
    next_index: usize,
    workers: Vec<JoinHandle<()>>,
    collector: Option<JoinHandle<()>>,
}

impl<I: Send + 'static> OrderPreservingParallelizer<I> {
    pub fn new<O, F, C>(name: impl Into<String>, function: F, consumer: C, threads: usize) -> Result<Self, ParallelizerError>
    where
        O: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
        C: FnMut(O) + Send + 'static,
    {
        if threads == 0 {
            return Err(ParallelizerError::InvalidThreadCount(threads));
        }
        let name = name.into();
        let todo = Arc::new(BlockingQueue::new());
        let done = Arc::new(BlockingQueue::new());
        let remaining = Arc::new(AtomicUsize::new(threads));
        let function = Arc::new(function);

        let mut workers = Vec::with_capacity(threads);
        for i in 0..threads {
            let thread_name = format!("{name}-worker-{i}");
            let worker = Worker {
                todo: Arc::clone(&todo),
                done: Arc::clone(&done),
                function: Arc::clone(&function),
                remaining: Arc::clone(&remaining),
            };
            match thread::Builder::new().name(thread_name.clone()).spawn(move || worker.run()) {
                Ok(handle) => workers.push(handle),
                Err(source) if workers.is_empty() => {
                    return Err(ParallelizerError::Spawn {
                        name: thread_name,
                        source,
                    });
                }
                Err(source) => {
                    // The rejected worker counted itself down when it was dropped.
                    remaining.fetch_sub(threads - i - 1, Ordering::AcqRel);
                    tracing::warn!(
                        thread = %thread_name,
                        error = %source,
                        "Could not spawn parallelizer worker, continuing with fewer threads"
                    );
                    break;
                }
            }
        }

        let collector_name = format!("{name}-collector");
        let collector = thread::Builder::new()
            .name(collector_name.clone())
            .spawn(move || collect(&done, consumer));
        let collector = match collector {
            Ok(handle) => handle,
            Err(source) => {
                todo.end();
                return Err(ParallelizerError::Spawn {
                    name: collector_name,
                    source,
                });
            }
        };

        tracing::debug!(parallelizer = %name, threads = workers.len(), "Parallelizer started");
        Ok(Self {
            name,
            todo,
            next_index: 0,
            workers,
            collector: Some(collector),
        })
    }

    /// Queue an input; `false` once [`end`](Self::end) was called.
    pub fn add(&mut self, input: I) -> bool {
        let added = self.todo.add((self.next_index, input));
        if added {
            self.next_index += 1;
        }
        added
    }

    /// No more inputs will be added.
    pub fn end(&self) {
        self.todo.end();
    }

    /// End the input and wait until every output has been consumed.
    pub fn join(mut self) -> Result<(), ParallelizerError> {
        self.todo.end();
        let mut failed = None;
        for handle in self.workers.drain(..) {
            let thread = handle.thread().name().unwrap_or_default().to_string();
            if handle.join().is_err() {
                failed.get_or_insert(thread);
            }
        }
        if let Some(handle) = self.collector.take() {
            let thread = handle.thread().name().unwrap_or_default().to_string();
            if handle.join().is_err() {
                failed.get_or_insert(thread);
            }
        }
        tracing::debug!(parallelizer = %self.name, inputs = self.next_index, "Parallelizer done");
        match failed {
            Some(thread) => Err(ParallelizerError::Panicked(thread)),
            None => Ok(()),
        }
    }
}

impl<I> Drop for OrderPreservingParallelizer<I> {
    fn drop(&mut self) {
        self.todo.end();
    }
}

struct Worker<I, O, F> {
    todo: Arc<BlockingQueue<(usize, I)>>,
    done: Arc<BlockingQueue<(usize, Option<O>)>>,
    function: Arc<F>,
    remaining: Arc<AtomicUsize>,
}

impl<I, O, F: Fn(I) -> O> Worker<I, O, F> {
    fn run(self) {
        while let Next::Item((index, input)) = self.todo.get() {
            let output = match catch_unwind(AssertUnwindSafe(|| (self.function)(input))) {
                Ok(output) => Some(output),
                Err(payload) => {
                    tracing::error!(
                        index,
                        panic = %panic_message(payload.as_ref()),
                        "Parallelizer function panicked, skipping its output"
                    );
                    None
                }
            };
            self.done.add((index, output));
        }
    }
}

impl<I, O, F> Drop for Worker<I, O, F> {
    fn drop(&mut self) {
        // The last worker out ends the output queue.
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.done.end();
        }
    }
}

/// Deliver outputs in index order; a skipped index holds `None`.
fn collect<O, C: FnMut(O)>(done: &BlockingQueue<(usize, Option<O>)>, mut consumer: C) {
    let mut pending = BTreeMap::new();
    let mut next = 0;
    while let Next::Item((index, output)) = done.get() {
        pending.insert(index, output);
        while let Some(output) = pending.remove(&next) {
            next += 1;
            let Some(output) = output else { continue };
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| consumer(output))) {
                tracing::error!(
                    index = next - 1,
                    panic = %panic_message(payload.as_ref()),
                    "Parallelizer consumer panicked"
                );
            }
        }
    }
    if !pending.is_empty() {
        tracing::warn!(undelivered = pending.len(), "Parallelizer ended with outputs out of sequence");
    }
}

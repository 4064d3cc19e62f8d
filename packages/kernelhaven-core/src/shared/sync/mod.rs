//! Thread synchronization primitives

mod blocking_queue;
mod cancel;
mod parallelizer;

pub use blocking_queue::{BlockingQueue, Next, QueueIter, QueueTimeout};
pub use cancel::CancellationToken;
pub use parallelizer::{OrderPreservingParallelizer, ParallelizerError};

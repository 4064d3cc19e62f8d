//! Provider feeds: starting components of a pipeline
//!
//! A feed turns one provider into any number of starting components. It pulls
//! from the provider at most once, either when the pipeline preemptively
//! starts the extractors or when the first starting component is started,
//! and copies every result to all of its components.

use super::component::{AnalysisComponent, ComponentLogic, ExecutionContext};
use super::fanout::{BranchSet, Broadcast};
use crate::config::Configuration;
use crate::features::extraction::Provider;
use crate::shared::sync::{BlockingQueue, Next};
use serde::Serialize;
use std::sync::Arc;
use std::thread;

pub struct ProviderFeed<T> {
    inner: Arc<FeedInner<T>>,
}

struct FeedInner<T> {
    provider: Arc<Provider<T>>,
    multiple: bool,
    label: String,
    branches: BranchSet<T>,
}

impl<T> Clone for ProviderFeed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Serialize + Send + 'static> ProviderFeed<T> {
    /// `multiple`: forward every result (code model) instead of only the
    /// first one (variability and build models).
    pub fn new(provider: Arc<Provider<T>>, multiple: bool, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            inner: Arc::new(FeedInner {
                provider,
                multiple,
                branches: BranchSet::new(format!("{label} feed")),
                label,
            }),
        }
    }

    pub fn provider(&self) -> &Arc<Provider<T>> {
        &self.inner.provider
    }

    /// New starting component receiving the provider's results.
    pub fn create_component(&self, config: &Configuration) -> AnalysisComponent<T> {
        AnalysisComponent::new(
            config,
            StartingComponent {
                feed: Arc::clone(&self.inner),
                queue: self.inner.branches.add_branch(),
                name: format!("{} StartingComponent", self.inner.label),
            },
        )
    }

    /// Start pulling from the provider; `false` if already started.
    pub fn start(&self) -> bool {
        start_feed(&self.inner)
    }
}

fn start_feed<T: Clone + Send + 'static>(inner: &Arc<FeedInner<T>>) -> bool {
    let Some(broadcast) = inner.branches.seal() else {
        return false;
    };
    let feed = Arc::clone(inner);
    let spawned = thread::Builder::new()
        .name(format!("{}-duplicator", inner.label))
        .spawn(move || feed.duplicate(broadcast));
    if let Err(e) = spawned {
        tracing::error!(feed = %inner.label, error = %e, "Could not spawn extractor data duplicator");
    }
    true
}

impl<T: Clone + Send + 'static> FeedInner<T> {
    fn duplicate(&self, broadcast: Broadcast<T>) {
        if self.multiple {
            while let Some(result) = self.provider.next_result() {
                broadcast.send(result);
            }
            while let Some(error) = self.provider.next_exception() {
                tracing::error!(feed = %self.label, error = %error, "Got extractor exception");
            }
        } else {
            if let Some(result) = self.provider.result() {
                broadcast.send(result);
            }
            if let Some(error) = self.provider.exception() {
                tracing::error!(feed = %self.label, error = %error, "Got extractor exception");
            }
        }
        tracing::debug!(feed = %self.label, "Extractor data duplicator done");
    }
}

struct StartingComponent<T> {
    feed: Arc<FeedInner<T>>,
    queue: Arc<BlockingQueue<T>>,
    name: String,
}

impl<T: Clone + Serialize + Send + 'static> ComponentLogic<T> for StartingComponent<T> {
    fn execute(&self, ctx: &ExecutionContext<'_, T>) {
        start_feed(&self.feed);
        while !ctx.is_cancelled() {
            match self.queue.get() {
                Next::Item(item) => ctx.emit(item),
                Next::End => break,
            }
        }
    }

    fn result_name(&self) -> &str {
        &self.name
    }

    fn is_internal_helper(&self) -> bool {
        true
    }
}

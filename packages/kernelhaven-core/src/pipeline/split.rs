//! Split: one upstream, any number of independently paced branches
//!
//! A single fan-out worker drains the upstream once and copies every element
//! into one queue per branch, in upstream order. The fan-out starts with the
//! first started branch, so a split nobody consumes never runs its upstream.

use super::component::{AnalysisComponent, ComponentLogic, ExecutionContext, PipelineNode};
use super::fanout::BranchSet;
use crate::config::Configuration;
use crate::shared::sync::{BlockingQueue, Next};
use serde::Serialize;
use std::sync::Arc;

pub struct SplitComponent<T> {
    config: Configuration,
    branch_name: String,
    branches: Arc<BranchSet<T>>,
    fanout: AnalysisComponent<()>,
}

impl<T: Clone + Serialize + Send + 'static> SplitComponent<T> {
    pub fn new(config: &Configuration, input: AnalysisComponent<T>) -> Self {
        let name = format!("{} Split", input.result_name());
        let branches = Arc::new(BranchSet::new(name.clone()));
        let fanout = AnalysisComponent::new(
            config,
            FanOut {
                input: input.clone(),
                branches: Arc::clone(&branches),
                name,
            },
        );
        Self {
            config: config.clone(),
            branch_name: format!("{} Split Branch", input.result_name()),
            branches,
            fanout,
        }
    }

    /// New branch receiving every upstream element.
    ///
    /// Branches must be created before any branch is started; later ones
    /// receive an already ended stream.
    pub fn create_output_component(&self) -> AnalysisComponent<T> {
        AnalysisComponent::new(
            &self.config,
            SplitBranch {
                feed: self.branches.add_branch(),
                fanout: self.fanout.clone(),
                name: self.branch_name.clone(),
            },
        )
    }

    pub fn branch_count(&self) -> usize {
        self.branches.branch_count()
    }
}

struct FanOut<T> {
    input: AnalysisComponent<T>,
    branches: Arc<BranchSet<T>>,
    name: String,
}

impl<T: Clone + Serialize + Send + 'static> ComponentLogic<()> for FanOut<T> {
    fn execute(&self, ctx: &ExecutionContext<'_, ()>) {
        let Some(broadcast) = self.branches.seal() else {
            return;
        };
        while let Some(item) = ctx.next_from(&self.input) {
            broadcast.send(item);
        }
    }

    fn result_name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        vec![self.input.as_node()]
    }

    fn is_internal_helper(&self) -> bool {
        true
    }
}

struct SplitBranch<T> {
    feed: Arc<BlockingQueue<T>>,
    fanout: AnalysisComponent<()>,
    name: String,
}

impl<T: Serialize + Send + 'static> ComponentLogic<T> for SplitBranch<T> {
    fn execute(&self, ctx: &ExecutionContext<'_, T>) {
        ctx.start(&self.fanout);
        while !ctx.is_cancelled() {
            match self.feed.get() {
                Next::Item(item) => ctx.emit(item),
                Next::End => break,
            }
        }
    }

    fn result_name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        vec![self.fanout.as_node()]
    }

    fn is_internal_helper(&self) -> bool {
        true
    }
}

//! Analysis components
//!
//! A component is built as plain data around a [`ComponentLogic`] and spawns
//! its worker thread only when started, either explicitly with a
//! [`RunContext`] or on demand by the first pull. The worker runs
//! `execute` exactly once and then ends the component's output queue, also
//! when `execute` panics.

use super::output::{ResultCollection, ResultWriter};
use crate::config::Configuration;
use crate::shared::sync::{BlockingQueue, CancellationToken, Next};
use crate::shared::utils::panic_message;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Shared state of one pipeline run
#[derive(Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
    results: Option<Arc<dyn ResultCollection>>,
    drained: Arc<BTreeSet<String>>,
}

impl RunContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            results: None,
            drained: Arc::default(),
        }
    }

    /// Collection receiving intermediate results of logging components
    pub fn with_results(mut self, results: Arc<dyn ResultCollection>) -> Self {
        self.results = Some(results);
        self
    }

    /// Result names whose output tables are written by the run itself.
    /// Such components don't open an intermediate writer of their own.
    pub fn with_drained<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.drained = Arc::new(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_drained(&self, name: &str) -> bool {
        self.drained.contains(name)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn results(&self) -> Option<&Arc<dyn ResultCollection>> {
        self.results.as_ref()
    }
}

/// What a component does with its inputs
pub trait ComponentLogic<O>: Send + Sync + 'static {
    /// Produce results through `ctx.emit`. Called exactly once.
    fn execute(&self, ctx: &ExecutionContext<'_, O>);

    /// Name shown to users, e.g. as output table name.
    fn result_name(&self) -> &str;

    /// Upstream components, used to start a whole graph.
    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        Vec::new()
    }

    /// Plumbing components that never produce user-facing output
    fn is_internal_helper(&self) -> bool {
        false
    }

    /// Inputs a pipeline runner should drain in parallel instead of this component.
    fn joined_inputs(&self) -> Option<Vec<Arc<dyn PipelineNode>>> {
        None
    }
}

/// Type-erased view of a component
pub trait PipelineNode: Send + Sync {
    /// Spawn the worker; `false` if it was already started.
    fn start(&self, ctx: &RunContext) -> bool;

    fn result_name(&self) -> &str;

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>>;

    fn is_internal_helper(&self) -> bool;

    fn joined_inputs(&self) -> Option<Vec<Arc<dyn PipelineNode>>>;

    /// Start (if needed) and write every result to `writer`; returns the row count.
    fn drain_into(&self, ctx: &RunContext, writer: &mut dyn ResultWriter) -> io::Result<usize>;
}

/// Start `node` and, if it was not running yet, everything upstream of it.
///
/// Returns the number of components started.
pub fn start_all(node: &dyn PipelineNode, ctx: &RunContext) -> usize {
    if !node.start(ctx) {
        return 0;
    }
    1 + node
        .inputs()
        .iter()
        .map(|input| start_all(input.as_ref(), ctx))
        .sum::<usize>()
}

/// Result names of all user-facing components reachable from `node`.
pub fn component_names(node: &dyn PipelineNode) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(node, &mut names);
    names
}

fn collect_names(node: &dyn PipelineNode, names: &mut Vec<String>) {
    for input in node.inputs() {
        collect_names(input.as_ref(), names);
    }
    if !node.is_internal_helper() && !names.iter().any(|n| n == node.result_name()) {
        names.push(node.result_name().to_string());
    }
}

struct ComponentInner<O> {
    logic: Box<dyn ComponentLogic<O>>,
    results: BlockingQueue<O>,
    started: Mutex<bool>,
    log_results: bool,
}

/// Pipeline stage producing results of type `O`
///
/// Cloning shares the same stage; downstream components keep clones of
/// their upstream.
pub struct AnalysisComponent<O> {
    inner: Arc<ComponentInner<O>>,
}

impl<O> Clone for AnalysisComponent<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: Serialize + Send + 'static> AnalysisComponent<O> {
    /// Intermediate results are logged if the result name is listed in
    /// `analysis.log_intermediate_results`.
    pub fn new(config: &Configuration, logic: impl ComponentLogic<O>) -> Self {
        let log_results = config
            .analysis
            .log_intermediate_results
            .iter()
            .any(|name| name == logic.result_name());
        Self {
            inner: Arc::new(ComponentInner {
                logic: Box::new(logic),
                results: BlockingQueue::new(),
                started: Mutex::new(false),
                log_results,
            }),
        }
    }

    pub fn result_name(&self) -> &str {
        self.inner.logic.result_name()
    }

    pub fn is_started(&self) -> bool {
        *self.inner.started.lock()
    }

    /// Spawn the worker thread; `false` if already started.
    pub fn start(&self, ctx: &RunContext) -> bool {
        let mut started = self.inner.started.lock();
        if *started {
            return false;
        }
        *started = true;

        let writer = self.open_writer(ctx);
        let inner = Arc::clone(&self.inner);
        let run = ctx.clone();
        let spawned = thread::Builder::new()
            .name(self.result_name().to_string())
            .spawn(move || run_component(&inner, run, writer));
        if let Err(e) = spawned {
            tracing::error!(
                component = %self.result_name(),
                error = %e,
                "Could not spawn analysis component thread"
            );
            self.inner.results.end();
        }
        true
    }

    /// Next result, starting the component if needed; `None` once done.
    pub fn next_result(&self) -> Option<O> {
        self.start(&RunContext::default());
        self.inner.results.get().into_item()
    }

    pub fn as_node(&self) -> Arc<dyn PipelineNode> {
        Arc::new(self.clone())
    }

    fn open_writer(&self, ctx: &RunContext) -> Option<Box<dyn ResultWriter>> {
        if !self.inner.log_results {
            return None;
        }
        if ctx.is_drained(self.result_name()) {
            tracing::debug!(
                component = %self.result_name(),
                "Intermediate output skipped; results go to the final output"
            );
            return None;
        }
        match ctx.results()?.writer(self.result_name()) {
            Ok(writer) => Some(writer),
            Err(e) => {
                tracing::warn!(
                    component = %self.result_name(),
                    error = %e,
                    "Can't create intermediate output"
                );
                None
            }
        }
    }
}

impl<O: Serialize + Send + 'static> PipelineNode for AnalysisComponent<O> {
    fn start(&self, ctx: &RunContext) -> bool {
        AnalysisComponent::start(self, ctx)
    }

    fn result_name(&self) -> &str {
        self.inner.logic.result_name()
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        self.inner.logic.inputs()
    }

    fn is_internal_helper(&self) -> bool {
        self.inner.logic.is_internal_helper()
    }

    fn joined_inputs(&self) -> Option<Vec<Arc<dyn PipelineNode>>> {
        self.inner.logic.joined_inputs()
    }

    fn drain_into(&self, ctx: &RunContext, writer: &mut dyn ResultWriter) -> io::Result<usize> {
        AnalysisComponent::start(self, ctx);
        let mut rows = 0;
        while let Next::Item(result) = self.inner.results.get() {
            let row = serde_json::to_value(&result)?;
            tracing::debug!(component = %self.result_name(), result = %row, "Analysis result");
            writer.write_row(&row)?;
            rows += 1;
        }
        Ok(rows)
    }
}

/// Handle passed to [`ComponentLogic::execute`]
pub struct ExecutionContext<'a, O> {
    component: &'a ComponentInner<O>,
    run: &'a RunContext,
    writer: Mutex<Option<Box<dyn ResultWriter>>>,
}

impl<O: Serialize + Send + 'static> ExecutionContext<'_, O> {
    /// Hand a result to downstream components.
    pub fn emit(&self, result: O) {
        if self.component.log_results {
            self.log_result(&result);
        }
        self.component.results.add(result);
    }

    /// Pull the next result of `input`, starting it with this run's context.
    ///
    /// Returns `None` at the end of the input or once the run is cancelled.
    pub fn next_from<I: Serialize + Send + 'static>(&self, input: &AnalysisComponent<I>) -> Option<I> {
        if self.run.is_cancelled() {
            return None;
        }
        input.start(self.run);
        input.inner.results.get().into_item()
    }

    /// Start `input` without pulling from it.
    pub fn start<I: Serialize + Send + 'static>(&self, input: &AnalysisComponent<I>) {
        input.start(self.run);
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    pub fn run_context(&self) -> &RunContext {
        self.run
    }

    fn log_result(&self, result: &O) {
        let name = self.component.logic.result_name();
        let row = match serde_json::to_value(result) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(component = name, error = %e, "Can't serialize intermediate result");
                return;
            }
        };
        tracing::info!(component = name, result = %row, "Intermediate result");
        if let Some(writer) = self.writer.lock().as_mut() {
            if let Err(e) = writer.write_row(&row) {
                tracing::error!(component = name, error = %e, "Exception while writing to output file");
            }
        }
    }

    fn done(self) {
        let name = self.component.logic.result_name();
        tracing::debug!(component = name, "Analysis component done");
        if let Some(mut writer) = self.writer.into_inner() {
            if let Err(e) = writer.close() {
                tracing::error!(component = name, error = %e, "Exception while closing output file");
            }
        }
        self.component.results.end();
    }
}

fn run_component<O: Serialize + Send + 'static>(
    inner: &ComponentInner<O>,
    run: RunContext,
    writer: Option<Box<dyn ResultWriter>>,
) {
    let name = inner.logic.result_name();
    tracing::debug!(component = name, "Analysis component starting");

    let ctx = ExecutionContext {
        component: inner,
        run: &run,
        writer: Mutex::new(writer),
    };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| inner.logic.execute(&ctx))) {
        tracing::error!(
            component = name,
            panic = %panic_message(payload.as_ref()),
            "Analysis component panicked"
        );
    }
    ctx.done();
}

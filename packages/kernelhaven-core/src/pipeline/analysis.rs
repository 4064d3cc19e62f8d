//! Pipeline analysis: wires providers into a component graph and drains it
//!
//! A [`PipelineFactory`] builds the graph from the starting components handed
//! out by a [`PipelineBuilder`]. [`PipelineAnalysis::run`] then starts the
//! graph and writes every result of the main component (or, for a join, of
//! each joined input in parallel) to a [`ResultCollection`].

use super::component::{component_names, start_all, AnalysisComponent, PipelineNode, RunContext};
use super::output::ResultCollection;
use super::provider_feed::ProviderFeed;
use crate::config::{ConfigError, Configuration};
use crate::errors::{HavenError, Result};
use crate::features::extraction::Provider;
use crate::shared::sync::CancellationToken;
use crate::shared::utils::{panic_message, Registry};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Builds the component graph of one analysis and returns its main component
pub trait PipelineFactory<V, B, C>: Send + Sync {
    fn create_pipeline(&self, builder: &PipelineBuilder<V, B, C>) -> Result<Arc<dyn PipelineNode>>;
}

impl<V, B, C, F> PipelineFactory<V, B, C> for F
where
    F: Fn(&PipelineBuilder<V, B, C>) -> Result<Arc<dyn PipelineNode>> + Send + Sync,
{
    fn create_pipeline(&self, builder: &PipelineBuilder<V, B, C>) -> Result<Arc<dyn PipelineNode>> {
        self(builder)
    }
}

/// Analyses selectable through `analysis.pipeline`
pub type AnalysisRegistry<V, B, C> = Registry<dyn PipelineFactory<V, B, C>>;

/// Hands out starting components for the configured providers
pub struct PipelineBuilder<V, B, C> {
    config: Arc<Configuration>,
    vm: Option<ProviderFeed<V>>,
    bm: Option<ProviderFeed<B>>,
    cm: Option<ProviderFeed<C>>,
}

impl<V, B, C> PipelineBuilder<V, B, C>
where
    V: Clone + Serialize + Send + 'static,
    B: Clone + Serialize + Send + 'static,
    C: Clone + Serialize + Send + 'static,
{
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// New starting component delivering the variability model.
    pub fn vm_component(&self) -> Result<AnalysisComponent<V>> {
        starting_component(self.vm.as_ref(), &self.config, "variability")
    }

    /// New starting component delivering the build model.
    pub fn bm_component(&self) -> Result<AnalysisComponent<B>> {
        starting_component(self.bm.as_ref(), &self.config, "build")
    }

    /// New starting component delivering every code model result.
    pub fn cm_component(&self) -> Result<AnalysisComponent<C>> {
        starting_component(self.cm.as_ref(), &self.config, "code")
    }
}

fn starting_component<T: Clone + Serialize + Send + 'static>(
    feed: Option<&ProviderFeed<T>>,
    config: &Configuration,
    model: &str,
) -> Result<AnalysisComponent<T>> {
    feed.map(|feed| feed.create_component(config))
        .ok_or_else(|| HavenError::pipeline(format!("No {model} model provider configured")))
}

/// Rows written for one output table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub outputs: Vec<OutputSummary>,
    /// Files written by the result collection, if it writes any
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl AnalysisReport {
    pub fn total_rows(&self) -> usize {
        self.outputs.iter().map(|o| o.rows).sum()
    }
}

/// An analysis over up to three model providers
///
/// The variability and build providers deliver a single result each; the
/// code provider delivers one result per source file.
pub struct PipelineAnalysis<V, B, C> {
    config: Arc<Configuration>,
    vm: Option<ProviderFeed<V>>,
    bm: Option<ProviderFeed<B>>,
    cm: Option<ProviderFeed<C>>,
    cancel: CancellationToken,
}

impl<V, B, C> PipelineAnalysis<V, B, C>
where
    V: Clone + Serialize + Send + 'static,
    B: Clone + Serialize + Send + 'static,
    C: Clone + Serialize + Send + 'static,
{
    pub fn new(config: Arc<Configuration>) -> Self {
        Self {
            config,
            vm: None,
            bm: None,
            cm: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_variability_provider(mut self, provider: Arc<Provider<V>>) -> Self {
        self.vm = Some(ProviderFeed::new(provider, false, "VM"));
        self
    }

    pub fn with_build_provider(mut self, provider: Arc<Provider<B>>) -> Self {
        self.bm = Some(ProviderFeed::new(provider, false, "BM"));
        self
    }

    pub fn with_code_provider(mut self, provider: Arc<Provider<C>>) -> Self {
        self.cm = Some(ProviderFeed::new(provider, true, "CM"));
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel the running analysis and stop all providers.
    pub fn cancel(&self) {
        tracing::info!("Cancelling analysis");
        self.cancel.cancel();
        if let Some(feed) = &self.vm {
            feed.provider().stop();
        }
        if let Some(feed) = &self.bm {
            feed.provider().stop();
        }
        if let Some(feed) = &self.cm {
            feed.provider().stop();
        }
    }

    /// Run the analysis named by `analysis.pipeline`.
    pub fn run_configured(
        &self,
        registry: &AnalysisRegistry<V, B, C>,
        results: Arc<dyn ResultCollection>,
    ) -> Result<AnalysisReport> {
        let name = self
            .config
            .analysis
            .pipeline
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("analysis.pipeline".into()))?;
        let factory = registry.create(name, &self.config)?;
        tracing::info!(analysis = name, "Running configured analysis");
        self.run(factory.as_ref(), results)
    }

    /// Build the pipeline, start it and write its results to `results`.
    pub fn run(
        &self,
        factory: &dyn PipelineFactory<V, B, C>,
        results: Arc<dyn ResultCollection>,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();
        let main = factory.create_pipeline(&self.builder())?;
        tracing::info!(
            components = ?component_names(main.as_ref()),
            "Analysis components"
        );

        if self.config.analysis.preemptively_start_extractors {
            self.start_feeds();
        }

        let joined = main.joined_inputs();
        let drained: Vec<String> = match &joined {
            Some(inputs) => inputs.iter().map(|input| input.result_name().to_string()).collect(),
            None => vec![main.result_name().to_string()],
        };
        let ctx = RunContext::new(self.cancel.clone())
            .with_results(Arc::clone(&results))
            .with_drained(drained);
        let count = start_all(main.as_ref(), &ctx);
        tracing::debug!(components = count, "Started analysis components");

        let outputs = match joined {
            Some(inputs) => drain_parallel(&inputs, &ctx, results.as_ref())?,
            None => vec![drain(main.as_ref(), &ctx, results.as_ref())?],
        };
        let files = results.close()?;

        let report = AnalysisReport {
            outputs,
            files,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            rows = report.total_rows(),
            elapsed = ?report.elapsed,
            "Analysis done"
        );
        Ok(report)
    }

    fn builder(&self) -> PipelineBuilder<V, B, C> {
        PipelineBuilder {
            config: Arc::clone(&self.config),
            vm: self.vm.clone(),
            bm: self.bm.clone(),
            cm: self.cm.clone(),
        }
    }

    fn start_feeds(&self) {
        let mut started = 0;
        if let Some(feed) = &self.vm {
            started += usize::from(feed.start());
        }
        if let Some(feed) = &self.bm {
            started += usize::from(feed.start());
        }
        if let Some(feed) = &self.cm {
            started += usize::from(feed.start());
        }
        tracing::debug!(providers = started, "Preemptively started extractors");
    }
}

fn drain(node: &dyn PipelineNode, ctx: &RunContext, results: &dyn ResultCollection) -> Result<OutputSummary> {
    let name = node.result_name().to_string();
    let mut writer = results.writer(&name)?;
    let rows = node.drain_into(ctx, writer.as_mut())?;
    writer.close()?;
    tracing::debug!(output = %name, rows, "Output written");
    Ok(OutputSummary { name, rows })
}

fn drain_parallel(
    inputs: &[Arc<dyn PipelineNode>],
    ctx: &RunContext,
    results: &dyn ResultCollection,
) -> Result<Vec<OutputSummary>> {
    thread::scope(|scope| {
        let handles = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                thread::Builder::new()
                    .name(format!("pipeline-output-{i}"))
                    .spawn_scoped(scope, move || drain(input.as_ref(), ctx, results))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        handles
            .into_iter()
            .map(|handle| {
                handle.join().map_err(|payload| {
                    HavenError::pipeline(format!(
                        "Output thread panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                })?
            })
            .collect()
    })
}

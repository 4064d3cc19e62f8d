/*
 * KernelHaven Core - Extraction Providers and Analysis Pipelines
 *
 * Runs model extractors over a product-line source tree and feeds their
 * results into a graph of concurrently running analysis components.
 *
 * Architecture:
 * - Providers (threaded extractor runs, timeouts, result caches)
 * - Model kinds (variability, build, code)
 * - Pipeline components (split, join, list collector, observable)
 * - Configuration (YAML), logging (tracing)
 */

// Public modules
pub mod config;
pub mod errors;
pub mod features;
pub mod logging;
pub mod pipeline;
pub mod shared;

// Re-exports
pub use config::{Configuration, LogSettings, ProviderSettings};
pub use errors::{HavenError, Result};
pub use features::cache::{Cache, JsonFileCache, MemoryCache, NoCache};
pub use features::extraction::{
    EmptyExtractor, Extractor, ExtractorError, FnExtractor, Provider, ProviderPolicy, ProviderState, SetUpError,
};
pub use features::models::{default_extractors, model_provider, ExtractorRegistry, ModelKind, ModelProviderPolicy};
pub use logging::init_logging;
pub use pipeline::{AnalysisComponent, PipelineAnalysis};
pub use shared::models::Target;
pub use shared::sync::{BlockingQueue, CancellationToken, Next, OrderPreservingParallelizer};

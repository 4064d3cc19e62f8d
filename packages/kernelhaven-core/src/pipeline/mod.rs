//! Analysis pipeline
//!
//! Components form a directed graph that is built as plain data first and
//! started afterwards. Each started component runs on its own thread and
//! passes its results downstream through a blocking queue.
//!
//! ```text
//! VM StartingComponent ──┐
//! CM StartingComponent ──┼─> analysis ─> Split ─┬─> branch ─> List ─┐
//!                        │                      └─> branch ─────────┼─> Join
//! BM StartingComponent ──┘                                          │
//! ```

mod analysis;
mod component;
mod fanout;
mod join;
mod list_collector;
mod observable;
mod output;
mod provider_feed;
mod split;

pub use analysis::{
    AnalysisRegistry, AnalysisReport, OutputSummary, PipelineAnalysis, PipelineBuilder, PipelineFactory,
};
pub use component::{
    component_names, start_all, AnalysisComponent, ComponentLogic, ExecutionContext, PipelineNode, RunContext,
};
pub use join::JoinComponent;
pub use list_collector::ListCollectorComponent;
pub use observable::{AnalysisObserver, ObservableComponent};
pub use output::{DirectoryResultCollection, MemoryResultCollection, ResultCollection, ResultWriter};
pub use provider_feed::ProviderFeed;
pub use split::SplitComponent;

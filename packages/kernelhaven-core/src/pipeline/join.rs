//! Join: terminal sink over several pipeline heads

use super::component::{AnalysisComponent, ComponentLogic, ExecutionContext, PipelineNode};
use crate::config::Configuration;
use std::sync::Arc;

/// Produces nothing itself; a pipeline runner drains each input in parallel.
///
/// Typically joins the heads of several split branches so that all of them
/// belong to one pipeline.
pub struct JoinComponent {
    inputs: Vec<Arc<dyn PipelineNode>>,
}

impl JoinComponent {
    pub fn new(inputs: Vec<Arc<dyn PipelineNode>>) -> Self {
        Self { inputs }
    }

    pub fn create(config: &Configuration, inputs: Vec<Arc<dyn PipelineNode>>) -> AnalysisComponent<()> {
        AnalysisComponent::new(config, Self::new(inputs))
    }
}

impl ComponentLogic<()> for JoinComponent {
    fn execute(&self, _ctx: &ExecutionContext<'_, ()>) {}

    fn result_name(&self) -> &str {
        "JoinComponent"
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        self.inputs.clone()
    }

    fn is_internal_helper(&self) -> bool {
        true
    }

    fn joined_inputs(&self) -> Option<Vec<Arc<dyn PipelineNode>>> {
        Some(self.inputs.clone())
    }
}

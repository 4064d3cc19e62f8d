//! List collector: materializes its whole input into one list

use super::component::{AnalysisComponent, ComponentLogic, ExecutionContext, PipelineNode};
use crate::config::Configuration;
use serde::Serialize;
use std::sync::Arc;

pub struct ListCollectorComponent<T> {
    input: AnalysisComponent<T>,
    name: String,
}

impl<T: Serialize + Send + 'static> ListCollectorComponent<T> {
    pub fn new(input: AnalysisComponent<T>) -> Self {
        let name = format!("{} List", input.result_name());
        Self { input, name }
    }

    pub fn create(config: &Configuration, input: AnalysisComponent<T>) -> AnalysisComponent<Vec<T>> {
        AnalysisComponent::new(config, Self::new(input))
    }
}

impl<T: Serialize + Send + 'static> ComponentLogic<Vec<T>> for ListCollectorComponent<T> {
    fn execute(&self, ctx: &ExecutionContext<'_, Vec<T>>) {
        let mut collected = Vec::new();
        while let Some(item) = ctx.next_from(&self.input) {
            collected.push(item);
        }
        ctx.emit(collected);
    }

    fn result_name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        vec![self.input.as_node()]
    }
}

//! Observable component: passes results through and reports them at the end

use super::component::{AnalysisComponent, ComponentLogic, ExecutionContext, PipelineNode};
use crate::config::Configuration;
use serde::Serialize;
use std::sync::Arc;

/// Notified once the observed component has finished
pub trait AnalysisObserver<I>: Send + Sync {
    fn notify_finished(&self, results: &[I]);

    /// The observed component finished without any result.
    fn notify_empty(&self);
}

pub struct ObservableComponent<I> {
    input: AnalysisComponent<I>,
    observers: Vec<Arc<dyn AnalysisObserver<I>>>,
    name: String,
}

impl<I: Clone + Serialize + Send + 'static> ObservableComponent<I> {
    pub fn new(input: AnalysisComponent<I>, observers: Vec<Arc<dyn AnalysisObserver<I>>>) -> Self {
        let name = format!("Observed {}", input.result_name());
        Self {
            input,
            observers,
            name,
        }
    }

    pub fn create(
        config: &Configuration,
        input: AnalysisComponent<I>,
        observers: Vec<Arc<dyn AnalysisObserver<I>>>,
    ) -> AnalysisComponent<I> {
        AnalysisComponent::new(config, Self::new(input, observers))
    }
}

impl<I: Clone + Serialize + Send + 'static> ComponentLogic<I> for ObservableComponent<I> {
    fn execute(&self, ctx: &ExecutionContext<'_, I>) {
        let mut results = Vec::new();
        while let Some(item) = ctx.next_from(&self.input) {
            ctx.emit(item.clone());
            results.push(item);
        }

        for observer in &self.observers {
            if results.is_empty() {
                observer.notify_empty();
            } else {
                observer.notify_finished(&results);
            }
        }
    }

    fn result_name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        vec![self.input.as_node()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Fixed(Vec<u8>);

    impl ComponentLogic<u8> for Fixed {
        fn execute(&self, ctx: &ExecutionContext<'_, u8>) {
            for n in &self.0 {
                ctx.emit(*n);
            }
        }

        fn result_name(&self) -> &str {
            "Fixed"
        }
    }

    #[derive(Default)]
    struct Recorder {
        finished: Mutex<Option<Vec<u8>>>,
        empty: Mutex<bool>,
    }

    impl AnalysisObserver<u8> for Recorder {
        fn notify_finished(&self, results: &[u8]) {
            *self.finished.lock() = Some(results.to_vec());
        }

        fn notify_empty(&self) {
            *self.empty.lock() = true;
        }
    }

    fn observe(values: Vec<u8>) -> (Vec<u8>, Arc<Recorder>) {
        let config = Configuration::default();
        let recorder = Arc::new(Recorder::default());
        let observed = ObservableComponent::create(
            &config,
            AnalysisComponent::new(&config, Fixed(values)),
            vec![recorder.clone() as Arc<dyn AnalysisObserver<u8>>],
        );
        let passed: Vec<u8> = std::iter::from_fn(|| observed.next_result()).collect();
        (passed, recorder)
    }

    #[test]
    fn test_passes_through_and_notifies() {
        let (passed, recorder) = observe(vec![3, 1, 2]);
        assert_eq!(passed, vec![3, 1, 2]);
        assert_eq!(*recorder.finished.lock(), Some(vec![3, 1, 2]));
        assert!(!*recorder.empty.lock());
    }

    #[test]
    fn test_empty_input_notifies_empty() {
        let (passed, recorder) = observe(Vec::new());
        assert!(passed.is_empty());
        assert!(*recorder.empty.lock());
        assert!(recorder.finished.lock().is_none());
    }
}

//! End-to-end tests of pipeline analyses over real providers

mod common;

use common::*;
use kernelhaven_core::pipeline::{
    AnalysisObserver, AnalysisRegistry, ComponentLogic, DirectoryResultCollection, ExecutionContext,
    JoinComponent, ListCollectorComponent, MemoryResultCollection, ObservableComponent, PipelineBuilder,
    PipelineNode, SplitComponent,
};
use kernelhaven_core::{model_provider, AnalysisComponent, Configuration, ModelKind, PipelineAnalysis, Result};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

type Analysis = PipelineAnalysis<String, String, String>;
type Builder = PipelineBuilder<String, String, String>;

/// Counts the code model results per directory
struct FilesPerDirectory {
    input: AnalysisComponent<String>,
}

impl ComponentLogic<(String, usize)> for FilesPerDirectory {
    fn execute(&self, ctx: &ExecutionContext<'_, (String, usize)>) {
        let mut counts = std::collections::BTreeMap::<String, usize>::new();
        while let Some(file) = ctx.next_from(&self.input) {
            let dir = file.rsplit_once('/').map_or("", |(dir, _)| dir).to_string();
            *counts.entry(dir).or_default() += 1;
        }
        for entry in counts {
            ctx.emit(entry);
        }
    }

    fn result_name(&self) -> &str {
        "Files Per Directory"
    }

    fn inputs(&self) -> Vec<Arc<dyn PipelineNode>> {
        vec![self.input.as_node()]
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Option<Vec<String>>>,
}

impl AnalysisObserver<String> for Recorder {
    fn notify_finished(&self, results: &[String]) {
        *self.seen.lock() = Some(results.to_vec());
    }

    fn notify_empty(&self) {
        *self.seen.lock() = Some(Vec::new());
    }
}

fn analysis(config: Configuration) -> Analysis {
    let config = Arc::new(config);
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));
    let vm = model_provider(ModelKind::Variability, &registry, Arc::clone(&config)).unwrap();
    let cm = model_provider(ModelKind::Code, &registry, Arc::clone(&config)).unwrap();
    Analysis::new(config)
        .with_variability_provider(Arc::new(vm))
        .with_code_provider(Arc::new(cm))
}

fn per_directory(builder: &Builder) -> Result<Arc<dyn PipelineNode>> {
    let config = builder.config();
    let split = SplitComponent::new(config, builder.cm_component()?);
    let counts = AnalysisComponent::new(config, FilesPerDirectory {
        input: split.create_output_component(),
    });
    let files = ListCollectorComponent::create(config, split.create_output_component());
    Ok(JoinComponent::create(config, vec![counts.as_node(), files.as_node()]).as_node())
}

#[test]
fn split_join_writes_one_file_per_output() {
    let tree = source_tree(&["init.c", "drivers/net.c", "drivers/usb.c", "fs/ext4.c"]);
    let out = tempfile::TempDir::new().unwrap();
    let config = Configuration::from_yaml_str(&config_yaml(
        tree.path(),
        "code:\n  extractor: names\n  threads: 2\n",
    ))
    .unwrap()
    .with_output_dir(out.path());

    let analysis = analysis(config);
    let results = DirectoryResultCollection::from_config(analysis.config()).unwrap();
    let report = analysis.run(&per_directory, Arc::new(results)).unwrap();

    assert_eq!(report.outputs.len(), 2);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.outputs[0].name, "Files Per Directory");
    assert_eq!(report.outputs[0].rows, 3);

    let counts = fs::read_to_string(out.path().join("Files_Per_Directory.jsonl")).unwrap();
    assert_eq!(counts, "[\"\",1]\n[\"drivers\",2]\n[\"fs\",1]\n");
}

#[test]
fn intermediate_results_are_logged_without_preemptive_start() {
    let tree = source_tree(&["a.c", "b.c"]);
    let config = Configuration::from_yaml_str(&config_yaml(
        tree.path(),
        "code:\n  extractor: names\n\
         analysis:\n  preemptively_start_extractors: false\n  log_intermediate_results: [CM StartingComponent]\n",
    ))
    .unwrap();
    let analysis = analysis(config);

    let recorder = Arc::new(Recorder::default());
    let observers = vec![recorder.clone() as Arc<dyn AnalysisObserver<String>>];
    let factory = move |builder: &Builder| -> Result<Arc<dyn PipelineNode>> {
        let observed = ObservableComponent::create(builder.config(), builder.cm_component()?, observers.clone());
        Ok(observed.as_node())
    };

    let results = MemoryResultCollection::new();
    let report = analysis.run(&factory, Arc::new(results.clone())).unwrap();

    assert_eq!(report.total_rows(), 2);
    assert_eq!(results.table("CM StartingComponent"), vec![json!("a.c"), json!("b.c")]);
    assert_eq!(results.table("Observed CM StartingComponent"), vec![json!("a.c"), json!("b.c")]);
    assert_eq!(*recorder.seen.lock(), Some(vec!["a.c".to_string(), "b.c".to_string()]));
}

#[test]
fn configured_pipeline_runs_from_registry() {
    let tree = source_tree(&["a.c"]);
    let config = Configuration::from_yaml_str(&config_yaml(
        tree.path(),
        "variability:\n  extractor: names\nanalysis:\n  pipeline: variability\n",
    ))
    .unwrap();
    let analysis = analysis(config);

    let mut registry: AnalysisRegistry<String, String, String> = AnalysisRegistry::new("analysis");
    registry.register("variability", |_| {
        Ok(Box::new(|builder: &Builder| -> Result<Arc<dyn PipelineNode>> {
            Ok(builder.vm_component()?.as_node())
        }))
    });
    registry.register("split-join", |_| Ok(Box::new(per_directory)));

    let results = MemoryResultCollection::new();
    let report = analysis.run_configured(&registry, Arc::new(results.clone())).unwrap();

    assert_eq!(report.total_rows(), 1);
    assert_eq!(
        results.table("VM StartingComponent"),
        vec![json!(tree.path().display().to_string())]
    );
}

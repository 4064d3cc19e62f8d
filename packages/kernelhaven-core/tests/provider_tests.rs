//! End-to-end tests of model providers configured from YAML

mod common;

use common::*;
use kernelhaven_core::{
    model_provider, Cache, Configuration, JsonFileCache, ModelKind, ProviderState, SetUpError, Target,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn load(yaml: &str) -> Arc<Configuration> {
    Arc::new(Configuration::from_yaml_str(yaml).expect("valid configuration"))
}

#[test]
fn code_provider_extracts_every_matching_file() {
    let tree = source_tree(&["init.c", "drivers/net.c", "drivers/net.h", "README"]);
    let config = load(&config_yaml(
        tree.path(),
        "code:\n  extractor: names\n  threads: 3\n",
    ));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));

    let provider = model_provider(ModelKind::Code, &registry, config).unwrap();
    let mut results = collect_results(&provider);
    results.sort();

    assert_eq!(results, vec!["drivers/net.c", "init.c"]);
    assert_no_exceptions(&provider);
    assert_eq!(provider.state(), ProviderState::Finished);
}

#[test]
fn code_files_restrict_targets() {
    let tree = source_tree(&["init.c", "drivers/net.c", "drivers/usb.c", "lib/a.c"]);
    let config = load(&config_yaml(
        tree.path(),
        "code:\n  extractor: names\n  files: [drivers, init.c]\n",
    ));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));

    let provider = model_provider(ModelKind::Code, &registry, config).unwrap();
    let mut results = collect_results(&provider);
    results.sort();

    assert_eq!(results, vec!["drivers/net.c", "drivers/usb.c", "init.c"]);
}

#[test]
fn missing_code_file_surfaces_single_exception() {
    let tree = source_tree(&["init.c"]);
    let config = load(&config_yaml(
        tree.path(),
        "code:\n  extractor: names\n  files: [missing.c]\n",
    ));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));
    let provider = model_provider(ModelKind::Code, &registry, config).unwrap();

    assert!(matches!(provider.start(), Err(SetUpError::Targets(_))));
    assert!(collect_results(&provider).is_empty());
    let errors = collect_exceptions(&provider);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("missing.c"));
}

#[test]
fn variability_provider_delivers_one_result_for_the_tree() {
    let tree = source_tree(&["Kconfig"]);
    let config = load(&config_yaml(tree.path(), "variability:\n  extractor: names\n"));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));

    let provider = model_provider(ModelKind::Variability, &registry, config).unwrap();
    assert_eq!(provider.result(), Some(tree.path().display().to_string()));
    // peeking does not consume
    assert_eq!(provider.next_result(), Some(tree.path().display().to_string()));
    assert_eq!(provider.next_result(), None);
}

#[test]
fn unknown_extractor_is_rejected() {
    let tree = source_tree(&[]);
    let config = load(&config_yaml(tree.path(), "build:\n  extractor: kbuildminer\n"));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));

    let err = model_provider(ModelKind::Build, &registry, config).err().unwrap();
    assert!(matches!(err, SetUpError::UnknownHandler { .. }));
    assert!(err.to_string().contains("names"));
}

#[test]
fn slow_extractor_times_out() {
    let tree = source_tree(&["a.c"]);
    let config = load(&config_yaml(
        tree.path(),
        "code:\n  extractor: slow\n  timeout_ms: 20\n",
    ));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));
    let provider = model_provider(ModelKind::Code, &registry, config).unwrap();

    assert_eq!(provider.next_result(), None);
    let errors = collect_exceptions(&provider);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().starts_with("Timeout reached"));
    assert_eq!(provider.state(), ProviderState::Finished);

    // the late result is dropped, not delivered
    std::thread::sleep(std::time::Duration::from_millis(400));
    assert_eq!(provider.next_result(), None);
}

#[test]
fn lazy_start_matches_explicit_start() {
    let tree = source_tree(&["a.c", "b.c"]);
    let config = load(&config_yaml(tree.path(), "code:\n  extractor: names\n"));
    let registry = test_extractors(Arc::new(AtomicUsize::new(0)));

    let explicit = model_provider(ModelKind::Code, &registry, Arc::clone(&config)).unwrap();
    explicit.start().unwrap();
    let lazy = model_provider(ModelKind::Code, &registry, config).unwrap();
    assert_eq!(lazy.state(), ProviderState::Configured);

    let mut a = collect_results(&explicit);
    let mut b = collect_results(&lazy);
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn corrupted_cache_entry_is_recomputed_and_rewritten() {
    let tree = source_tree(&["a.c"]);
    let cache_dir = tempfile::TempDir::new().unwrap();
    let yaml = format!(
        "{}cache_dir: {}\n",
        config_yaml(
            tree.path(),
            "code:\n  extractor: counting\n  cache_read: true\n  cache_write: true\n",
        ),
        cache_dir.path().display()
    );
    let config = load(&yaml);

    let cache = JsonFileCache::<String>::new(cache_dir.path().join("code")).unwrap();
    let entry = cache.entry_path(&Target::new("a.c"));
    fs::write(&entry, "{ not json").unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = test_extractors(Arc::clone(&calls));

    let provider = model_provider(ModelKind::Code, &registry, Arc::clone(&config)).unwrap();
    assert_eq!(collect_results(&provider), vec!["a.c"]);
    assert_no_exceptions(&provider);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.read(&Target::new("a.c")).unwrap(), Some("a.c".to_string()));

    // second run is served from the rewritten entry
    provider.set_config(config).unwrap();
    assert_eq!(collect_results(&provider), vec!["a.c"]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

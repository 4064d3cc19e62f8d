//! Test fixture generators

use kernelhaven_core::{default_extractors, ExtractorError, ExtractorRegistry, FnExtractor, Target};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary source tree containing `files` (relative paths).
pub fn source_tree(files: &[&str]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for file in files {
        let path = dir.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, format!("/* {file} */\n")).expect("write source file");
    }
    dir
}

/// Minimal YAML configuration rooted at `source_tree`, followed by `rest`.
pub fn config_yaml(source_tree: &Path, rest: &str) -> String {
    format!("version: 1\nsource_tree: {}\n{rest}", source_tree.display())
}

/// Extractor registry with:
/// - `empty`: the built-in empty extractor
/// - `names`: returns the target path
/// - `counting`: like `names`, increments `calls` on every run
/// - `slow`: sleeps 300 ms before returning the target path
pub fn test_extractors(calls: Arc<AtomicUsize>) -> ExtractorRegistry<String> {
    let mut registry = default_extractors::<String>();
    registry.register("names", |_| Ok(Box::new(FnExtractor::new("names", target_name))));
    registry.register("counting", move |_| {
        let calls = Arc::clone(&calls);
        Ok(Box::new(FnExtractor::new("counting", move |target: &Target| {
            calls.fetch_add(1, Ordering::SeqCst);
            target_name(target)
        })))
    });
    registry.register("slow", |_| {
        Ok(Box::new(FnExtractor::new("slow", |target: &Target| {
            std::thread::sleep(Duration::from_millis(300));
            target_name(target)
        })))
    });
    registry
}

fn target_name(target: &Target) -> Result<String, ExtractorError> {
    Ok(target.path().display().to_string())
}

//! Result sinks for pipeline output
//!
//! Every component that writes output gets one [`ResultWriter`] named after
//! its result name. Rows are JSON values.

use crate::config::{ConfigError, Configuration};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One output table
pub trait ResultWriter: Send {
    fn write_row(&mut self, row: &Value) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Factory of named output tables
pub trait ResultCollection: Send + Sync {
    fn writer(&self, name: &str) -> io::Result<Box<dyn ResultWriter>>;

    /// Flush everything; returns the files written, if any.
    fn close(&self) -> io::Result<Vec<PathBuf>>;
}

/// Collects rows in memory, keyed by table name
#[derive(Default, Clone)]
pub struct MemoryResultCollection {
    tables: Arc<Mutex<BTreeMap<String, Vec<Value>>>>,
}

impl MemoryResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of a closed table (empty if unknown).
    pub fn table(&self, name: &str) -> Vec<Value> {
        self.tables.lock().get(name).cloned().unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.lock().keys().cloned().collect()
    }
}

impl ResultCollection for MemoryResultCollection {
    fn writer(&self, name: &str) -> io::Result<Box<dyn ResultWriter>> {
        self.tables.lock().entry(name.to_string()).or_default();
        Ok(Box::new(MemoryWriter {
            name: name.to_string(),
            rows: Vec::new(),
            tables: Arc::clone(&self.tables),
        }))
    }

    fn close(&self) -> io::Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

struct MemoryWriter {
    name: String,
    rows: Vec<Value>,
    tables: Arc<Mutex<BTreeMap<String, Vec<Value>>>>,
}

impl ResultWriter for MemoryWriter {
    fn write_row(&mut self, row: &Value) -> io::Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let rows = std::mem::take(&mut self.rows);
        self.tables
            .lock()
            .entry(self.name.clone())
            .or_default()
            .extend(rows);
        Ok(())
    }
}

/// Writes one JSON-lines file per table into a directory
pub struct DirectoryResultCollection {
    dir: PathBuf,
    files: Mutex<Vec<PathBuf>>,
}

impl DirectoryResultCollection {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Mutex::new(Vec::new()),
        })
    }

    /// Collection in the configured `output_dir`.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self::new(config.require_output_dir()?)?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultCollection for DirectoryResultCollection {
    fn writer(&self, name: &str) -> io::Result<Box<dyn ResultWriter>> {
        let stem = file_stem(name);
        let mut files = self.files.lock();

        let mut path = self.dir.join(format!("{stem}.jsonl"));
        let mut n = 2;
        while files.contains(&path) {
            path = self.dir.join(format!("{stem}_{n}.jsonl"));
            n += 1;
        }

        let out = BufWriter::new(File::create(&path)?);
        files.push(path);
        Ok(Box::new(JsonLinesWriter { out }))
    }

    fn close(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.files.lock().clone())
    }
}

struct JsonLinesWriter {
    out: BufWriter<File>,
}

impl ResultWriter for JsonLinesWriter {
    fn write_row(&mut self, row: &Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, row)?;
        self.out.write_all(b"\n")
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

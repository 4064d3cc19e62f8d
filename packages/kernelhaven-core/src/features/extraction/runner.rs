//! Extractor runner
//!
//! Runs an [`Extractor`] over a list of targets with N worker threads pulling
//! from a shared target queue. A supervisor thread joins the workers and then
//! ends the run's result and exception queues exactly once.

use super::error::{ExtractorError, SetUpError};
use super::ports::Extractor;
use crate::config::Configuration;
use crate::features::cache::Cache;
use crate::shared::models::Target;
use crate::shared::sync::{BlockingQueue, Next};
use crate::shared::utils::{panic_message, ProgressLogger};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result and exception queues of one extraction run
///
/// Every run gets fresh channels, so workers that outlive a stopped run can
/// never reach the queues of a later run.
pub struct RunChannels<R> {
    results: Arc<BlockingQueue<R>>,
    exceptions: Arc<BlockingQueue<ExtractorError>>,
    stopped: Mutex<bool>,
}

impl<R> RunChannels<R> {
    pub fn new() -> Self {
        Self {
            results: Arc::new(BlockingQueue::new()),
            exceptions: Arc::new(BlockingQueue::new()),
            stopped: Mutex::new(false),
        }
    }

    pub fn results(&self) -> &Arc<BlockingQueue<R>> {
        &self.results
    }

    pub fn exceptions(&self) -> &Arc<BlockingQueue<ExtractorError>> {
        &self.exceptions
    }

    /// Hand a result to consumers. Dropped (returns `false`) once stopped.
    pub fn add_result(&self, result: R) -> bool {
        let stopped = self.stopped.lock();
        if *stopped {
            tracing::debug!("Dropping extractor result that arrived after stop");
            return false;
        }
        self.results.add(result)
    }

    /// Hand an error to consumers. Dropped (returns `false`) once stopped.
    pub fn add_exception(&self, error: ExtractorError) -> bool {
        let stopped = self.stopped.lock();
        if *stopped {
            tracing::debug!(error = %error, "Dropping extractor error that arrived after stop");
            return false;
        }
        self.exceptions.add(error)
    }

    /// No more results are coming: end both queues together.
    pub fn finish(&self) {
        self.results.end();
        self.exceptions.end();
    }

    /// Cooperative stop: end both queues and silence all later calls.
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock();
        *stopped = true;
        self.finish();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Report a setup failure as the single exception of this run and end it.
    pub(crate) fn fail(&self, error: &SetUpError) {
        self.add_exception(ExtractorError::new(error.to_string()));
        self.finish();
    }
}

impl<R> Default for RunChannels<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one run needs besides the extractor
pub struct RunJob<R> {
    pub targets: Vec<Target>,
    pub threads: usize,
    pub cache: Arc<dyn Cache<R>>,
    pub read_cache: bool,
    pub write_cache: bool,
    pub progress_interval: Duration,
}

/// Owns one extractor and runs it at most once at a time
pub struct ExtractorRunner<R> {
    name: String,
    extractor: Arc<RwLock<Box<dyn Extractor<R>>>>,
    running: Arc<Mutex<bool>>,
}

impl<R: Send + 'static> ExtractorRunner<R> {
    pub fn new(extractor: Box<dyn Extractor<R>>) -> Self {
        Self {
            name: extractor.name().to_string(),
            extractor: Arc::new(RwLock::new(extractor)),
            running: Arc::new(Mutex::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    /// Initialize the extractor for a new configuration.
    pub fn init(&self, config: &Configuration) -> Result<(), SetUpError> {
        let running = self.running.lock();
        if *running {
            return Err(SetUpError::Running {
                extractor: self.name.clone(),
            });
        }
        self.extractor.write().init(config)
    }

    /// Spawn the workers and the supervisor for `job`; returns immediately.
    pub fn run(&self, job: RunJob<R>, channels: Arc<RunChannels<R>>) -> Result<(), SetUpError> {
        {
            let mut running = self.running.lock();
            if *running {
                return Err(SetUpError::Running {
                    extractor: self.name.clone(),
                });
            }
            *running = true;
        }

        let targets = Arc::new(BlockingQueue::new());
        let total = job.targets.len();
        for target in job.targets {
            targets.add(target);
        }
        targets.end();

        let progress = Arc::new(ProgressLogger::new(&self.name, total, job.progress_interval));
        let cache = Arc::new(CacheUse {
            cache: job.cache,
            read: job.read_cache,
            write: job.write_cache,
        });

        let mut workers = Vec::with_capacity(job.threads);
        for i in 0..job.threads.max(1) {
            let name = format!("{}-{}", self.name, i);
            let worker = Worker {
                extractor: Arc::clone(&self.extractor),
                targets: Arc::clone(&targets),
                cache: Arc::clone(&cache),
                channels: Arc::clone(&channels),
                progress: Arc::clone(&progress),
            };
            match thread::Builder::new().name(name.clone()).spawn(move || worker.run()) {
                Ok(handle) => workers.push(handle),
                Err(source) if workers.is_empty() => {
                    *self.running.lock() = false;
                    return Err(SetUpError::Spawn { name, source });
                }
                Err(source) => {
                    tracing::warn!(
                        thread = %name,
                        error = %source,
                        "Could not spawn extractor worker, continuing with fewer threads"
                    );
                    break;
                }
            }
        }

        tracing::info!(
            extractor = %self.name,
            targets = total,
            threads = workers.len(),
            "Extractor started"
        );

        let name = self.name.clone();
        let running = Arc::clone(&self.running);
        let supervisor_channels = Arc::clone(&channels);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || supervise(&name, workers, &progress, &supervisor_channels, &running));

        if let Err(source) = spawned {
            // Without a supervisor nobody would end the queues.
            channels.stop();
            *self.running.lock() = false;
            return Err(SetUpError::Spawn {
                name: self.name.clone(),
                source,
            });
        }
        Ok(())
    }
}

struct CacheUse<R> {
    cache: Arc<dyn Cache<R>>,
    read: bool,
    write: bool,
}

struct Worker<R> {
    extractor: Arc<RwLock<Box<dyn Extractor<R>>>>,
    targets: Arc<BlockingQueue<Target>>,
    cache: Arc<CacheUse<R>>,
    channels: Arc<RunChannels<R>>,
    progress: Arc<ProgressLogger>,
}

impl<R> Worker<R> {
    fn run(self) {
        let extractor = self.extractor.read();
        while let Next::Item(target) = self.targets.get() {
            if self.channels.is_stopped() {
                tracing::debug!(target = %target, "Run stopped, skipping remaining targets");
                break;
            }
            match self.extract(&**extractor, &target) {
                Ok(result) => {
                    self.channels.add_result(result);
                }
                Err(error) => {
                    tracing::warn!(target = %target, error = %error, "Extraction failed");
                    self.channels.add_exception(error);
                }
            }
            self.progress.processed_one();
        }
    }

    fn extract(&self, extractor: &dyn Extractor<R>, target: &Target) -> Result<R, ExtractorError> {
        if self.cache.read {
            match self.cache.cache.read(target) {
                Ok(Some(result)) => {
                    tracing::debug!(target = %target, "Cache hit");
                    return Ok(result);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target = %target, error = %e, "Could not read cache, running extractor");
                }
            }
        }

        let result = match catch_unwind(AssertUnwindSafe(|| extractor.run_on_file(target))) {
            Ok(result) => result?,
            Err(payload) => {
                return Err(ExtractorError::for_target(
                    target,
                    format!("Extractor panicked: {}", panic_message(payload.as_ref())),
                ));
            }
        };

        if self.cache.write {
            if let Err(e) = self.cache.cache.write(target, &result) {
                tracing::warn!(target = %target, error = %e, "Could not write cache");
            }
        }
        Ok(result)
    }
}

fn supervise<R>(
    name: &str,
    workers: Vec<JoinHandle<()>>,
    progress: &ProgressLogger,
    channels: &RunChannels<R>,
    running: &Mutex<bool>,
) {
    for worker in workers {
        if worker.join().is_err() {
            tracing::error!(extractor = name, "Extractor worker terminated abnormally");
        }
    }
    progress.close();

    let mut running = running.lock();
    channels.finish();
    *running = false;
}

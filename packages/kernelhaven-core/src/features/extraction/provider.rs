//! Provider: synchronization facade between an extractor and its consumers
//!
//! Owns the runner, the cache and the per-run result/exception queues. Every
//! result getter starts the extractor on demand and applies the configured
//! timeout.

use super::error::{ExtractorError, SetUpError};
use super::ports::{Extractor, ProviderPolicy};
use super::runner::{ExtractorRunner, RunChannels, RunJob};
use crate::config::Configuration;
use crate::features::cache::Cache;
use crate::shared::sync::BlockingQueue;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    NotConfigured,
    Configured,
    Running,
    Finished,
}

/// Extraction provider for results of type `R`
///
/// # Example
/// ```
/// use kernelhaven_core::config::Configuration;
/// use kernelhaven_core::features::extraction::{EmptyExtractor, Provider};
/// use kernelhaven_core::features::models::{ModelKind, ModelProviderPolicy};
///
/// let provider: Provider<Vec<String>> = Provider::new(
///     Box::new(EmptyExtractor::new()),
///     Box::new(ModelProviderPolicy::new(ModelKind::Variability)),
/// );
/// provider
///     .set_config(Configuration::default().with_source_tree("."))
///     .unwrap();
///
/// // No explicit start needed: the first pull starts the extractor.
/// assert_eq!(provider.next_result(), Some(Vec::new()));
/// assert_eq!(provider.next_result(), None);
/// assert!(provider.next_exception().is_none());
/// ```
pub struct Provider<R> {
    runner: ExtractorRunner<R>,
    policy: Box<dyn ProviderPolicy<R>>,
    config: RwLock<Option<Arc<Configuration>>>,
    cache: RwLock<Option<Arc<dyn Cache<R>>>>,
    channels: Mutex<Arc<RunChannels<R>>>,
    start_lock: Mutex<()>,
}

impl<R: Send + 'static> Provider<R> {
    pub fn new(extractor: Box<dyn Extractor<R>>, policy: Box<dyn ProviderPolicy<R>>) -> Self {
        Self {
            runner: ExtractorRunner::new(extractor),
            policy,
            config: RwLock::new(None),
            cache: RwLock::new(None),
            channels: Mutex::new(Arc::new(RunChannels::new())),
            start_lock: Mutex::new(()),
        }
    }

    /// Name of the owned extractor
    pub fn name(&self) -> &str {
        self.runner.name()
    }

    /// Initialize the extractor and (re)create the cache.
    ///
    /// Fails while an extraction is running. A new configuration also gets
    /// fresh queues, so the next pull runs the extractor again.
    pub fn set_config(&self, config: impl Into<Arc<Configuration>>) -> Result<(), SetUpError> {
        let config = config.into();
        let _start = self.start_lock.lock();

        self.runner.init(&config)?;
        let cache = self.policy.create_cache(&config)?;

        *self.cache.write() = Some(cache);
        *self.config.write() = Some(config);
        *self.channels.lock() = Arc::new(RunChannels::new());

        tracing::debug!(extractor = %self.name(), "Provider configured");
        Ok(())
    }

    /// Start the extractor with fresh queues.
    ///
    /// Any failure other than "already running" is also surfaced as the single
    /// exception of the run, and the result queue is ended.
    pub fn start(&self) -> Result<(), SetUpError> {
        let _start = self.start_lock.lock();
        self.start_locked()
    }

    fn start_locked(&self) -> Result<(), SetUpError> {
        if self.runner.is_running() {
            return Err(SetUpError::Running {
                extractor: self.name().to_string(),
            });
        }

        let configured = self.config.read().clone().zip(self.cache.read().clone());
        let Some((config, cache)) = configured else {
            let err = SetUpError::NotConfigured {
                extractor: self.name().to_string(),
            };
            self.channels.lock().fail(&err);
            return Err(err);
        };

        let channels = Arc::new(RunChannels::new());
        *self.channels.lock() = Arc::clone(&channels);

        let targets = match self.policy.targets(&config) {
            Ok(targets) => targets,
            Err(err) => {
                tracing::error!(extractor = %self.name(), error = %err, "Could not collect targets");
                channels.fail(&err);
                return Err(err);
            }
        };

        let job = RunJob {
            targets,
            threads: self.policy.number_of_threads(&config).max(1),
            cache,
            read_cache: self.policy.read_cache(&config),
            write_cache: self.policy.write_cache(&config),
            progress_interval: config.log.progress_interval(),
        };
        if let Err(err) = self.runner.run(job, Arc::clone(&channels)) {
            channels.fail(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Start the extractor if it is not running and the current run has not
    /// ended yet; returns the channels of the current run.
    fn ensure_started(&self) -> Arc<RunChannels<R>> {
        let _start = self.start_lock.lock();
        let current = Arc::clone(&self.channels.lock());
        if !self.runner.is_running() && !current.results().is_closed() {
            if let Err(err) = self.start_locked() {
                tracing::warn!(extractor = %self.name(), error = %err, "Implicit start failed");
            }
        }
        Arc::clone(&self.channels.lock())
    }

    fn timeout(&self) -> Duration {
        match self.config.read().as_ref() {
            Some(config) => self.policy.timeout(config),
            None => Duration::ZERO,
        }
    }

    /// Consume the next result; `None` at end of stream or on timeout.
    ///
    /// On timeout an [`ExtractorError`] is put on the exception queue and the
    /// run is stopped; results arriving afterwards are dropped.
    pub fn next_result(&self) -> Option<R> {
        let channels = self.ensure_started();
        let timeout = self.timeout();
        match channels.results().get_timeout(timeout) {
            Ok(next) => next.into_item(),
            Err(_) => {
                self.timed_out(&channels, timeout);
                None
            }
        }
    }

    /// Queue of the current run, starting the extractor if needed.
    pub fn result_queue(&self) -> Arc<BlockingQueue<R>> {
        Arc::clone(self.ensure_started().results())
    }

    /// Consume the next error of the current run (blocks until the run ends).
    pub fn next_exception(&self) -> Option<ExtractorError> {
        let channels = Arc::clone(&self.channels.lock());
        channels.exceptions().get().into_item()
    }

    pub fn exception_queue(&self) -> Arc<BlockingQueue<ExtractorError>> {
        Arc::clone(self.channels.lock().exceptions())
    }

    /// Peek the next error of the current run (blocks until the run ends).
    pub fn exception(&self) -> Option<ExtractorError> {
        let channels = Arc::clone(&self.channels.lock());
        channels.exceptions().peek().into_item()
    }

    /// Stop the current run. Workers finish their current target quietly.
    pub fn stop(&self) {
        let channels = Arc::clone(&self.channels.lock());
        if !channels.is_stopped() {
            tracing::info!(extractor = %self.name(), "Stopping extractor");
            channels.stop();
        }
    }

    pub fn state(&self) -> ProviderState {
        let channels = Arc::clone(&self.channels.lock());
        if channels.is_stopped() {
            ProviderState::Finished
        } else if self.runner.is_running() {
            ProviderState::Running
        } else if self.config.read().is_none() {
            ProviderState::NotConfigured
        } else if channels.results().is_closed() {
            ProviderState::Finished
        } else {
            ProviderState::Configured
        }
    }

    fn timed_out(&self, channels: &RunChannels<R>, timeout: Duration) {
        tracing::warn!(
            extractor = %self.name(),
            timeout = ?timeout,
            "Timed out waiting for extractor result"
        );
        channels.add_exception(ExtractorError::timeout(timeout.as_millis()));
        channels.stop();
    }
}

impl<R: Clone + Send + 'static> Provider<R> {
    /// Peek the next result without consuming it; `None` at end of stream or on timeout.
    pub fn result(&self) -> Option<R> {
        let channels = self.ensure_started();
        let timeout = self.timeout();
        match channels.results().peek_timeout(timeout) {
            Ok(next) => next.into_item(),
            Err(_) => {
                self.timed_out(&channels, timeout);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cache::{MemoryCache, NoCache};
    use crate::shared::models::Target;
    use crate::features::extraction::FnExtractor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct FixedPolicy {
        targets: Result<Vec<Target>, String>,
        timeout: Duration,
        threads: usize,
        cache: Arc<dyn Cache<String>>,
    }

    impl FixedPolicy {
        fn new(targets: &[&str]) -> Self {
            Self {
                targets: Ok(targets.iter().map(|t| Target::from(*t)).collect()),
                timeout: Duration::ZERO,
                threads: 2,
                cache: Arc::new(NoCache),
            }
        }
    }

    impl ProviderPolicy<String> for FixedPolicy {
        fn targets(&self, _config: &Configuration) -> Result<Vec<Target>, SetUpError> {
            self.targets.clone().map_err(SetUpError::Targets)
        }

        fn timeout(&self, _config: &Configuration) -> Duration {
            self.timeout
        }

        fn create_cache(&self, _config: &Configuration) -> Result<Arc<dyn Cache<String>>, SetUpError> {
            Ok(Arc::clone(&self.cache))
        }

        fn read_cache(&self, _config: &Configuration) -> bool {
            true
        }

        fn write_cache(&self, _config: &Configuration) -> bool {
            true
        }

        fn number_of_threads(&self, _config: &Configuration) -> usize {
            self.threads
        }
    }

    fn result_of(delay: Duration) -> Box<dyn Extractor<String>> {
        Box::new(FnExtractor::new("test", move |target: &Target| {
            thread::sleep(delay);
            Ok(format!("result{target}"))
        }))
    }

    fn configured(extractor: Box<dyn Extractor<String>>, policy: FixedPolicy) -> Provider<String> {
        let provider = Provider::new(extractor, Box::new(policy));
        provider.set_config(Configuration::default()).unwrap();
        provider
    }

    #[test]
    fn test_two_targets_end_to_end() {
        let provider = configured(result_of(Duration::from_millis(10)), FixedPolicy::new(&["A", "B"]));
        provider.start().unwrap();

        let mut results = vec![provider.next_result().unwrap(), provider.next_result().unwrap()];
        results.sort();
        assert_eq!(results, vec!["resultA", "resultB"]);
        assert_eq!(provider.next_result(), None);
        assert!(provider.next_exception().is_none());
    }

    #[test]
    fn test_start_while_running_fails() {
        let provider = configured(result_of(Duration::from_millis(100)), FixedPolicy::new(&["A"]));
        provider.start().unwrap();
        assert_eq!(provider.state(), ProviderState::Running);

        assert!(matches!(provider.start(), Err(SetUpError::Running { .. })));
        assert!(matches!(
            provider.set_config(Configuration::default()),
            Err(SetUpError::Running { .. })
        ));

        assert_eq!(provider.next_result().as_deref(), Some("resultA"));
        assert_eq!(provider.next_result(), None);
    }

    #[test]
    fn test_lazy_start_matches_explicit_start() {
        let explicit = configured(result_of(Duration::ZERO), FixedPolicy::new(&["A"]));
        explicit.start().unwrap();
        let lazy = configured(result_of(Duration::ZERO), FixedPolicy::new(&["A"]));

        let explicit_results: Vec<String> = std::iter::from_fn(|| explicit.next_result()).collect();
        let lazy_results: Vec<String> = std::iter::from_fn(|| lazy.next_result()).collect();
        assert_eq!(explicit_results, lazy_results);
        assert_eq!(lazy_results, vec!["resultA"]);
    }

    #[test]
    fn test_finished_run_is_not_restarted() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let extractor = FnExtractor::new("counting", move |_: &Target| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("x".to_string())
        });
        let provider = configured(Box::new(extractor), FixedPolicy::new(&["A"]));

        assert!(provider.next_result().is_some());
        for _ in 0..3 {
            assert!(provider.next_result().is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.state(), ProviderState::Finished);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let provider = configured(result_of(Duration::ZERO), FixedPolicy::new(&["A"]));
        assert_eq!(provider.result().as_deref(), Some("resultA"));
        assert_eq!(provider.result().as_deref(), Some("resultA"));
        assert_eq!(provider.next_result().as_deref(), Some("resultA"));
        assert_eq!(provider.result(), None);
    }

    #[test]
    fn test_timeout_surfaces_exception() {
        let mut policy = FixedPolicy::new(&["A"]);
        policy.timeout = Duration::from_millis(10);
        let provider = configured(result_of(Duration::from_millis(500)), policy);

        assert_eq!(provider.next_result(), None);
        let err = provider.next_exception().unwrap();
        assert!(err.message().starts_with("Timeout reached"));
        assert_eq!(provider.state(), ProviderState::Finished);

        // The late result is dropped, the run does not restart.
        thread::sleep(Duration::from_millis(600));
        assert_eq!(provider.next_result(), None);
        assert!(provider.next_exception().is_none());
    }

    #[test]
    fn test_target_failure_is_single_exception() {
        let mut policy = FixedPolicy::new(&[]);
        policy.targets = Err("no tree".to_string());
        let provider = configured(result_of(Duration::ZERO), policy);

        assert!(matches!(provider.start(), Err(SetUpError::Targets(_))));
        assert_eq!(provider.next_result(), None);
        let err = provider.next_exception().unwrap();
        assert_eq!(err.message(), "Could not collect targets: no tree");
        assert!(provider.next_exception().is_none());
    }

    #[test]
    fn test_unconfigured_pull_does_not_block() {
        let provider = Provider::new(result_of(Duration::ZERO), Box::new(FixedPolicy::new(&["A"])));
        assert_eq!(provider.state(), ProviderState::NotConfigured);

        assert_eq!(provider.next_result(), None);
        let err = provider.next_exception().unwrap();
        assert!(err.message().contains("no configuration"));
    }

    #[test]
    fn test_cache_hit_skips_strategy() {
        let cache = Arc::new(MemoryCache::<String>::new());
        cache.insert("A", "cached".to_string());
        let mut policy = FixedPolicy::new(&["A"]);
        policy.cache = cache.clone();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let extractor = FnExtractor::new("counting", move |_: &Target| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("fresh".to_string())
        });
        let provider = configured(Box::new(extractor), policy);

        assert_eq!(provider.next_result().as_deref(), Some("cached"));
        assert_eq!(provider.next_result(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.writes(), 0);
    }

    #[test]
    fn test_reconfigure_runs_again() {
        let provider = configured(result_of(Duration::ZERO), FixedPolicy::new(&["A"]));
        assert!(provider.next_result().is_some());
        assert!(provider.next_result().is_none());

        provider.set_config(Configuration::default()).unwrap();
        assert_eq!(provider.state(), ProviderState::Configured);
        assert_eq!(provider.next_result().as_deref(), Some("resultA"));
    }
}

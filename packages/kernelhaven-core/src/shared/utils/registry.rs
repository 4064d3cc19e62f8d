//! Keyed constructor registry
//!
//! Extractors and analyses are selected by name from the configuration. The
//! registry maps each name to a constructor closure populated at startup.

use crate::config::Configuration;
use crate::features::extraction::SetUpError;
use std::collections::BTreeMap;

/// Constructor stored in a [`Registry`]
pub type Factory<T> = Box<dyn Fn(&Configuration) -> Result<Box<T>, SetUpError> + Send + Sync>;

/// Mapping from string key to constructor
///
/// # Example
/// ```
/// use kernelhaven_core::config::Configuration;
/// use kernelhaven_core::shared::utils::Registry;
///
/// trait Greeter: Send {
///     fn greet(&self) -> String;
/// }
/// struct Hello;
/// impl Greeter for Hello {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let mut registry: Registry<dyn Greeter> = Registry::new("greeter");
/// registry.register("hello", |_| Ok(Box::new(Hello)));
///
/// let greeter = registry.create("hello", &Configuration::default()).unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    factories: BTreeMap<String, Factory<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// `kind` names what is registered; it only appears in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one under the same key.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Configuration) -> Result<Box<T>, SetUpError> + Send + Sync + 'static,
    {
        let key = key.into();
        if self.factories.insert(key.clone(), Box::new(factory)).is_some() {
            tracing::debug!(kind = self.kind, key = %key, "Replaced registered handler");
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the handler registered under `key`.
    pub fn create(&self, key: &str, config: &Configuration) -> Result<Box<T>, SetUpError> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| SetUpError::UnknownHandler {
                kind: self.kind,
                key: key.to_string(),
                known: self.factories.keys().cloned().collect(),
            })?;
        factory(config)
    }
}

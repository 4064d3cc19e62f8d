//! Variability, build and code model providers

mod kind;
mod policy;

pub use kind::ModelKind;
pub use policy::{ModelProviderPolicy, DEFAULT_CODE_FILE_REGEX};

use crate::config::Configuration;
use crate::features::extraction::{EmptyExtractor, Extractor, Provider, SetUpError, EMPTY_EXTRACTOR};
use crate::shared::utils::Registry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Extractors of one model type, selected by the `extractor` key of a provider section
pub type ExtractorRegistry<R> = Registry<dyn Extractor<R>>;

/// Registry holding only the built-in [`EmptyExtractor`].
pub fn default_extractors<R>() -> ExtractorRegistry<R>
where
    R: Default + 'static,
{
    let mut registry = ExtractorRegistry::new("extractor");
    registry.register(EMPTY_EXTRACTOR, |_| Ok(Box::new(EmptyExtractor::<R>::new())));
    registry
}

/// Build and configure the provider of `kind` with the extractor named in
/// its configuration section.
pub fn model_provider<R>(
    kind: ModelKind,
    registry: &ExtractorRegistry<R>,
    config: Arc<Configuration>,
) -> Result<Provider<R>, SetUpError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let key = &kind.settings(&config).extractor;
    let extractor = registry.create(key, &config)?;
    tracing::debug!(model = %kind, extractor = %key, "Creating model provider");

    let provider = Provider::new(extractor, Box::new(ModelProviderPolicy::new(kind)));
    provider.set_config(config)?;
    Ok(provider)
}

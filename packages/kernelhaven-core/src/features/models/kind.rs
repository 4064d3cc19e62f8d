//! The three model kinds extracted from a product line

use crate::config::{Configuration, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Kconfig-style feature model; one result for the whole tree
    Variability,
    /// Build presence conditions; one result for the whole tree
    Build,
    /// One result per source file
    Code,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Variability, ModelKind::Build, ModelKind::Code];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Variability => "variability",
            ModelKind::Build => "build",
            ModelKind::Code => "code",
        }
    }

    /// Configuration section of this model's provider
    pub fn settings<'a>(&self, config: &'a Configuration) -> &'a ProviderSettings {
        match self {
            ModelKind::Variability => &config.variability,
            ModelKind::Build => &config.build,
            ModelKind::Code => &config.code,
        }
    }

    /// Whether the extractor runs once per file instead of once per tree.
    pub fn is_per_file(&self) -> bool {
        matches!(self, ModelKind::Code)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

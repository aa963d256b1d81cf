//! Loader configuration
//!
//! ```toml
//! association_types = ["IGNORE dynamic_function_ref", "IGNORE dynamic_typeref_member"]
//! element_attributes = ["IGNORE hash"]
//! association_attributes = []
//! only_root = false
//! strict_names = false
//!
//! [write]
//! strict = false
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::options::{AssociationTypeRules, AttributeRules, ParseOptions, WriteOptions};

/// Association types hidden by default when loading through the loader.
pub const DEFAULT_ASSOCIATION_RULES: &[&str] = &["IGNORE dynamic_function_ref", "IGNORE dynamic_typeref_member"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub association_types: Vec<String>,
    pub element_attributes: Vec<String>,
    pub association_attributes: Vec<String>,
    pub only_root: bool,
    pub strict_names: bool,
    pub write: WriteOptions,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            association_types: DEFAULT_ASSOCIATION_RULES.iter().map(|r| r.to_string()).collect(),
            element_attributes: Vec::new(),
            association_attributes: Vec::new(),
            only_root: false,
            strict_names: false,
            write: WriteOptions::default(),
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| FormatError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse loader config {}", path.display()))?;
        tracing::debug!("Loader config loaded from: {}", path.display());
        Ok(config)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            association_types: AssociationTypeRules::new(self.association_types.iter().cloned()),
            element_attributes: AttributeRules::new(self.element_attributes.iter().cloned()),
            association_attributes: AttributeRules::new(self.association_attributes.iter().cloned()),
            only_root: self.only_root,
            strict_names: self.strict_names,
        }
    }
}

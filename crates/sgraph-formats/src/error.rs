//! Error types for model file parsing and writing

use std::fmt;

use sgraph_core::{AssociationRef, ElementId, Graph, StructuralError};
use thiserror::Error;
use tracing::warn;

pub type Result<T> = std::result::Result<T, FormatError>;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error on '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML in '{source_name}': {message}")]
    Xml { source_name: String, message: String },

    #[error("unresolved reference '{id}' from '{element_path}' in '{source_name}'")]
    UnresolvedReference {
        source_name: String,
        element_path: String,
        id: String,
    },

    #[error("invalid model in '{source_name}': {source}")]
    InvalidModel {
        source_name: String,
        #[source]
        source: StructuralError,
    },

    #[error(transparent)]
    AttributeEncoding(#[from] AttributeEncodingError),

    #[error(transparent)]
    StructureEncoding(#[from] StructureEncodingError),

    #[error("archive error in '{name}': {message}")]
    Archive { name: String, message: String },

    #[error("invalid loader configuration: {0}")]
    Config(String),
}

impl FormatError {
    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        FormatError::Io {
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn xml(source_name: &str, message: impl fmt::Display) -> Self {
        FormatError::Xml {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    /// A graph operation failed while building the model read from `source_name`.
    pub(crate) fn invalid_model(source_name: &str, source: StructuralError) -> Self {
        FormatError::InvalidModel {
            source_name: source_name.to_string(),
            source,
        }
    }

    pub(crate) fn archive(name: &str, message: impl fmt::Display) -> Self {
        FormatError::Archive {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

/// An attribute that cannot be represented in the output format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot encode attribute '{attribute}' on '{path}': {reason}")]
pub struct AttributeEncodingError {
    pub path: String,
    pub attribute: String,
    pub reason: String,
}

/// An element or association that cannot be represented in the output format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot encode {what} '{path}': {reason}")]
pub struct StructureEncodingError {
    /// `"element"` or `"association"`.
    pub what: &'static str,
    pub path: String,
    pub reason: String,
}

impl StructureEncodingError {
    pub(crate) fn element(path: &str, reason: impl Into<String>) -> Self {
        StructureEncodingError {
            what: "element",
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Associations are identified as `from -> to (deptype)`; the root shows as `/`.
    pub(crate) fn association(graph: &Graph, assoc: &AssociationRef<'_>, reason: impl Into<String>) -> Self {
        let shown = |id: ElementId| match graph.path(id) {
            path if path.is_empty() => "/".to_string(),
            path => path,
        };
        StructureEncodingError {
            what: "association",
            path: format!("{} -> {} ({})", shown(assoc.from), shown(assoc.to), assoc.deptype),
            reason: reason.into(),
        }
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Attributes left out of the output.
    pub dropped: Vec<AttributeEncodingError>,
    /// Elements and associations left out of the output.
    pub skipped: Vec<StructureEncodingError>,
}

impl WriteReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.skipped.is_empty()
    }

    /// Record `error`, or fail with it when `strict`.
    pub(crate) fn skip(&mut self, error: StructureEncodingError, strict: bool) -> Result<()> {
        if strict {
            return Err(error.into());
        }
        warn!("Skipping {}", error);
        self.skipped.push(error);
        Ok(())
    }
}

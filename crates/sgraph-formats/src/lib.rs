//! Model file formats: XML, zipped XML and deps text

pub mod archive;
pub mod config;
pub mod deps;
pub mod error;
pub mod loader;
pub mod options;
mod order;
pub mod xml;

#[cfg(test)]
pub mod tests;

pub use config::LoaderConfig;
pub use error::{AttributeEncodingError, FormatError, StructureEncodingError, WriteReport};
pub use loader::{load_model, load_model_with, save_model, ModelFormat, MODEL_PATH_ATTR};
pub use options::{AssociationTypeRules, AttributeRules, ParseOptions, WriteOptions};

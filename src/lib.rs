//! sgraph: hierarchical software-structure models
//!
//! Re-exports the element model ([`sgraph_core`]) and the file formats
//! ([`sgraph_formats`]) under one crate.

pub use sgraph_core;
pub use sgraph_formats;

pub use sgraph_core::{
    filter, AssociationId, AttrValue, AttributePolicy, Attributes, ElementId, FilterConsistencyError,
    FilterOptions, Graph, ReachabilityPolicy, StructuralError,
};
pub use sgraph_formats::{
    load_model, save_model, FormatError, LoaderConfig, ModelFormat, ParseOptions, WriteOptions,
    WriteReport,
};

//! sgraph Core: element tree, association graph, merging and subgraph filtering

pub mod error;
pub mod filter;
pub mod graph;
mod merge;
pub mod model;


#[cfg(test)]
pub mod test_utils;

pub use error::{FilterConsistencyError, StructuralError};
pub use filter::{filter, AttributePolicy, FilterOptions, ReachabilityPolicy};
pub use graph::{Graph, Walk};
pub use model::{
    escape_name, split_path, AssociationId, AssociationRef, AttrValue, Association, Attributes,
    Element, ElementId, SharedAttributes, MERGE_MARKER, SLASH_ESCAPE, TYPE_MERGE_SEPARATOR,
};

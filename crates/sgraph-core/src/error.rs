//! Error types for structural mutation and filtering

use thiserror::Error;

use crate::model::{AssociationId, ElementId};

/// A mutation or consistency check found the tree in a state it must never reach.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("duplicate child '{name}' under '{parent_path}'")]
    DuplicateChild { parent_path: String, name: String },

    #[error("element '{path}' would become its own ancestor")]
    OwnershipCycle { path: String },

    #[error("broken parent/child link at '{path}': {detail}")]
    BrokenLink { path: String, detail: String },

    #[error("the root element cannot be {action}")]
    RootImmutable { action: &'static str },

    #[error("attribute '{attribute}' on '{path}' is not {expected}")]
    AttributeKind {
        path: String,
        attribute: String,
        expected: &'static str,
    },

    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),

    #[error("unknown association {0:?}")]
    UnknownAssociation(AssociationId),
}

/// The filtered graph diverged from its source. Always a bug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterConsistencyError {
    #[error("filtered element '{path}' has no counterpart in the source graph")]
    StructuralMismatch { path: String },

    #[error("focus element {0:?} is not part of the source graph")]
    UnknownFocus(ElementId),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

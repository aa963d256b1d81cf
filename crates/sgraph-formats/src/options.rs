//! Parse and write options

use serde::{Deserialize, Serialize};

const IGNORE_PREFIX: &str = "IGNORE ";
const WILDCARD: &str = "*";

/// Association type rules: `IGNORE <type>`, `IGNORE *`, or accepted type
/// names. Any accepted name turns the rule set into an allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationTypeRules {
    rules: Vec<String>,
}

impl AssociationTypeRules {
    pub fn new<S: Into<String>>(rules: impl IntoIterator<Item = S>) -> Self {
        AssociationTypeRules {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts(&self, deptype: &str) -> bool {
        let mut accepted = self.rules.iter().filter(|r| !r.starts_with(IGNORE_PREFIX)).peekable();
        if accepted.peek().is_some() {
            return accepted.any(|r| r == deptype);
        }
        !self
            .rules
            .iter()
            .filter_map(|r| r.strip_prefix(IGNORE_PREFIX))
            .any(|ignored| ignored == WILDCARD || ignored == deptype)
    }
}

/// Attribute rules: `IGNORE <name>`, `IGNORE *`, `*`, or allowed names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRules {
    rules: Vec<String>,
}

impl AttributeRules {
    pub fn new<S: Into<String>>(rules: impl IntoIterator<Item = S>) -> Self {
        AttributeRules {
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        let mut allowed = false;
        let mut listed = false;
        for rule in &self.rules {
            if let Some(ignored) = rule.strip_prefix(IGNORE_PREFIX) {
                if ignored == WILDCARD || ignored == name {
                    return false;
                }
            } else {
                listed = true;
                allowed |= rule == WILDCARD || rule == name;
            }
        }
        !listed || allowed
    }
}

/// Options for reading a model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub association_types: AssociationTypeRules,
    pub element_attributes: AttributeRules,
    pub association_attributes: AttributeRules,
    /// Stop after the first top-level element.
    pub only_root: bool,
    /// Fail on duplicate sibling names instead of reusing the first element.
    pub strict_names: bool,
}

/// Options for writing a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Fail on the first attribute, element or association that cannot be
    /// encoded instead of leaving it out.
    pub strict: bool,
}

//! Core data structures for the structure model

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

/// Replacement for `/` inside element names, which would otherwise split the path.
pub const SLASH_ESCAPE: &str = "__slash__";

/// Separator placed between two differing type tags when elements merge.
pub const TYPE_MERGE_SEPARATOR: &str = "_";

/// Marker placed between two differing scalar values when elements merge.
pub const MERGE_MARKER: &str = " -merged- ";

/// Type tags that must survive a later, less specific assignment.
///
/// | current      | ignored incoming |
/// |--------------|------------------|
/// | `repository` | `dir`            |
const TYPE_PRECEDENCE: &[(&str, &[&str])] = &[("repository", &["dir"])];

/// Stable identifier of an element inside one [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl ElementId {
    pub(crate) fn index(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }

    pub(crate) fn from_index(idx: NodeIndex) -> Self {
        ElementId(idx.index() as u64)
    }
}

/// Stable identifier of an association inside one [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssociationId(pub u64);

impl AssociationId {
    pub(crate) fn index(self) -> EdgeIndex {
        EdgeIndex::new(self.0 as usize)
    }

    pub(crate) fn from_index(idx: EdgeIndex) -> Self {
        AssociationId(idx.index() as u64)
    }
}

/// Escape an element name so it never contains the path separator.
pub fn escape_name(name: &str) -> String {
    name.replace('/', SLASH_ESCAPE)
}

/// Split a `/`-delimited path into its non-empty segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// A single attribute value. Attribute maps carry no schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    List(Vec<String>),
    /// Analysis-time scratch data; model files never contain it.
    Map(BTreeMap<String, String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value only lives in memory and is skipped by serializers.
    pub fn is_transient(&self) -> bool {
        matches!(self, AttrValue::Map(_))
    }

    /// Flat textual form used by the file formats. Lists are sorted and
    /// `;`-joined; transient values have no textual form.
    pub fn render(&self) -> Option<String> {
        match self {
            AttrValue::Str(s) => Some(s.clone()),
            AttrValue::Int(i) => Some(i.to_string()),
            AttrValue::List(items) => {
                let mut sorted: Vec<&str> = items.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                Some(sorted.join(";"))
            }
            AttrValue::Map(_) => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Map(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}", pairs.join(";"))
            }
            other => write!(f, "{}", other.render().unwrap_or_default()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::List(value.into_iter().map(str::to_string).collect())
    }
}

/// String-keyed attribute map, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: BTreeMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.get(key)
    }

    /// Shortcut for string-valued attributes.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(AttrValue::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Overwrite entries with those of `other`.
    pub fn extend_from(&mut self, other: &Attributes) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Append `value` to the list attribute `key`, creating it if needed.
    /// Existing non-list values are left alone.
    pub fn push_unique(&mut self, key: &str, value: &str) {
        match self.entries.get_mut(key) {
            None => {
                self.entries.insert(key.to_string(), AttrValue::List(vec![value.to_string()]));
            }
            Some(AttrValue::List(items)) => {
                if !items.iter().any(|item| item == value) {
                    items.push(value.to_string());
                }
            }
            Some(_) => {}
        }
    }

    /// Union `other` into `self` without losing either side.
    ///
    /// Lists are unioned in order of first appearance. Any other differing
    /// pair is concatenated around [`MERGE_MARKER`].
    pub fn merge_from(&mut self, other: &Attributes) {
        for (key, incoming) in &other.entries {
            match self.entries.get_mut(key) {
                None => {
                    self.entries.insert(key.clone(), incoming.clone());
                }
                Some(existing) if *existing == *incoming => {}
                Some(existing) => match (existing, incoming) {
                    (AttrValue::List(items), AttrValue::List(new_items)) => {
                        for item in new_items {
                            if !items.contains(item) {
                                items.push(item.clone());
                            }
                        }
                    }
                    (existing, incoming) => {
                        let merged = format!("{existing}{MERGE_MARKER}{incoming}");
                        *existing = AttrValue::Str(merged);
                    }
                },
            }
        }
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Attributes {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Attribute map handle. Two elements may hold the same handle when a
/// filtered graph references its source's attributes.
pub type SharedAttributes = Rc<RefCell<Attributes>>;

/// Resolve the type tag an element ends up with when `incoming` is assigned.
/// An empty tag clears the type.
pub fn resolve_type_update(current: Option<&str>, incoming: &str) -> Option<String> {
    if incoming.is_empty() {
        return None;
    }
    if let Some(current) = current {
        let held = TYPE_PRECEDENCE
            .iter()
            .any(|(kept, weaker)| *kept == current && weaker.contains(&incoming));
        if held {
            return Some(current.to_string());
        }
    }
    Some(incoming.to_string())
}

/// A node of the ownership tree and an endpoint of associations.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) element_type: Option<String>,
    pub(crate) attrs: SharedAttributes,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) child_index: HashMap<String, ElementId>,
}

impl Element {
    pub(crate) fn new(name: &str) -> Self {
        Element {
            name: escape_name(name),
            element_type: None,
            attrs: Rc::new(RefCell::new(Attributes::new())),
            parent: None,
            children: Vec::new(),
            child_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    /// Type comparison where an empty tag matches an untyped element.
    pub fn type_equals(&self, t: &str) -> bool {
        self.element_type.as_deref().unwrap_or("") == t
    }

    pub fn has_type(&self) -> bool {
        self.element_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<ElementId> {
        self.child_index.get(name).copied()
    }

    pub fn attrs(&self) -> Ref<'_, Attributes> {
        self.attrs.borrow()
    }

    pub fn attrs_mut(&self) -> RefMut<'_, Attributes> {
        self.attrs.borrow_mut()
    }

    pub fn shared_attrs(&self) -> &SharedAttributes {
        &self.attrs
    }

    pub fn shares_attrs_with(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.attrs, &other.attrs)
    }
}

/// Edge payload: a typed, attributed dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub deptype: String,
    pub attrs: Attributes,
}

impl Association {
    pub fn new(deptype: impl Into<String>, attrs: Attributes) -> Self {
        Association {
            deptype: deptype.into(),
            attrs,
        }
    }
}

/// Borrowed view of an association together with its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AssociationRef<'g> {
    pub id: AssociationId,
    pub from: ElementId,
    pub to: ElementId,
    pub deptype: &'g str,
    pub attrs: &'g Attributes,
}

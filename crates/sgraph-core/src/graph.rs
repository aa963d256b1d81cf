//! Structure graph: an ownership tree of elements plus a directed association multigraph

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::rc::Rc;

use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::error::StructuralError;
use crate::model::*;

pub(crate) type Result<T> = std::result::Result<T, StructuralError>;

/// The structure model. Node weights are elements, edge weights are
/// associations; the ownership tree lives in the elements themselves.
pub struct Graph {
    pub(crate) inner: StableDiGraph<Element, Association>,
    root: ElementId,
    model_attrs: BTreeMap<String, BTreeMap<String, String>>,
    meta_attrs: BTreeMap<String, String>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("element_count", &self.element_count())
            .field("association_count", &self.association_count())
            .field("model_attrs", &self.model_attrs)
            .field("meta_attrs", &self.meta_attrs)
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        let mut inner = StableDiGraph::new();
        let root = ElementId::from_index(inner.add_node(Element::new("")));
        Graph {
            inner,
            root,
            model_attrs: BTreeMap::new(),
            meta_attrs: BTreeMap::new(),
        }
    }

    /// The unnamed sentinel whose children are the top-level elements.
    pub fn root(&self) -> ElementId {
        self.root
    }

    // ── Element access ──────────────────────────────────────

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.inner.node_weight(id.index())
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.inner.node_weight_mut(id.index())
    }

    pub(crate) fn get(&self, id: ElementId) -> Result<&Element> {
        self.element(id).ok_or(StructuralError::UnknownElement(id))
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.element_mut(id).ok_or(StructuralError::UnknownElement(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.inner.contains_node(id.index())
    }

    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::parent)
    }

    /// Children in insertion order. Unknown ids have none.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    pub fn child_by_name(&self, parent: ElementId, name: &str) -> Option<ElementId> {
        self.element(parent).and_then(|el| el.child(name))
    }

    pub fn element_type(&self, id: ElementId) -> Option<&str> {
        self.element(id).and_then(Element::element_type)
    }

    /// Assign a type tag, honoring the precedence table. An empty tag clears it.
    pub fn set_element_type(&mut self, id: ElementId, element_type: &str) -> Result<()> {
        let el = self.get_mut(id)?;
        el.element_type = resolve_type_update(el.element_type.as_deref(), element_type);
        Ok(())
    }

    pub fn attrs(&self, id: ElementId) -> Option<Ref<'_, Attributes>> {
        self.element(id).map(Element::attrs)
    }

    pub fn set_attribute(&mut self, id: ElementId, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.get(id)?.attrs_mut().insert(key, value);
        Ok(())
    }

    /// Add `delta` to the integer attribute `key`, creating it if absent.
    /// String values that parse as integers, as read from model files, count.
    pub fn cumulate_int_attribute(&mut self, id: ElementId, key: &str, delta: i64) -> Result<()> {
        let el = self.get(id)?;
        let current = match el.attrs().get(key) {
            None => 0,
            Some(AttrValue::Int(i)) => *i,
            Some(AttrValue::Str(s)) => match s.trim().parse::<i64>() {
                Ok(value) => value,
                Err(_) => return Err(self.attribute_kind(id, key, "an integer")),
            },
            Some(_) => return Err(self.attribute_kind(id, key, "an integer")),
        };
        el.attrs_mut().insert(key, current.saturating_add(delta));
        Ok(())
    }

    /// Add `delta` to the numeric attribute `key`. The sum is stored as text.
    pub fn cumulate_attribute(&mut self, id: ElementId, key: &str, delta: f64) -> Result<()> {
        let el = self.get(id)?;
        let current = match el.attrs().get(key) {
            None => 0.0,
            Some(AttrValue::Int(i)) => *i as f64,
            Some(AttrValue::Str(s)) => match s.trim().parse::<f64>() {
                Ok(value) => value,
                Err(_) => return Err(self.attribute_kind(id, key, "numeric")),
            },
            Some(_) => return Err(self.attribute_kind(id, key, "numeric")),
        };
        el.attrs_mut().insert(key, (current + delta).to_string());
        Ok(())
    }

    fn attribute_kind(&self, id: ElementId, key: &str, expected: &'static str) -> StructuralError {
        StructuralError::AttributeKind {
            path: self.path(id),
            attribute: key.to_string(),
            expected,
        }
    }

    /// Replace the attribute handle of `id`, possibly aliasing another element's map.
    pub(crate) fn set_shared_attrs(&mut self, id: ElementId, attrs: SharedAttributes) -> Result<()> {
        self.get_mut(id)?.attrs = attrs;
        Ok(())
    }

    // ── Model metadata ──────────────────────────────────────

    pub fn model_attrs(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.model_attrs
    }

    pub fn model_attrs_mut(&mut self) -> &mut BTreeMap<String, BTreeMap<String, String>> {
        &mut self.model_attrs
    }

    pub fn set_model_attribute(&mut self, namespace: &str, key: &str, value: &str) {
        self.model_attrs
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn meta_attrs(&self) -> &BTreeMap<String, String> {
        &self.meta_attrs
    }

    pub fn meta_attrs_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.meta_attrs
    }

    pub fn set_meta_attribute(&mut self, key: &str, value: &str) {
        self.meta_attrs.insert(key.to_string(), value.to_string());
    }

    // ── Creation and lookup ─────────────────────────────────

    /// Strict creation: fails if `parent` already owns a child named `name`.
    pub fn create_element(&mut self, parent: ElementId, name: &str) -> Result<ElementId> {
        let name = escape_name(name);
        if self.get(parent)?.child_index.contains_key(&name) {
            return Err(StructuralError::DuplicateChild {
                parent_path: self.path(parent),
                name,
            });
        }
        Ok(self.insert_child(parent, name))
    }

    /// Look up `name` under `parent`, creating it when absent.
    /// The flag tells whether a new element was created.
    pub fn create_or_get_child(&mut self, parent: ElementId, name: &str) -> Result<(ElementId, bool)> {
        let name = escape_name(name);
        if let Some(existing) = self.get(parent)?.child(&name) {
            return Ok((existing, false));
        }
        Ok((self.insert_child(parent, name), true))
    }

    /// Walk `segments` down from `base`, creating whatever is missing.
    pub fn create_or_get_segments<S: AsRef<str>>(
        &mut self,
        base: ElementId,
        segments: &[S],
    ) -> Result<(ElementId, bool)> {
        let mut current = base;
        let mut created = false;
        self.get(base)?;
        for segment in segments {
            let segment = segment.as_ref();
            if segment.is_empty() {
                continue;
            }
            let (next, new) = self.create_or_get_child(current, segment)?;
            created |= new;
            current = next;
        }
        Ok((current, created))
    }

    /// Idempotent creation of the element at `path` and its ancestor chain.
    pub fn create_or_get_element(&mut self, path: &str) -> ElementId {
        self.create_or_get_element_with_status(path).0
    }

    pub fn create_or_get_element_with_status(&mut self, path: &str) -> (ElementId, bool) {
        let mut current = self.root;
        let mut created = false;
        for segment in split_path(path) {
            let existing = self.inner[current.index()].child(segment);
            current = match existing {
                Some(child) => child,
                None => {
                    created = true;
                    self.insert_child(current, segment.to_string())
                }
            };
        }
        (current, created)
    }

    /// Resolve a `/`-delimited path. The empty path is the root.
    pub fn find_element(&self, path: &str) -> Option<ElementId> {
        let mut current = self.root;
        for segment in split_path(path) {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    /// Add a fresh element under `parent`. The caller guarantees no collision.
    fn insert_child(&mut self, parent: ElementId, name: String) -> ElementId {
        let mut element = Element::new("");
        element.name = name.clone();
        element.parent = Some(parent);
        let id = ElementId::from_index(self.inner.add_node(element));
        if let Some(p) = self.element_mut(parent) {
            p.children.push(id);
            p.child_index.insert(name, id);
        }
        id
    }

    /// Link an already parentless element under `parent`.
    pub(crate) fn link_child(&mut self, parent: ElementId, child: ElementId) {
        let name = self.inner[child.index()].name.clone();
        self.inner[child.index()].parent = Some(parent);
        let p = &mut self.inner[parent.index()];
        p.children.push(child);
        p.child_index.insert(name, child);
    }

    /// Unlink `id` from its parent, if it has one.
    pub(crate) fn unlink(&mut self, id: ElementId) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let Some(parent) = el.parent.take() else {
            return;
        };
        let name = el.name.clone();
        if let Some(p) = self.element_mut(parent) {
            p.children.retain(|c| *c != id);
            if p.child_index.get(&name) == Some(&id) {
                p.child_index.remove(&name);
            }
        }
    }

    // ── Paths ───────────────────────────────────────────────

    /// Names from the top-level element down to `id`; empty for the root.
    pub fn path_segments(&self, id: ElementId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(el) = self.element(current) else {
                break;
            };
            if el.parent.is_none() && current == self.root {
                break;
            }
            segments.push(el.name.clone());
            if segments.len() > self.inner.node_count() {
                // corrupted ownership cycle
                break;
            }
            cursor = el.parent;
        }
        segments.reverse();
        segments
    }

    /// `"/a/b"` form; the root is `""`.
    pub fn path(&self, id: ElementId) -> String {
        let segments = self.path_segments(id);
        if segments.is_empty() {
            return String::new();
        }
        format!("/{}", segments.join("/"))
    }

    // ── Tree mutation ───────────────────────────────────────

    /// Remove `child` from its parent, leaving it alive but parentless.
    pub fn detach(&mut self, child: ElementId) -> Result<()> {
        if child == self.root {
            return Err(StructuralError::RootImmutable { action: "detached" });
        }
        self.get(child)?;
        self.unlink(child);
        Ok(())
    }

    fn check_reparent(&self, parent: ElementId, child: ElementId) -> Result<()> {
        self.get(parent)?;
        self.get(child)?;
        if child == self.root {
            return Err(StructuralError::RootImmutable { action: "re-parented" });
        }
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(StructuralError::OwnershipCycle { path: self.path(child) });
        }
        Ok(())
    }

    /// Strict re-parenting: a sibling with the same name is an error.
    pub fn attach_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        self.check_reparent(parent, child)?;
        let name = self.inner[child.index()].name.clone();
        match self.inner[parent.index()].child(&name) {
            Some(existing) if existing == child => return Ok(()),
            Some(_) => {
                return Err(StructuralError::DuplicateChild {
                    parent_path: self.path(parent),
                    name,
                });
            }
            None => {}
        }
        self.unlink(child);
        self.link_child(parent, child);
        Ok(())
    }

    /// Re-parent `child`; on a name collision it merges into the existing
    /// sibling. Returns the id that survives under `parent`.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<ElementId> {
        self.check_reparent(parent, child)?;
        let name = self.inner[child.index()].name.clone();
        match self.inner[parent.index()].child(&name) {
            Some(existing) if existing == child => Ok(child),
            Some(existing) => {
                self.merge(existing, child)?;
                Ok(existing)
            }
            None => {
                self.unlink(child);
                self.link_child(parent, child);
                Ok(child)
            }
        }
    }

    /// Strict rename: a distinct sibling already using `new_name` is an error.
    pub fn rename(&mut self, id: ElementId, new_name: &str) -> Result<()> {
        if id == self.root {
            return Err(StructuralError::RootImmutable { action: "renamed" });
        }
        let new_name = escape_name(new_name);
        let (old_name, parent) = {
            let el = self.get(id)?;
            (el.name.clone(), el.parent)
        };
        if let Some(parent) = parent {
            match self.inner[parent.index()].child(&new_name) {
                Some(existing) if existing != id => {
                    return Err(StructuralError::DuplicateChild {
                        parent_path: self.path(parent),
                        name: new_name,
                    });
                }
                _ => {}
            }
            let p = &mut self.inner[parent.index()];
            p.child_index.remove(&old_name);
            p.child_index.insert(new_name.clone(), id);
        }
        self.inner[id.index()].name = new_name;
        Ok(())
    }

    /// Remove `id`, its whole subtree, and every association touching them.
    pub fn remove_element(&mut self, id: ElementId) -> Result<()> {
        if id == self.root {
            return Err(StructuralError::RootImmutable { action: "removed" });
        }
        self.get(id)?;
        self.unlink(id);
        let doomed = self.walk(id).collect::<Vec<_>>();
        for element in &doomed {
            self.inner.remove_node(element.index());
        }
        debug!("Removed {} elements starting at {:?}", doomed.len(), id);
        Ok(())
    }

    /// Remove every descendant of `id` matching `predicate`, with its
    /// subtree. Removed subtrees are not visited further. Returns how many
    /// matching elements were removed.
    pub fn remove_descendants_if<F>(&mut self, id: ElementId, mut predicate: F) -> Result<usize>
    where
        F: FnMut(ElementId, &Element) -> bool,
    {
        self.get(id)?;
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let mut doomed = Vec::new();
            for &child in self.children(current) {
                match self.element(child) {
                    Some(el) if predicate(child, el) => doomed.push(child),
                    Some(_) => stack.push(child),
                    None => {}
                }
            }
            for child in doomed {
                self.remove_element(child)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // ── Associations ────────────────────────────────────────

    pub fn add_association(
        &mut self,
        from: ElementId,
        to: ElementId,
        deptype: &str,
        attrs: Attributes,
    ) -> Result<AssociationId> {
        self.get(from)?;
        self.get(to)?;
        let idx = self
            .inner
            .add_edge(from.index(), to.index(), Association::new(deptype, attrs));
        Ok(AssociationId::from_index(idx))
    }

    /// Reuse an association from `from` into `to` with the same deptype (any
    /// deptype when `deptype` is empty), updating its attributes; otherwise
    /// create one. The flag tells whether a new association was created.
    pub fn create_unique_association(
        &mut self,
        from: ElementId,
        to: ElementId,
        deptype: &str,
        attrs: Attributes,
    ) -> Result<(AssociationId, bool)> {
        self.get(from)?;
        self.get(to)?;
        let existing = self
            .inner
            .edges_directed(from.index(), Direction::Outgoing)
            .filter(|e| e.target() == to.index())
            .filter(|e| deptype.is_empty() || e.weight().deptype == deptype)
            .map(|e| e.id())
            .min();
        if let Some(idx) = existing {
            if let Some(assoc) = self.inner.edge_weight_mut(idx) {
                assoc.attrs.extend_from(&attrs);
            }
            return Ok((AssociationId::from_index(idx), false));
        }
        Ok((self.add_association(from, to, deptype, attrs)?, true))
    }

    pub fn remove_association(&mut self, id: AssociationId) -> Result<Association> {
        self.inner
            .remove_edge(id.index())
            .ok_or(StructuralError::UnknownAssociation(id))
    }

    pub fn association(&self, id: AssociationId) -> Option<AssociationRef<'_>> {
        let (from, to) = self.inner.edge_endpoints(id.index())?;
        let assoc = self.inner.edge_weight(id.index())?;
        Some(AssociationRef {
            id,
            from: ElementId::from_index(from),
            to: ElementId::from_index(to),
            deptype: &assoc.deptype,
            attrs: &assoc.attrs,
        })
    }

    pub fn association_attrs_mut(&mut self, id: AssociationId) -> Option<&mut Attributes> {
        self.inner.edge_weight_mut(id.index()).map(|a| &mut a.attrs)
    }

    /// Associations leaving `id`, in creation order.
    pub fn outgoing(&self, id: ElementId) -> Vec<AssociationRef<'_>> {
        self.incident(id, Direction::Outgoing)
    }

    /// Associations arriving at `id`, in creation order.
    pub fn incoming(&self, id: ElementId) -> Vec<AssociationRef<'_>> {
        self.incident(id, Direction::Incoming)
    }

    fn incident(&self, id: ElementId, direction: Direction) -> Vec<AssociationRef<'_>> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut refs: Vec<AssociationRef<'_>> = self
            .inner
            .edges_directed(id.index(), direction)
            .map(|e| AssociationRef {
                id: AssociationId::from_index(e.id()),
                from: ElementId::from_index(e.source()),
                to: ElementId::from_index(e.target()),
                deptype: &e.weight().deptype,
                attrs: &e.weight().attrs,
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        refs
    }

    /// Every association in creation order.
    pub fn associations(&self) -> Vec<AssociationRef<'_>> {
        let mut refs: Vec<AssociationRef<'_>> = self
            .inner
            .edge_indices()
            .filter_map(|idx| self.association(AssociationId::from_index(idx)))
            .collect();
        refs.sort_by_key(|r| r.id);
        refs
    }

    /// Sources of associations into `id` or any of its descendants, sorted
    /// and de-duplicated. With a non-zero `outside_level`, only associations
    /// whose endpoints have different ancestors at that level count.
    pub fn all_users(&self, id: ElementId, outside_level: usize) -> Vec<ElementId> {
        let mut users: Vec<ElementId> = self
            .walk(id)
            .flat_map(|target| self.incoming(target))
            .filter(|assoc| {
                outside_level == 0
                    || self.ancestor_of_level(assoc.from, outside_level)
                        != self.ancestor_of_level(assoc.to, outside_level)
            })
            .map(|assoc| assoc.from)
            .collect();
        users.sort();
        users.dedup();
        users
    }

    /// Every element reaching `id` through a chain of incoming associations,
    /// in breadth-first order. `id` itself is included only when it sits on
    /// a cycle.
    pub fn transitive_users(&self, id: ElementId) -> Vec<ElementId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for assoc in self.incoming(current) {
                if visited.insert(assoc.from) {
                    order.push(assoc.from);
                    queue.push_back(assoc.from);
                }
            }
        }
        order
    }

    // ── Structural queries ──────────────────────────────────

    /// Distance from the root: the root is 0, top-level elements are 1.
    pub fn level(&self, id: ElementId) -> usize {
        self.ancestors(id).len()
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut chain = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        chain
    }

    /// Strict descendant test: an element is not its own descendant.
    pub fn is_descendant_of(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest element of type `element_type`, starting with `id` itself.
    pub fn ancestor_of_type(&self, id: ElementId, element_type: &str) -> Option<ElementId> {
        self.ancestor_of_types(id, &[element_type])
    }

    pub fn ancestor_of_types(&self, id: ElementId, types: &[&str]) -> Option<ElementId> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let el = self.element(current)?;
            if el.element_type().is_some_and(|t| types.contains(&t)) {
                return Some(current);
            }
            cursor = el.parent;
        }
        None
    }

    /// The ancestor (or `id` itself) sitting at `level`.
    pub fn ancestor_of_level(&self, id: ElementId, level: usize) -> Option<ElementId> {
        let own = self.level(id);
        if level > own || !self.contains(id) {
            return None;
        }
        let mut current = id;
        for _ in level..own {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Every element under `id` in pre-order, excluding `id`.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        self.walk(id).skip(1).collect()
    }

    /// Deepest element that is `a` or an ancestor of `a`, and likewise for `b`.
    pub fn lowest_common_ancestor(&self, a: ElementId, b: ElementId) -> Option<ElementId> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let mut chain_a = self.ancestors(a);
        chain_a.insert(0, a);
        let chain_b: HashSet<ElementId> = std::iter::once(b).chain(self.ancestors(b)).collect();
        chain_a.into_iter().find(|c| chain_b.contains(c))
    }

    /// Tree distance between two elements through their lowest common ancestor.
    pub fn dependency_length(&self, from: ElementId, to: ElementId) -> Option<usize> {
        let lca = self.lowest_common_ancestor(from, to)?;
        let lca_level = self.level(lca);
        Some(self.level(from) - lca_level + self.level(to) - lca_level)
    }

    /// Level of the deepest element.
    pub fn max_depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((current, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for &child in self.children(current) {
                stack.push((child, depth + 1));
            }
        }
        deepest
    }

    /// Elements called `name` at exactly `level`, in pre-order.
    pub fn elements_by_name_on_level(&self, name: &str, level: usize) -> Vec<ElementId> {
        if level == 0 {
            return Vec::new();
        }
        let mut found = Vec::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((current, depth)) = stack.pop() {
            if depth + 1 == level {
                found.extend(self.child_by_name(current, name));
                continue;
            }
            for &child in self.children(current).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        found
    }

    // ── Traversal ───────────────────────────────────────────

    /// Pre-order visit of `start` and its subtree, children in insertion order.
    pub fn traverse<F: FnMut(ElementId, &Element)>(&self, start: ElementId, mut visit: F) {
        for id in self.walk(start) {
            if let Some(el) = self.element(id) {
                visit(id, el);
            }
        }
    }

    /// Iterator form of [`Graph::traverse`].
    pub fn walk(&self, start: ElementId) -> Walk<'_> {
        let stack = if self.contains(start) { vec![start] } else { Vec::new() };
        Walk { graph: self, stack }
    }

    // ── Counting ────────────────────────────────────────────

    /// Number of live elements, excluding the root.
    pub fn element_count(&self) -> usize {
        self.inner.node_count().saturating_sub(1)
    }

    pub fn association_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn deptype_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for assoc in self.inner.edge_indices().filter_map(|idx| self.inner.edge_weight(idx)) {
            *counts.entry(assoc.deptype.clone()).or_insert(0) += 1;
        }
        counts
    }

    // ── Copy and verification ───────────────────────────────

    /// Fully independent copy; no attribute map is shared with `self`.
    pub fn deep_copy(&self) -> Graph {
        let mut inner = self.inner.clone();
        for idx in inner.node_indices().collect::<Vec<_>>() {
            let el = &mut inner[idx];
            let attrs = el.attrs.borrow().clone();
            el.attrs = Rc::new(RefCell::new(attrs));
        }
        Graph {
            inner,
            root: self.root,
            model_attrs: self.model_attrs.clone(),
            meta_attrs: self.meta_attrs.clone(),
        }
    }

    /// Check every ownership invariant over the whole arena.
    pub fn verify(&self) -> Result<()> {
        let root = self.get(self.root)?;
        if root.parent.is_some() {
            return Err(StructuralError::BrokenLink {
                path: String::new(),
                detail: "root has a parent".to_string(),
            });
        }

        let mut seen = HashSet::from([self.root]);
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let el = self.get(current)?;
            let path = || self.path(current);
            if el.children.len() != el.child_index.len() {
                return Err(StructuralError::BrokenLink {
                    path: path(),
                    detail: format!(
                        "{} children but {} indexed names",
                        el.children.len(),
                        el.child_index.len()
                    ),
                });
            }
            let mut names = HashSet::new();
            for &child in &el.children {
                let c = self.element(child).ok_or_else(|| StructuralError::BrokenLink {
                    path: path(),
                    detail: format!("child {child:?} no longer exists"),
                })?;
                if !names.insert(c.name.as_str()) {
                    return Err(StructuralError::DuplicateChild {
                        parent_path: path(),
                        name: c.name.clone(),
                    });
                }
                if c.parent != Some(current) {
                    return Err(StructuralError::BrokenLink {
                        path: path(),
                        detail: format!("child '{}' points to another parent", c.name),
                    });
                }
                if el.child(&c.name) != Some(child) {
                    return Err(StructuralError::BrokenLink {
                        path: path(),
                        detail: format!("name index disagrees for '{}'", c.name),
                    });
                }
                if !seen.insert(child) {
                    return Err(StructuralError::OwnershipCycle {
                        path: format!("{}/{}", path(), c.name),
                    });
                }
                stack.push(child);
            }
        }

        // Parentless elements are fine; elements claiming an absent owner are not.
        for idx in self.inner.node_indices() {
            let id = ElementId::from_index(idx);
            if seen.contains(&id) {
                continue;
            }
            if let Some(parent) = self.inner[idx].parent {
                let listed = self.element(parent).is_some_and(|p| p.children.contains(&id));
                if !listed {
                    return Err(StructuralError::BrokenLink {
                        path: self.path(id),
                        detail: format!("parent {parent:?} does not list this element"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order iterator over a subtree, driven by an explicit stack.
pub struct Walk<'g> {
    graph: &'g Graph,
    stack: Vec<ElementId>,
}

impl Iterator for Walk<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.graph.children(current).iter().rev().copied());
        Some(current)
    }
}

//! Subgraph extraction around a focus element
//!
//! The result is a new, independent [`Graph`] holding the focus subtree,
//! the associations that touch it and, depending on the reachability
//! policies, the external elements on the other end of those associations.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilterConsistencyError;
use crate::graph::Graph;
use crate::model::*;

/// How associations leaving the focus subtree are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityPolicy {
    /// Associations to elements outside the subtree are dropped.
    Ignore,
    /// The association is kept and the external element's structure is
    /// cloned, but its own associations are not followed.
    #[default]
    Direct,
    /// External elements are processed like subtree members, transitively.
    DirectAndIndirect,
}

/// How attribute maps reach the filtered graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributePolicy {
    Ignore,
    /// Independent copies.
    #[default]
    IncludeCopy,
    /// The filtered element shares the source element's map.
    IncludeReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub outgoing: ReachabilityPolicy,
    pub incoming: ReachabilityPolicy,
    pub attributes: AttributePolicy,
}

impl FilterOptions {
    pub fn new(
        outgoing: ReachabilityPolicy,
        incoming: ReachabilityPolicy,
        attributes: AttributePolicy,
    ) -> Self {
        FilterOptions {
            outgoing,
            incoming,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Outgoing,
    Incoming,
}

/// Extract the subgraph around `focus` from `source`.
pub fn filter(
    source: &Graph,
    focus: ElementId,
    options: &FilterOptions,
) -> Result<Graph, FilterConsistencyError> {
    if !source.contains(focus) {
        return Err(FilterConsistencyError::UnknownFocus(focus));
    }
    FilterRun::new(source, focus, *options).run()
}

impl Graph {
    /// See [`filter`].
    pub fn filter(
        &self,
        focus: ElementId,
        options: &FilterOptions,
    ) -> Result<Graph, FilterConsistencyError> {
        filter(self, focus, options)
    }
}

/// State of one `filter` call. Nothing here outlives it.
struct FilterRun<'a> {
    source: &'a Graph,
    focus: ElementId,
    options: FilterOptions,
    result: Graph,
    counterparts: HashMap<ElementId, ElementId>,
    inside_focus: HashMap<ElementId, bool>,
    queued: HashSet<ElementId>,
    cloned: HashSet<ElementId>,
    copied: HashSet<AssociationId>,
    queue: VecDeque<ElementId>,
}

impl<'a> FilterRun<'a> {
    fn new(source: &'a Graph, focus: ElementId, options: FilterOptions) -> Self {
        let mut counterparts = HashMap::new();
        let result = Graph::new();
        counterparts.insert(source.root(), result.root());
        FilterRun {
            source,
            focus,
            options,
            result,
            counterparts,
            inside_focus: HashMap::new(),
            queued: HashSet::new(),
            cloned: HashSet::new(),
            copied: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    fn run(mut self) -> Result<Graph, FilterConsistencyError> {
        let source = self.source;
        self.enqueue(self.focus);
        while let Some(current) = self.queue.pop_front() {
            let mapped = self.counterpart(current)?;
            for assoc in source.outgoing(current) {
                self.follow(mapped, assoc.id, assoc.to, Side::Outgoing)?;
            }
            for assoc in source.incoming(current) {
                self.follow(mapped, assoc.id, assoc.from, Side::Incoming)?;
            }
            for &child in source.children(current) {
                self.enqueue(child);
            }
        }

        self.copy_attributes()?;
        *self.result.model_attrs_mut() = source.model_attrs().clone();
        *self.result.meta_attrs_mut() = source.meta_attrs().clone();

        debug!(
            "Filtered '{}': {} elements, {} associations",
            source.path(self.focus),
            self.result.element_count(),
            self.result.association_count()
        );
        Ok(self.result)
    }

    fn enqueue(&mut self, id: ElementId) {
        if self.queued.insert(id) {
            self.queue.push_back(id);
        }
    }

    /// Counterpart of a source element in the result, created on first use.
    fn counterpart(&mut self, id: ElementId) -> Result<ElementId, FilterConsistencyError> {
        if let Some(&mapped) = self.counterparts.get(&id) {
            return Ok(mapped);
        }
        let segments = self.source.path_segments(id);
        let root = self.result.root();
        let (mapped, _) = self.result.create_or_get_segments(root, &segments)?;
        self.counterparts.insert(id, mapped);
        Ok(mapped)
    }

    /// Whether `id` is the focus or one of its descendants. Every element
    /// on the walked ancestor chain is cached with the same verdict.
    fn is_inside_focus(&mut self, id: ElementId) -> bool {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        let verdict = loop {
            let Some(current) = cursor else {
                break false;
            };
            if current == self.focus {
                break true;
            }
            if let Some(&known) = self.inside_focus.get(&current) {
                break known;
            }
            chain.push(current);
            cursor = self.source.parent(current);
        };
        for element in chain {
            self.inside_focus.insert(element, verdict);
        }
        verdict
    }

    fn follow(
        &mut self,
        mapped: ElementId,
        assoc: AssociationId,
        other: ElementId,
        side: Side,
    ) -> Result<(), FilterConsistencyError> {
        let policy = match side {
            Side::Outgoing => self.options.outgoing,
            Side::Incoming => self.options.incoming,
        };
        let inside = self.is_inside_focus(other);
        if !inside && policy == ReachabilityPolicy::Ignore {
            return Ok(());
        }

        let other_mapped = self.counterpart(other)?;
        self.copy_association(assoc, mapped, other_mapped, side)?;
        if inside {
            return Ok(());
        }

        match policy {
            ReachabilityPolicy::Ignore => {}
            ReachabilityPolicy::Direct => {
                let anchor = self.clone_anchor(other);
                if self.cloned.insert(anchor) {
                    self.clone_structure(anchor)?;
                }
            }
            ReachabilityPolicy::DirectAndIndirect => self.enqueue(other),
        }
        Ok(())
    }

    /// Where structure cloning starts for an external element: its parent
    /// when that parent is a real container outside the focus chain, so
    /// siblings of the target come along; otherwise the element itself.
    fn clone_anchor(&self, external: ElementId) -> ElementId {
        match self.source.parent(external) {
            Some(parent)
                if parent != self.source.root()
                    && !self.source.is_descendant_of(self.focus, parent) =>
            {
                parent
            }
            _ => external,
        }
    }

    /// Mirror the subtree under `anchor` into the result, without associations.
    fn clone_structure(&mut self, anchor: ElementId) -> Result<(), FilterConsistencyError> {
        let source = self.source;
        let mut stack = vec![anchor];
        while let Some(current) = stack.pop() {
            let mapped = self.counterpart(current)?;
            for &child in source.children(current) {
                if !self.counterparts.contains_key(&child) {
                    let name = source.name(child).unwrap_or_default();
                    let (child_mapped, _) = self.result.create_or_get_child(mapped, name)?;
                    self.counterparts.insert(child, child_mapped);
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    fn copy_association(
        &mut self,
        assoc: AssociationId,
        mapped: ElementId,
        other_mapped: ElementId,
        side: Side,
    ) -> Result<(), FilterConsistencyError> {
        if !self.copied.insert(assoc) {
            return Ok(());
        }
        let (from, to) = match side {
            Side::Outgoing => (mapped, other_mapped),
            Side::Incoming => (other_mapped, mapped),
        };
        if from == to {
            return Ok(());
        }
        let Some(original) = self.source.association(assoc) else {
            return Ok(());
        };
        self.result
            .add_association(from, to, original.deptype, original.attrs.clone())?;
        Ok(())
    }

    /// Lock-step walk over the result and the source, moving attribute maps
    /// and type tags across according to the attribute policy.
    fn copy_attributes(&mut self) -> Result<(), FilterConsistencyError> {
        if self.options.attributes == AttributePolicy::Ignore {
            return Ok(());
        }
        let source = self.source;
        let mut pairs = VecDeque::from([(self.result.root(), source.root())]);
        while let Some((target, origin)) = pairs.pop_front() {
            if let Some(original) = source.element(origin) {
                let attrs = match self.options.attributes {
                    AttributePolicy::IncludeReference => Rc::clone(original.shared_attrs()),
                    _ => Rc::new(std::cell::RefCell::new(original.attrs().clone())),
                };
                self.result.set_shared_attrs(target, attrs)?;
                if let Some(el) = self.result.element_mut(target) {
                    el.element_type = original.element_type.clone();
                }
            }

            for &child in self.result.children(target) {
                let name = self.result.name(child).unwrap_or_default();
                match source.child_by_name(origin, name) {
                    Some(counterpart) => pairs.push_back((child, counterpart)),
                    None => {
                        return Err(FilterConsistencyError::StructuralMismatch {
                            path: self.result.path(child),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

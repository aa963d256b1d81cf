//! Element merging: union one subtree into another

use std::collections::HashSet;
use std::rc::Rc;

use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use crate::error::StructuralError;
use crate::graph::{Graph, Result};
use crate::model::*;

impl Graph {
    /// Union `other` into `target` and remove `other` from the graph.
    ///
    /// Children of `other` move under `target`; same-named children merge
    /// pairwise. Associations follow to `target` unless `target` already has
    /// one to the same endpoint with the same deptype.
    pub fn merge(&mut self, target: ElementId, other: ElementId) -> Result<()> {
        self.get(target)?;
        self.get(other)?;
        if other == self.root() {
            return Err(StructuralError::RootImmutable { action: "merged away" });
        }
        if target == other || self.is_descendant_of(target, other) {
            return Err(StructuralError::OwnershipCycle { path: self.path(other) });
        }

        let mut work = vec![(target, other)];
        let mut merged = 0usize;
        while let Some((into, from)) = work.pop() {
            self.unlink(from);
            let children = {
                let el = self.get_mut(from)?;
                el.child_index.clear();
                std::mem::take(&mut el.children)
            };
            for child in children {
                let name = self.get(child)?.name.clone();
                self.get_mut(child)?.parent = None;
                match self.get(into)?.child(&name) {
                    Some(existing) => work.push((existing, child)),
                    None => self.link_child(into, child),
                }
            }
            self.repoint_associations(into, from);
            self.merge_element_data(into, from)?;
            self.inner.remove_node(from.index());
            merged += 1;
        }
        debug!("Merged {} elements into {}", merged, self.path(target));
        Ok(())
    }

    fn repoint_associations(&mut self, into: ElementId, from: ElementId) {
        for direction in [Direction::Outgoing, Direction::Incoming] {
            let mut moving: Vec<_> = self
                .inner
                .edges_directed(from.index(), direction)
                .map(|e| {
                    let endpoint = match direction {
                        Direction::Outgoing => e.target(),
                        Direction::Incoming => e.source(),
                    };
                    (e.id(), ElementId::from_index(endpoint), e.weight().clone())
                })
                .collect();
            moving.sort_by_key(|(idx, _, _)| *idx);

            let mut present: HashSet<(ElementId, String)> = self
                .inner
                .edges_directed(into.index(), direction)
                .map(|e| {
                    let endpoint = match direction {
                        Direction::Outgoing => e.target(),
                        Direction::Incoming => e.source(),
                    };
                    (ElementId::from_index(endpoint), e.weight().deptype.clone())
                })
                .collect();

            for (_, endpoint, assoc) in moving {
                if endpoint == into || endpoint == from {
                    continue;
                }
                if !present.insert((endpoint, assoc.deptype.clone())) {
                    continue;
                }
                match direction {
                    Direction::Outgoing => self.inner.add_edge(into.index(), endpoint.index(), assoc),
                    Direction::Incoming => self.inner.add_edge(endpoint.index(), into.index(), assoc),
                };
            }
        }
    }

    fn merge_element_data(&mut self, into: ElementId, from: ElementId) -> Result<()> {
        let (from_type, from_attrs) = {
            let el = self.get(from)?;
            (el.element_type.clone(), Rc::clone(&el.attrs))
        };
        let into_el = self.get_mut(into)?;
        if !Rc::ptr_eq(&into_el.attrs, &from_attrs) {
            into_el.attrs.borrow_mut().merge_from(&from_attrs.borrow());
        }
        if let Some(incoming) = from_type.filter(|t| !t.is_empty()) {
            let merged = match into_el.element_type.as_deref() {
                Some(current) if current == incoming => None,
                Some(current) if !current.is_empty() => {
                    Some(format!("{current}{TYPE_MERGE_SEPARATOR}{incoming}"))
                }
                _ => Some(incoming),
            };
            if let Some(merged) = merged {
                into_el.element_type = Some(merged);
            }
        }
        Ok(())
    }
}

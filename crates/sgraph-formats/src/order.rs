//! Deterministic element ordering shared by the writers

use sgraph_core::{ElementId, Graph};

/// Pre-order over the whole tree, siblings sorted by name, root excluded.
pub(crate) fn sorted_preorder(graph: &Graph) -> Vec<ElementId> {
    let mut order = Vec::with_capacity(graph.element_count());
    let mut stack = sorted_children(graph, graph.root());
    stack.reverse();
    while let Some(current) = stack.pop() {
        order.push(current);
        let mut children = sorted_children(graph, current);
        children.reverse();
        stack.extend(children);
    }
    order
}

pub(crate) fn sorted_children(graph: &Graph, id: ElementId) -> Vec<ElementId> {
    let mut children = graph.children(id).to_vec();
    children.sort_by(|a, b| graph.name(*a).cmp(&graph.name(*b)));
    children
}

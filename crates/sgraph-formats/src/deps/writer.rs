//! Deps text writer

use std::collections::HashSet;
use std::io::Write;

use sgraph_core::{AssociationId, Attributes, ElementId, Graph};
use tracing::{debug, warn};

use super::{encode_value, AUTOGENERATED_ATTRS};
use crate::error::{AttributeEncodingError, FormatError, Result, StructureEncodingError, WriteReport};
use crate::options::WriteOptions;
use crate::order::sorted_preorder;
use crate::xml::TRANSIENT_PREFIX;

/// Render `graph` as deps text.
pub fn to_deps_string(graph: &Graph, options: &WriteOptions) -> Result<(String, WriteReport)> {
    let mut out = String::new();
    let mut report = WriteReport::default();
    let order = writable_elements(graph, options, &mut report)?;
    let writable: HashSet<ElementId> = order.iter().copied().collect();
    let mut skipped: HashSet<AssociationId> = HashSet::new();
    let mut printed: HashSet<ElementId> = HashSet::new();

    for assoc in graph.associations() {
        let reason = if !writable.contains(&assoc.from) || !writable.contains(&assoc.to) {
            "endpoint is the model root or has no deps path"
        } else if !is_line_field(assoc.deptype) {
            "dependency type cannot be represented in a deps line"
        } else {
            continue;
        };
        skipped.insert(assoc.id);
        let error = StructureEncodingError::association(graph, &assoc, reason);
        report.skip(error, options.strict)?;
    }

    for &id in &order {
        let path = graph.path(id);
        let Some(element) = graph.element(id) else {
            continue;
        };
        let attrs = element.attrs().clone();
        for (name, value) in encodable(&path, &attrs, options, &mut report)? {
            if AUTOGENERATED_ATTRS.contains(&name.as_str()) {
                continue;
            }
            out.push_str(&format!("@{path}:{name}:{value}\n"));
            printed.insert(id);
        }
        if let Some(element_type) = element.element_type().filter(|t| !t.is_empty()) {
            out.push_str(&format!("@{path}:type:{}\n", encode_value(element_type)));
            printed.insert(id);
        }
    }

    for &id in &order {
        for assoc in graph.outgoing(id) {
            if skipped.contains(&assoc.id) {
                continue;
            }
            out.push_str(&format!(
                "{}:{}:{}\n",
                graph.path(assoc.from),
                graph.path(assoc.to),
                assoc.deptype
            ));
            printed.insert(assoc.from);
            printed.insert(assoc.to);
            for (name, value) in encodable(&graph.path(id), assoc.attrs, options, &mut report)? {
                out.push_str(&format!("@@{name}:{value}\n"));
            }
        }
    }

    for &id in &order {
        if !printed.contains(&id) {
            out.push_str(&graph.path(id));
            out.push('\n');
        }
    }

    for (key, value) in graph.meta_attrs() {
        out.push_str(&format!("@@@@{key}:{}\n", encode_value(value)));
    }
    for (namespace, attrs) in graph.model_attrs() {
        for (key, value) in attrs {
            out.push_str(&format!("@@@{namespace}:{key}:{}\n", encode_value(value)));
        }
    }

    debug!(
        "Rendered deps: {} elements, {} dropped attributes, {} skipped",
        order.len(),
        report.dropped.len(),
        report.skipped.len()
    );
    Ok((out, report))
}

/// Write `graph` to `out`. Nothing is written unless the whole document rendered.
pub fn write_deps<W: Write>(
    graph: &Graph,
    mut out: W,
    output_name: &str,
    options: &WriteOptions,
) -> Result<WriteReport> {
    let (document, report) = to_deps_string(graph, options)?;
    out.write_all(document.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| FormatError::io(output_name, e))?;
    Ok(report)
}

/// `(name, encoded value)` pairs that survive the line format.
fn encodable(
    path: &str,
    attrs: &Attributes,
    options: &WriteOptions,
    report: &mut WriteReport,
) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (name, value) in attrs.iter() {
        if name.starts_with(TRANSIENT_PREFIX) || name == "type" {
            continue;
        }
        let Some(rendered) = value.render() else {
            continue;
        };
        if name.is_empty() || !is_line_field(name) {
            let error = AttributeEncodingError {
                path: path.to_string(),
                attribute: name.clone(),
                reason: "name cannot be represented in a deps line".to_string(),
            };
            if options.strict {
                return Err(error.into());
            }
            warn!("Dropping attribute: {}", error);
            report.dropped.push(error);
            continue;
        }
        pairs.push((name.clone(), encode_value(&rendered)));
    }
    Ok(pairs)
}

/// Elements with a representable path, in sorted pre-order. An element whose
/// name breaks the line format is reported once and its subtree left out.
fn writable_elements(
    graph: &Graph,
    options: &WriteOptions,
    report: &mut WriteReport,
) -> Result<Vec<ElementId>> {
    let mut kept = Vec::new();
    let mut blocked: HashSet<ElementId> = HashSet::new();
    for id in sorted_preorder(graph) {
        if graph.parent(id).is_some_and(|parent| blocked.contains(&parent)) {
            blocked.insert(id);
            continue;
        }
        let name = graph.name(id).unwrap_or_default();
        if name.is_empty() || !is_line_field(name) {
            blocked.insert(id);
            let error = StructureEncodingError::element(
                &graph.path(id),
                "name cannot be represented in a deps line",
            );
            report.skip(error, options.strict)?;
            continue;
        }
        kept.push(id);
    }
    Ok(kept)
}

fn is_line_field(text: &str) -> bool {
    !text.contains([':', '\n', '\r'])
}

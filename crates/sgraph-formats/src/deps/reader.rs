//! Deps text reader

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sgraph_core::{AssociationId, Attributes, Graph, StructuralError};
use tracing::{debug, warn};

use super::decode_value;
use crate::error::{FormatError, Result};
use crate::options::ParseOptions;

const PROPAGATE_DIRECTIVE: &str = "/ATTRIBUTE_PROPAGATE_FOR_MODEL";

/// Parse a deps document from any buffered reader.
pub fn read_deps<R: BufRead>(input: R, source_name: &str, options: &ParseOptions) -> Result<Graph> {
    let mut graph = Graph::new();
    let mut last: Option<AssociationId> = None;
    let mut lines = 0usize;

    for line in input.lines() {
        let line = line.map_err(|e| FormatError::io(source_name, e))?;
        lines += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("@@@@") {
            match rest.split_once(':') {
                Some((key, value)) if !key.is_empty() => {
                    graph.set_meta_attribute(key, &decode_value(value));
                }
                _ => warn!("Skipping meta attribute line {} in {}", lines, source_name),
            }
        } else if let Some(rest) = line.strip_prefix("@@@") {
            let mut parts = rest.splitn(3, ':');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(namespace), Some(key), Some(value)) => {
                    graph.set_model_attribute(namespace, key, &decode_value(value));
                }
                _ => warn!("Skipping model attribute line {} in {}", lines, source_name),
            }
        } else if let Some(rest) = line.strip_prefix("@@") {
            let Some((key, value)) = rest.split_once(':') else {
                continue;
            };
            if value.is_empty() || !options.association_attributes.accepts(key) {
                continue;
            }
            match last.and_then(|id| graph.association_attrs_mut(id)) {
                Some(attrs) => {
                    attrs.insert(key, decode_value(value));
                }
                None => warn!(
                    "Dependency attribute without a dependency at line {} in {}",
                    lines, source_name
                ),
            }
        } else if let Some(rest) = line.strip_prefix('@') {
            let mut parts = rest.splitn(3, ':');
            let (Some(path), Some(attr), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            if path == "/" || path == PROPAGATE_DIRECTIVE {
                debug!("Skipping directive {} at line {}", path, lines);
                continue;
            }
            let element = graph.create_or_get_element(path);
            let applied = if attr == "type" {
                graph.set_element_type(element, value)
            } else if !value.is_empty() && options.element_attributes.accepts(attr) {
                graph.set_attribute(element, attr, decode_value(value))
            } else {
                Ok(())
            };
            applied.map_err(|e| FormatError::invalid_model(source_name, e))?;
        } else if line.contains(':') {
            last = add_dependency(&mut graph, line, options)
                .map_err(|e| FormatError::invalid_model(source_name, e))?;
        } else {
            graph.create_or_get_element(line);
        }
    }

    debug!(
        "Parsed {}: {} lines, {} elements, {} associations",
        source_name,
        lines,
        graph.element_count(),
        graph.association_count()
    );
    Ok(graph)
}

pub fn read_deps_str(text: &str, source_name: &str, options: &ParseOptions) -> Result<Graph> {
    read_deps(text.as_bytes(), source_name, options)
}

pub fn read_deps_file(path: &Path, options: &ParseOptions) -> Result<Graph> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| FormatError::io(&name, e))?;
    read_deps(BufReader::new(file), &name, options)
}

/// `from:to[:deptype[:detail]]`
fn add_dependency(
    graph: &mut Graph,
    line: &str,
    options: &ParseOptions,
) -> std::result::Result<Option<AssociationId>, StructuralError> {
    let mut parts = line.splitn(4, ':');
    let from = parts.next().unwrap_or_default();
    let to = parts.next().unwrap_or_default().replace("//", "/");
    let deptype = parts.next().unwrap_or_default();
    let detail = parts.next().unwrap_or_default();

    let Some(from) = normalize_source(from) else {
        return Ok(None);
    };
    if !options.association_types.accepts(deptype) {
        return Ok(None);
    }
    if is_root_path(from) || is_root_path(&to) {
        warn!("Skipping dependency on the model root: {}", line);
        return Ok(None);
    }

    let from = graph.create_or_get_element(from);
    let to = graph.create_or_get_element(&to);
    let mut attrs = Attributes::new();
    if !detail.is_empty() {
        attrs.insert("detail", detail);
    }
    Ok(Some(graph.add_association(from, to, deptype, attrs)?))
}

fn is_root_path(path: &str) -> bool {
    path.split('/').all(str::is_empty)
}

/// Trailing `/` is dropped; ids shorter than two characters are ignored.
fn normalize_source(id: &str) -> Option<&str> {
    let id = id.strip_suffix('/').unwrap_or(id);
    (id.chars().count() >= 2).then_some(id)
}

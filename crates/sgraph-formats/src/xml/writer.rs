//! XML model writer

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Write;

use sgraph_core::{AttrValue, Attributes, ElementId, Graph};
use tracing::{debug, warn};

use super::{encode_attr_name, MODEL_VERSION, TRANSIENT_PREFIX};
use crate::error::{AttributeEncodingError, FormatError, Result, StructureEncodingError, WriteReport};
use crate::options::WriteOptions;
use crate::order::{sorted_children, sorted_preorder};

/// Names the reader interprets structurally on `<e>`.
const RESERVED_ELEMENT_ATTRS: &[&str] = &["n", "i", "t", "type"];

enum Frame {
    Open(ElementId, usize),
    Close(usize),
}

/// Render `graph` as a model document.
pub fn to_xml_string(graph: &Graph, options: &WriteOptions) -> Result<(String, WriteReport)> {
    XmlModelWriter::new(graph, options).render()
}

/// Write `graph` to `out`. Nothing is written unless the whole document rendered.
pub fn write_xml<W: Write>(
    graph: &Graph,
    mut out: W,
    output_name: &str,
    options: &WriteOptions,
) -> Result<WriteReport> {
    let (document, report) = to_xml_string(graph, options)?;
    out.write_all(document.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| FormatError::io(output_name, e))?;
    Ok(report)
}

struct XmlModelWriter<'g> {
    graph: &'g Graph,
    options: &'g WriteOptions,
    ids: HashMap<ElementId, u64>,
    report: WriteReport,
    out: String,
}

impl<'g> XmlModelWriter<'g> {
    fn new(graph: &'g Graph, options: &'g WriteOptions) -> Self {
        XmlModelWriter {
            graph,
            options,
            ids: HashMap::new(),
            report: WriteReport::default(),
            out: String::new(),
        }
    }

    fn render(mut self) -> Result<(String, WriteReport)> {
        let graph = self.graph;
        let order = sorted_preorder(graph);
        let written: HashSet<ElementId> = order.iter().copied().collect();
        for assoc in graph.associations() {
            if !written.contains(&assoc.from) || !written.contains(&assoc.to) {
                let error = StructureEncodingError::association(
                    graph,
                    &assoc,
                    "endpoint is the model root or outside the tree",
                );
                self.report.skip(error, self.options.strict)?;
            }
        }

        // Only referenced elements get an id
        let mut next = 1u64;
        for id in order {
            if !self.graph.incoming(id).is_empty() {
                self.ids.insert(id, next);
                next += 1;
            }
        }

        self.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
        self.out.push_str(&format!("<model version=\"{MODEL_VERSION}\">\n  <elements>\n"));

        let mut stack: Vec<Frame> = sorted_children(self.graph, self.graph.root())
            .into_iter()
            .rev()
            .map(|child| Frame::Open(child, 0))
            .collect();
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Open(id, depth) => {
                    self.write_element(id, depth)?;
                    stack.push(Frame::Close(depth));
                    stack.extend(
                        sorted_children(self.graph, id)
                            .into_iter()
                            .rev()
                            .map(|child| Frame::Open(child, depth + 1)),
                    );
                }
                Frame::Close(depth) => {
                    self.out.push_str(&indent(depth));
                    self.out.push_str("</e>\n");
                }
            }
        }

        self.out.push_str("  </elements>\n</model>\n");
        debug!(
            "Rendered XML: {} elements, {} ids, {} dropped attributes, {} skipped",
            self.graph.element_count(),
            self.ids.len(),
            self.report.dropped.len(),
            self.report.skipped.len()
        );
        Ok((self.out, self.report))
    }

    fn write_element(&mut self, id: ElementId, depth: usize) -> Result<()> {
        let graph = self.graph;
        let Some(element) = graph.element(id) else {
            return Ok(());
        };
        let path = graph.path(id);

        let mut tag = format!("{}<e", indent(depth));
        if let Some(num) = self.ids.get(&id) {
            tag.push_str(&format!(" i=\"{num}\""));
        }
        tag.push_str(&format!(" n=\"{}\"", escape(&sanitize_name(element.name(), &path))));
        if let Some(element_type) = element.element_type().filter(|t| !t.is_empty()) {
            tag.push_str(&format!(" t=\"{}\"", escape(&sanitize_name(element_type, &path))));
        }
        let attrs = element.attrs().clone();
        for (name, value) in self.encode_attrs(&path, &attrs, AttrTarget::Element)? {
            tag.push_str(&format!(" {name}=\"{value}\""));
        }
        tag.push_str(">\n");
        self.out.push_str(&tag);

        // (deptype, encoded attrs) -> target ids
        let mut groups: BTreeMap<(String, Vec<(String, String)>), BTreeSet<u64>> = BTreeMap::new();
        for assoc in graph.outgoing(id) {
            let Some(&target) = self.ids.get(&assoc.to) else {
                // Already reported by render
                continue;
            };
            let encoded = self.encode_attrs(&path, assoc.attrs, AttrTarget::Association)?;
            groups
                .entry((assoc.deptype.to_string(), encoded))
                .or_default()
                .insert(target);
        }
        for ((deptype, attrs), targets) in groups {
            let refs: Vec<String> = targets.iter().map(u64::to_string).collect();
            let mut line = format!(
                "{}  <r r=\"{}\" t=\"{}\"",
                indent(depth),
                refs.join(","),
                escape(&deptype)
            );
            for (name, value) in attrs {
                line.push_str(&format!(" {name}=\"{value}\""));
            }
            line.push_str("/>\n");
            self.out.push_str(&line);
        }
        Ok(())
    }

    /// Encoded `(name, escaped value)` pairs for the attributes that can be written.
    fn encode_attrs(
        &mut self,
        path: &str,
        attrs: &Attributes,
        target: AttrTarget,
    ) -> Result<Vec<(String, String)>> {
        let mut encoded = Vec::new();
        for (name, value) in attrs.iter() {
            if name.starts_with(TRANSIENT_PREFIX) {
                continue;
            }
            let Some(rendered) = value.render() else {
                // Transient map values
                continue;
            };
            match check_attribute(name, value, &rendered, target) {
                Ok(()) => encoded.push((encode_attr_name(name), escape(&rendered))),
                Err(reason) => self.reject(path, name, reason)?,
            }
        }
        Ok(encoded)
    }

    fn reject(&mut self, path: &str, attribute: &str, reason: String) -> Result<()> {
        let error = AttributeEncodingError {
            path: path.to_string(),
            attribute: attribute.to_string(),
            reason,
        };
        if self.options.strict {
            return Err(error.into());
        }
        warn!("Dropping attribute: {}", error);
        self.report.dropped.push(error);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrTarget {
    Element,
    Association,
}

fn check_attribute(
    name: &str,
    value: &AttrValue,
    rendered: &str,
    target: AttrTarget,
) -> std::result::Result<(), String> {
    match target {
        AttrTarget::Element if RESERVED_ELEMENT_ATTRS.contains(&name) => {
            return Err("reserved element attribute name".to_string());
        }
        AttrTarget::Association if name.chars().count() < 2 => {
            return Err("single-character association attribute names are reserved".to_string());
        }
        _ => {}
    }
    if !is_xml_name(&encode_attr_name(name)) {
        return Err("not a valid XML attribute name".to_string());
    }
    if let Some(bad) = rendered.chars().find(|c| !is_xml_char(*c)) {
        return Err(format!("{} value contains U+{:04X}", kind(value), bad as u32));
    }
    Ok(())
}

fn kind(value: &AttrValue) -> &'static str {
    match value {
        AttrValue::Str(_) => "string",
        AttrValue::Int(_) => "integer",
        AttrValue::List(_) => "list",
        AttrValue::Map(_) => "map",
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

/// Element names and types must always be written; unencodable characters
/// are replaced instead of failing the element.
fn sanitize_name(name: &str, path: &str) -> String {
    if name.chars().all(is_xml_char) {
        return name.to_string();
    }
    warn!("Replacing unencodable characters in '{}'", path);
    name.chars()
        .map(|c| if is_xml_char(c) { c } else { '_' })
        .collect()
}

/// Unlike `quick_xml::escape`, also writes newline, CR and tab as `&#10;`, `&#13;` and `&#9;`.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth + 2)
}

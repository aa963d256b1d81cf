//! Two-pass XML model reader
//!
//! The first pass builds the element tree and records every `<r>` target as
//! a pending reference; the second resolves those references through the
//! `i` id table once the whole document has been seen.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use sgraph_core::{Attributes, ElementId, Graph, StructuralError};
use tracing::{debug, warn};

use super::decode_attr_name;
use crate::error::{FormatError, Result};
use crate::options::ParseOptions;

struct PendingReference {
    source: ElementId,
    target: String,
    deptype: String,
    attrs: Attributes,
}

struct XmlModelReader<'o> {
    source_name: String,
    options: &'o ParseOptions,
    graph: Graph,
    stack: Vec<ElementId>,
    ids: HashMap<String, ElementId>,
    pending: Vec<PendingReference>,
    /// First pending reference of the `<r>` record still open.
    open_relation: Option<usize>,
}

/// Parse a model document from any buffered reader.
pub fn read_xml<R: BufRead>(input: R, source_name: &str, options: &ParseOptions) -> Result<Graph> {
    let mut state = XmlModelReader {
        source_name: source_name.to_string(),
        options,
        graph: Graph::new(),
        stack: Vec::new(),
        ids: HashMap::new(),
        pending: Vec::new(),
        open_relation: None,
    };

    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| FormatError::xml(source_name, format!("{e} at byte {}", reader.buffer_position())))?;
        match event {
            Event::Start(tag) => {
                if state.open(&tag)? {
                    break;
                }
            }
            Event::Empty(tag) => {
                let stop = state.open(&tag)?;
                state.close(tag.name().as_ref());
                if stop {
                    break;
                }
            }
            Event::End(tag) => state.close(tag.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    state.resolve()
}

pub fn read_xml_str(text: &str, source_name: &str, options: &ParseOptions) -> Result<Graph> {
    read_xml(text.as_bytes(), source_name, options)
}

pub fn read_xml_file(path: &Path, options: &ParseOptions) -> Result<Graph> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| FormatError::io(&name, e))?;
    read_xml(BufReader::new(file), &name, options)
}

impl XmlModelReader<'_> {
    /// Handle a start tag. Returns `true` when parsing should stop early.
    fn open(&mut self, tag: &BytesStart<'_>) -> Result<bool> {
        match tag.name().as_ref() {
            b"e" => {
                self.open_element(tag)?;
                Ok(self.options.only_root)
            }
            b"r" => {
                self.open_relation(tag)?;
                Ok(false)
            }
            b"a" => {
                self.legacy_attribute(tag)?;
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"e" => {
                self.stack.pop();
            }
            b"r" => self.open_relation = None,
            _ => {}
        }
    }

    fn attributes(&self, tag: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| FormatError::xml(&self.source_name, e))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| FormatError::xml(&self.source_name, e))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| FormatError::xml(&self.source_name, e))?
                .into_owned();
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    fn open_element(&mut self, tag: &BytesStart<'_>) -> Result<()> {
        let pairs = self.attributes(tag)?;
        let name = pairs
            .iter()
            .find(|(k, _)| k == "n")
            .map(|(_, v)| v.clone())
            .ok_or_else(|| FormatError::xml(&self.source_name, "<e> without an n attribute"))?;

        let parent = self.stack.last().copied().unwrap_or(self.graph.root());
        let created = if self.options.strict_names {
            self.graph.create_element(parent, &name)
        } else {
            self.graph.create_or_get_child(parent, &name).map(|(id, _)| id)
        };
        let id = created.map_err(|e| self.invalid(e))?;
        self.stack.push(id);

        for (key, value) in pairs {
            match key.as_str() {
                "n" => {}
                "t" | "type" => self
                    .graph
                    .set_element_type(id, &value)
                    .map_err(|e| self.invalid(e))?,
                "i" => {
                    if let Some(previous) = self.ids.insert(value.clone(), id) {
                        if previous != id {
                            warn!(
                                "Id {} in {} reassigned from {} to {}",
                                value,
                                self.source_name,
                                self.graph.path(previous),
                                self.graph.path(id)
                            );
                        }
                    }
                }
                other => {
                    let attr = decode_attr_name(other);
                    if self.options.element_attributes.accepts(attr) {
                        self.graph
                            .set_attribute(id, attr, value)
                            .map_err(|e| self.invalid(e))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn open_relation(&mut self, tag: &BytesStart<'_>) -> Result<()> {
        let pairs = self.attributes(tag)?;
        let Some(&source) = self.stack.last() else {
            return Err(FormatError::xml(&self.source_name, "<r> outside of any <e>"));
        };

        let deptype = pairs
            .iter()
            .find(|(k, _)| k == "t")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let mut attrs = Attributes::new();
        for (key, value) in &pairs {
            // Single-character names are structural
            if key.chars().count() < 2 {
                continue;
            }
            let attr = decode_attr_name(key);
            if self.options.association_attributes.accepts(attr) {
                attrs.insert(attr, value.as_str());
            }
        }

        self.open_relation = Some(self.pending.len());
        if !self.options.association_types.accepts(&deptype) {
            return Ok(());
        }
        let targets = pairs
            .iter()
            .find(|(k, _)| k == "r")
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        for target in targets.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            self.pending.push(PendingReference {
                source,
                target: target.to_string(),
                deptype: deptype.clone(),
                attrs: attrs.clone(),
            });
        }
        Ok(())
    }

    /// `<a n="…" v="…"/>` inside an `<e>` or `<r>`.
    fn legacy_attribute(&mut self, tag: &BytesStart<'_>) -> Result<()> {
        let pairs = self.attributes(tag)?;
        let lookup = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let (Some(name), value) = (lookup("n"), lookup("v").unwrap_or_default()) else {
            return Ok(());
        };

        if let Some(first) = self.open_relation {
            if self.options.association_attributes.accepts(&name) {
                for reference in &mut self.pending[first..] {
                    reference.attrs.insert(name.as_str(), value.as_str());
                }
            }
            return Ok(());
        }
        match self.stack.last() {
            Some(&element) => {
                if self.options.element_attributes.accepts(&name) {
                    self.graph
                        .set_attribute(element, &name, value)
                        .map_err(|e| self.invalid(e))?;
                }
            }
            None => debug!("Discarding attribute {} with no element in {}", name, self.source_name),
        }
        Ok(())
    }

    fn invalid(&self, error: StructuralError) -> FormatError {
        FormatError::invalid_model(&self.source_name, error)
    }

    fn resolve(mut self) -> Result<Graph> {
        for reference in std::mem::take(&mut self.pending) {
            let Some(&target) = self.ids.get(&reference.target) else {
                return Err(FormatError::UnresolvedReference {
                    source_name: self.source_name.clone(),
                    element_path: self.graph.path(reference.source),
                    id: reference.target,
                });
            };
            self.graph
                .add_association(reference.source, target, &reference.deptype, reference.attrs)
                .map_err(|e| self.invalid(e))?;
        }
        debug!(
            "Parsed {}: {} elements, {} associations",
            self.source_name,
            self.graph.element_count(),
            self.graph.association_count()
        );
        Ok(self.graph)
    }
}

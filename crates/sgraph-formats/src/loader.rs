//! Format detection, loading, and atomic saving of model files

use std::fs::File;
use std::io::{BufReader, Cursor, Write};
use std::path::Path;

use sgraph_core::Graph;
use tempfile::NamedTempFile;
use tracing::info;

use crate::archive;
use crate::config::LoaderConfig;
use crate::deps;
use crate::error::{FormatError, Result, WriteReport};
use crate::options::{ParseOptions, WriteOptions};
use crate::xml;

/// Meta attribute recording where a model was loaded from.
pub const MODEL_PATH_ATTR: &str = "model_path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Xml,
    ZippedXml,
    Deps,
}

impl ModelFormat {
    /// `.xml.zip` and `.xml` by suffix; anything else is deps text.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".xml.zip") {
            ModelFormat::ZippedXml
        } else if name.ends_with(".xml") {
            ModelFormat::Xml
        } else {
            ModelFormat::Deps
        }
    }
}

/// Load a model, choosing the format from the file name.
pub fn load_model(path: &Path, config: &LoaderConfig) -> Result<Graph> {
    let mut graph = load_model_with(path, ModelFormat::from_path(path), &config.parse_options())?;
    graph.set_meta_attribute(MODEL_PATH_ATTR, &path.display().to_string());
    info!(
        "Loaded {}: {} elements, {} associations",
        path.display(),
        graph.element_count(),
        graph.association_count()
    );
    Ok(graph)
}

pub fn load_model_with(path: &Path, format: ModelFormat, options: &ParseOptions) -> Result<Graph> {
    let name = path.display().to_string();
    match format {
        ModelFormat::Xml => xml::read_xml_file(path, options),
        ModelFormat::Deps => deps::read_deps_file(path, options),
        ModelFormat::ZippedXml => {
            let file = File::open(path).map_err(|e| FormatError::io(&name, e))?;
            let contents = archive::read_first_member(BufReader::new(file), &name)?;
            xml::read_xml(Cursor::new(contents), &name, options)
        }
    }
}

/// Save a model in the format its file name implies.
///
/// Output goes to a temporary file next to `path` and replaces `path` only
/// once the whole document has been written and synced.
pub fn save_model(graph: &Graph, path: &Path, options: &WriteOptions) -> Result<WriteReport> {
    let name = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (document, report) = match ModelFormat::from_path(path) {
        ModelFormat::Xml | ModelFormat::ZippedXml => xml::to_xml_string(graph, options)?,
        ModelFormat::Deps => deps::to_deps_string(graph, options)?,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FormatError::io(&name, e))?;
    if ModelFormat::from_path(path) == ModelFormat::ZippedXml {
        let member = archive::member_name(path);
        archive::write_member(&mut tmp, &member, document.as_bytes(), &name)?;
    } else {
        tmp.write_all(document.as_bytes())
            .map_err(|e| FormatError::io(&name, e))?;
    }
    tmp.flush().map_err(|e| FormatError::io(&name, e))?;
    tmp.as_file().sync_all().map_err(|e| FormatError::io(&name, e))?;
    tmp.persist(path).map_err(|e| FormatError::io(&name, e.error))?;

    info!(
        "Saved {}: {} elements, {} dropped attributes, {} skipped",
        name,
        graph.element_count(),
        report.dropped.len(),
        report.skipped.len()
    );
    Ok(report)
}

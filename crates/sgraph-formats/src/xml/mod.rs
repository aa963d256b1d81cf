//! `version="2.1"` XML model documents

pub mod reader;
pub mod writer;

pub use reader::{read_xml, read_xml_file, read_xml_str};
pub use writer::{to_xml_string, write_xml};

pub(crate) const MODEL_VERSION: &str = "2.1";

/// Prefix marking attributes that never leave memory.
pub(crate) const TRANSIENT_PREFIX: &str = "_tmp_attr_";

/// `_`-prefix attribute names that would otherwise start with a digit.
pub(crate) fn encode_attr_name(name: &str) -> String {
    if name.trim_start_matches('_').starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name.to_string()
    }
}

/// Inverse of [`encode_attr_name`].
pub(crate) fn decode_attr_name(name: &str) -> &str {
    match name.strip_prefix('_') {
        Some(rest) if rest.trim_start_matches('_').starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => name,
    }
}

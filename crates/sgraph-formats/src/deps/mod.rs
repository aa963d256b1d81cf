//! Line-oriented deps text format
//!
//! ```text
//! /from/path:/to/path:deptype[:detail]
//! @/element/path:attr:value
//! @@attr:value            (attribute of the previous dependency)
//! @@@namespace:attr:value (model attribute)
//! @@@@attr:value          (meta attribute)
//! /bare/path
//! ```

pub mod reader;
pub mod writer;

pub use reader::{read_deps, read_deps_file, read_deps_str};
pub use writer::{to_deps_string, write_deps};

pub(crate) const NEWLINE_TOKEN: &str = "<NEWLINE>";

/// Written elsewhere from the model itself, never round-tripped.
pub(crate) const AUTOGENERATED_ATTRS: &[&str] = &["user_count", "used_count", "coupling", "childcount"];

pub(crate) fn encode_value(value: &str) -> String {
    value
        .replace("\r\n", NEWLINE_TOKEN)
        .replace('\r', NEWLINE_TOKEN)
        .replace('\n', NEWLINE_TOKEN)
}

pub(crate) fn decode_value(value: &str) -> String {
    value.replace(NEWLINE_TOKEN, "\n")
}

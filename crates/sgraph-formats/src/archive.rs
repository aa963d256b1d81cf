//! Single-member zip archives wrapping an XML model

use std::io::{Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{FormatError, Result};

pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Member name for an archive path: the file name without `.zip`.
pub fn member_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(ARCHIVE_SUFFIX)
        .unwrap_or(&file_name)
        .to_string()
}

/// Write `contents` as the only member of a new archive. The archive is
/// complete, central directory included, when this returns.
pub fn write_member<W: Write + Seek>(out: W, member: &str, contents: &[u8], output_name: &str) -> Result<W> {
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(member, options)
        .map_err(|e| FormatError::archive(output_name, e))?;
    zip.write_all(contents)
        .map_err(|e| FormatError::io(output_name, e))?;
    let out = zip.finish().map_err(|e| FormatError::archive(output_name, e))?;
    debug!("Archived {} bytes as {} in {}", contents.len(), member, output_name);
    Ok(out)
}

/// Contents of the first member of an archive.
pub fn read_first_member<R: Read + Seek>(input: R, source_name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(input).map_err(|e| FormatError::archive(source_name, e))?;
    if archive.is_empty() {
        return Err(FormatError::archive(source_name, "archive has no members"));
    }
    let mut member = archive
        .by_index(0)
        .map_err(|e| FormatError::archive(source_name, e))?;
    let mut contents = Vec::new();
    member
        .read_to_end(&mut contents)
        .map_err(|e| FormatError::io(source_name, e))?;
    debug!("Read member {} ({} bytes) from {}", member.name(), contents.len(), source_name);
    Ok(contents)
}

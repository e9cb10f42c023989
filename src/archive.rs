//! Delivery archive
//!
//! Bundles the generated files into one zip at maximum deflate level.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::ooxml::PackageResult;

const COMPRESSION_LEVEL: i64 = 9;

/// One file to place in the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Write `entries` to a new zip at `path`, in order
///
/// On error the partially written file is removed.
pub fn write_archive<P: AsRef<Path>>(path: P, entries: &[ArchiveEntry]) -> PackageResult<u64> {
    let path = path.as_ref();
    let result = write_entries(path, entries);
    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_entries(path: &Path, entries: &[ArchiveEntry]) -> PackageResult<u64> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)?;
        zip.write_all(&entry.data)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;

    Ok(std::fs::metadata(path)?.len())
}

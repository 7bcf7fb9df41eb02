//! Extraction of single entries from zip archives.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{DemError, Result};

/// Upper bound on the buffer reserved up front from an entry's declared size.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Read the entry whose file name (last path component) equals `entry_name`.
///
/// Matching ignores directories inside the archive, so `ETOPO1.tif` also
/// finds `data/ETOPO1.tif`.
pub fn read_entry<P: AsRef<Path>>(archive_path: P, entry_name: &str) -> Result<Vec<u8>> {
    let archive_path = archive_path.as_ref();
    let file = File::open(archive_path)?;
    read_entry_from(file, entry_name).map_err(|e| match e {
        DemError::ArchiveEntryNotFound { entry, .. } => DemError::ArchiveEntryNotFound {
            archive: archive_path.to_path_buf(),
            entry,
        },
        other => other,
    })
}

/// Like [`read_entry`], over any seekable reader.
pub fn read_entry_from<R: Read + Seek>(reader: R, entry_name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let matches = entry
            .name()
            .rsplit('/')
            .next()
            .is_some_and(|name| name == entry_name);
        if matches {
            let mut contents = Vec::with_capacity(capacity_hint(entry.size()));
            entry.read_to_end(&mut contents)?;
            return Ok(contents);
        }
    }

    Err(DemError::ArchiveEntryNotFound {
        archive: "<reader>".into(),
        entry: entry_name.to_string(),
    })
}

/// Initial capacity for an entry of `declared` bytes. The size in the zip
/// header is untrusted; larger entries grow while reading.
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

//! Opening an archive and locating payloads

use crate::manifest::{Entry, Manifest, MANIFEST_NAME};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Payload side of an opened archive
pub struct Payloads {
    zip: ZipArchive<BufReader<File>>,
}

impl Payloads {
    /// Open the payload stream of `entry`, or `None` when the container does
    /// not hold it.
    pub fn open(&mut self, entry: &Entry) -> Result<Option<ZipFile<'_>>> {
        match self.zip.by_name(&entry.payload_name()) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// An opened archive: its validated manifest plus access to payloads.
///
/// Container entries other than the manifest and `payload/` are ignored.
pub struct ArchiveReader {
    pub manifest: Manifest,
    pub payloads: Payloads,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ArchiveNotFound {
                path: path.display().to_string(),
            });
        }

        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::InvalidManifest {
            reason: format!("not a readable archive: {}", e),
        })?;

        let json = {
            let mut manifest_file = zip.by_name(MANIFEST_NAME).map_err(|e| Error::InvalidManifest {
                reason: format!("{} missing: {}", MANIFEST_NAME, e),
            })?;
            let mut json = String::new();
            manifest_file
                .read_to_string(&mut json)
                .map_err(|e| Error::InvalidManifest {
                    reason: format!("{} unreadable: {}", MANIFEST_NAME, e),
                })?;
            json
        };

        let manifest = Manifest::from_json(&json)?;
        debug!(
            "Opened archive {} ({} entries, {} registry trees)",
            path.display(),
            manifest.entries.len(),
            manifest.registry.len()
        );

        Ok(Self {
            manifest,
            payloads: Payloads { zip },
        })
    }
}

/// Read an archive's manifest without restoring anything
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    ArchiveReader::open(path).map(|reader| reader.manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::HashValue;
    use crate::manifest::EntryKind;
    use chrono::Utc;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn entry(target_path: &str) -> Entry {
        Entry {
            id: target_path.to_string(),
            kind: EntryKind::File,
            source_path: format!("/data/{}", target_path),
            target_path: target_path.to_string(),
            size_bytes: 0,
            last_write_time_utc: Utc::now(),
            hash: HashValue::default(),
            attributes: "Normal".to_string(),
            acl: None,
            app_id: None,
            vss_snapshot_id: None,
        }
    }

    #[test]
    fn test_payload_lookup_and_foreign_entries() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("a.rrarchive");

        let mut manifest = Manifest::new("Test", Default::default(), 65536);
        manifest.entries.push(entry("present.txt"));
        manifest.entries.push(entry("absent.txt"));

        let mut zip = ZipWriter::new(File::create(&path)?);
        zip.start_file("payload/present.txt", SimpleFileOptions::default())?;
        zip.write_all(b"here")?;
        zip.start_file("notes/readme.txt", SimpleFileOptions::default())?;
        zip.write_all(b"ignored")?;
        zip.start_file(MANIFEST_NAME, SimpleFileOptions::default())?;
        zip.write_all(manifest.to_json()?.as_bytes())?;
        zip.finish()?;

        let mut reader = ArchiveReader::open(&path)?;
        assert_eq!(reader.manifest, manifest);

        let mut content = String::new();
        reader
            .payloads
            .open(&manifest.entries[0])?
            .expect("payload present")
            .read_to_string(&mut content)?;
        assert_eq!(content, "here");
        assert!(reader.payloads.open(&manifest.entries[1])?.is_none());

        assert_eq!(read_manifest(&path)?.entries.len(), 2);
        Ok(())
    }
}

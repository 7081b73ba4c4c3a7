//! Archive integrity check without touching the filesystem

use super::reader::ArchiveReader;
use super::{IssueKind, RestoreIssue};
use crate::chunk::hash_reader;
use crate::progress::RunControl;
use crate::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of [`verify_archive`]
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub entries_checked: usize,
    pub bytes_checked: u64,
    pub problems: Vec<RestoreIssue>,
}

impl VerifyReport {
    pub fn is_intact(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Re-hash every payload against the manifest
pub fn verify_archive(path: &Path, cancel: Option<&CancellationToken>) -> Result<VerifyReport> {
    let control = RunControl::new(None, cancel);
    let ArchiveReader {
        manifest,
        mut payloads,
        ..
    } = ArchiveReader::open(path)?;

    let chunk_size = manifest.hash.chunk_size_bytes as usize;
    let mut report = VerifyReport::default();

    for entry in &manifest.entries {
        control.checkpoint()?;
        report.entries_checked += 1;

        let Some(mut payload) = payloads.open(entry)? else {
            report.problems.push(RestoreIssue::new(
                IssueKind::MissingPayload,
                entry.target_path.clone(),
                "payload missing from archive",
            ));
            continue;
        };

        let (actual, size) = match hash_reader(&mut payload, chunk_size) {
            Ok(hashed) => hashed,
            Err(e) => {
                report.problems.push(RestoreIssue::new(
                    IssueKind::Io,
                    entry.target_path.clone(),
                    e.to_string(),
                ));
                continue;
            }
        };
        report.bytes_checked += size;

        if size != entry.size_bytes {
            report.problems.push(RestoreIssue::new(
                IssueKind::HashMismatch,
                entry.target_path.clone(),
                format!("size mismatch: expected {}, got {}", entry.size_bytes, size),
            ));
        } else if let Some(message) = entry.hash.mismatch(&actual) {
            report.problems.push(RestoreIssue::new(
                IssueKind::HashMismatch,
                entry.target_path.clone(),
                message,
            ));
        }
    }

    if report.is_intact() {
        info!("Archive {} verified: {} entries", path.display(), report.entries_checked);
    } else {
        warn!(
            "Archive {} has {} damaged entries",
            path.display(),
            report.problems.len()
        );
    }

    Ok(report)
}

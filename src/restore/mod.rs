//! Archive reader and restorer.
//!
//! Applies an archive to the live filesystem and registry. Only missing or
//! unreadable archives abort a run; everything that goes wrong with a single
//! file or registry value is collected as a [`RestoreIssue`] and the run
//! continues.

pub mod conflict;
pub mod reader;
pub mod verify;

use crate::chunk::HashingWriter;
use crate::manifest::{ConflictStrategy, Entry};
use crate::paths::{display_path, extended_length, rebase};
use crate::progress::{ProgressSink, RunControl};
use crate::registry::{self, ApplyReport, RegistryStore};
use crate::Result;
use conflict::ConflictAction;
use reader::{ArchiveReader, Payloads};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, span, warn, Level};

pub use reader::read_manifest;
pub use verify::{verify_archive, VerifyReport};

/// Which archive to apply and how
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub archive_path: PathBuf,
    /// Re-root every entry under this directory
    pub destination_root: Option<PathBuf>,
    /// Re-root every entry under this volume; wins over `destination_root`
    pub volume_root: Option<PathBuf>,
    /// Falls back to the archive's recorded policy when unset
    pub conflict_strategy: Option<ConflictStrategy>,
    pub verify_hashes: bool,
    pub restore_registry: bool,
}

impl RestoreRequest {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            destination_root: None,
            volume_root: None,
            conflict_strategy: None,
            verify_hashes: true,
            restore_registry: false,
        }
    }

    pub fn with_destination_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.destination_root = Some(root.into());
        self
    }

    pub fn with_volume_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.volume_root = Some(root.into());
        self
    }

    pub fn with_conflict_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = Some(strategy);
        self
    }

    pub fn with_verify_hashes(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }

    pub fn with_restore_registry(mut self, restore: bool) -> Self {
        self.restore_registry = restore;
        self
    }

    /// Where `entry` lands. Volume root, destination root and in-place are
    /// mutually exclusive, in that order of precedence.
    pub fn resolve_target(&self, entry: &Entry) -> PathBuf {
        let original = Path::new(&entry.source_path);

        if let Some(volume_root) = &self.volume_root {
            rebase(original, volume_root)
        } else if let Some(destination_root) = &self.destination_root {
            rebase(original, destination_root)
        } else {
            original.to_path_buf()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// The manifest names a payload the container does not hold
    MissingPayload,
    /// Target existed and the Skip strategy left it alone
    ConflictSkipped,
    /// Restored bytes do not match the recorded digests
    HashMismatch,
    /// Filesystem failure while restoring one entry
    Io,
    /// Failure writing one registry key or value
    Registry,
    /// Registry snapshot outside HKCU, never applied
    RegistryRejected,
}

/// One problem encountered during a bulk run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreIssue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

impl RestoreIssue {
    pub fn new(kind: IssueKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RestoreIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {}", self.kind, self.path, self.message)
    }
}

/// Report of a restore run, owned by the caller
#[derive(Debug, Clone, Default)]
pub struct RestoreResult {
    /// Entries listed in the manifest
    pub total_entries: usize,
    /// Files written
    pub restored: usize,
    pub issues: Vec<RestoreIssue>,
    pub renamed: usize,
    pub backed_up: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub registry_keys: usize,
    pub registry_values: usize,
    /// Human-readable trace of every action taken
    pub log: Vec<String>,
}

impl RestoreResult {
    pub fn has_errors(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &RestoreIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    fn note(&mut self, line: String) {
        debug!("{}", line);
        self.log.push(line);
    }

    fn record(&mut self, issue: RestoreIssue) {
        warn!("{}", issue);
        self.log.push(format!("ISSUE {}", issue));
        self.issues.push(issue);
    }
}

/// Applies archives to the live system
#[derive(Clone)]
pub struct RestoreEngine {
    registry: Arc<dyn RegistryStore>,
}

impl Default for RestoreEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RestoreEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreEngine").finish_non_exhaustive()
    }
}

impl RestoreEngine {
    /// Engine writing to the host registry
    pub fn new() -> Self {
        Self {
            registry: registry::default_store(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn RegistryStore>) -> Self {
        self.registry = registry;
        self
    }

    /// Restore an archive on a blocking worker thread
    pub async fn restore(
        &self,
        request: RestoreRequest,
        progress: Option<ProgressSink>,
        cancel: Option<CancellationToken>,
    ) -> Result<RestoreResult> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || {
            engine.restore_blocking(&request, progress.as_ref(), cancel.as_ref())
        })
        .await?
    }

    /// Restore an archive on the current thread
    pub fn restore_blocking(
        &self,
        request: &RestoreRequest,
        progress: Option<&ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> Result<RestoreResult> {
        let span = span!(Level::INFO, "restore_archive", archive = %request.archive_path.display());
        let _enter = span.enter();

        let control = RunControl::new(progress, cancel);
        let ArchiveReader {
            manifest,
            mut payloads,
            ..
        } = ArchiveReader::open(&request.archive_path)?;

        let strategy = request
            .conflict_strategy
            .unwrap_or(manifest.policies.conflict_strategy);
        let chunk_size = manifest.hash.chunk_size_bytes as usize;
        let long_paths = manifest.policies.long_path_aware;

        info!(
            "Restoring {} entries from '{}' with {:?}",
            manifest.entries.len(),
            manifest.generator,
            strategy
        );

        let mut result = RestoreResult {
            total_entries: manifest.entries.len(),
            ..Default::default()
        };

        if request.restore_registry && !manifest.registry.is_empty() {
            let mut report = ApplyReport::default();
            for snapshot in &manifest.registry {
                control.checkpoint()?;
                registry::apply(self.registry.as_ref(), snapshot, &mut report);
                result.note(format!("registry {}\\{}", snapshot.root, snapshot.path));
            }

            result.registry_keys = report.keys_written;
            result.registry_values = report.values_written;
            for issue in report.issues {
                result.record(issue);
            }
        }

        let total = manifest.entries.len();
        for (index, entry) in manifest.entries.iter().enumerate() {
            control.checkpoint()?;

            let target = request.resolve_target(entry);
            let display = display_path(&target);

            let job = EntryJob {
                entry,
                target: extended_length(&target, long_paths),
                display: &display,
                strategy,
                chunk_size,
                verify: request.verify_hashes,
            };

            if let Err(e) = job.run(&mut payloads, &mut result) {
                result.record(RestoreIssue::new(IssueKind::Io, display.clone(), e.to_string()));
            }

            control.report(index + 1, total, &display);
        }

        info!(
            "Restore completed: {}/{} restored, {} renamed, {} backed up, {} overwritten, {} skipped, {} issues",
            result.restored,
            result.total_entries,
            result.renamed,
            result.backed_up,
            result.overwritten,
            result.skipped,
            result.issues.len()
        );

        Ok(result)
    }
}

/// Restoration of a single manifest entry
struct EntryJob<'a> {
    entry: &'a Entry,
    target: PathBuf,
    display: &'a str,
    strategy: ConflictStrategy,
    chunk_size: usize,
    verify: bool,
}

impl EntryJob<'_> {
    fn run(&self, payloads: &mut Payloads, result: &mut RestoreResult) -> Result<()> {
        let Some(mut payload) = payloads.open(self.entry)? else {
            result.record(RestoreIssue::new(
                IssueKind::MissingPayload,
                self.display,
                format!("payload {} missing from archive", self.entry.payload_name()),
            ));
            return Ok(());
        };

        let exists = fs::symlink_metadata(&self.target).is_ok();
        match conflict::resolve(exists, self.strategy) {
            ConflictAction::Write => {}
            ConflictAction::Skip => {
                result.skipped += 1;
                result.record(RestoreIssue::new(
                    IssueKind::ConflictSkipped,
                    self.display,
                    "target exists, skipped",
                ));
                return Ok(());
            }
            ConflictAction::Overwrite => {
                fs::remove_file(&self.target)?;
                result.overwritten += 1;
                result.note(format!("overwrite {}", self.display));
            }
            action @ (ConflictAction::Rename | ConflictAction::Backup) => {
                let suffix = action.sibling_suffix().unwrap_or(conflict::RENAME_SUFFIX);
                let sibling = conflict::unique_sibling(&self.target, suffix);
                fs::rename(&self.target, &sibling)?;

                if action == ConflictAction::Rename {
                    result.renamed += 1;
                } else {
                    result.backed_up += 1;
                }
                result.note(format!(
                    "moved existing {} to {}",
                    self.display,
                    display_path(&sibling)
                ));
            }
        }

        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.target)?;
        let mut writer = HashingWriter::new(BufWriter::new(file), self.chunk_size);
        io::copy(&mut payload, &mut writer)?;
        let (buffered, actual) = writer.finish();
        let file = buffered.into_inner().map_err(|e| e.into_error())?;

        if self.verify {
            if let Some(message) = self.entry.hash.mismatch(&actual) {
                result.record(RestoreIssue::new(IssueKind::HashMismatch, self.display, message));
            }
        }

        file.set_modified(SystemTime::from(self.entry.last_write_time_utc))?;

        result.restored += 1;
        result.note(format!("restored {} ({} bytes)", self.display, self.entry.size_bytes));
        Ok(())
    }
}

//! # rrarchive
//!
//! Self-contained snapshot archives for files, directory trees and the
//! current-user registry hive.
//!
//! ## Features
//!
//! - **Archive Writer**: Streams files into a zip container with chunked SHA-256 digests
//! - **Restorer**: Conflict strategies, path re-rooting and per-file issue reporting
//! - **Registry**: HKCU capture and restore through a pluggable store
//! - **Verification**: Re-hash an archive without touching the filesystem
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rrarchive::{BackupRequest, RestoreRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let backup = rrarchive::create(
//!     BackupRequest::new(["./my-data"], "./out/my-data.rrarchive"),
//!     None,
//!     None,
//! )
//! .await?;
//! println!("Archived {} files", backup.entry_count);
//!
//! let restored = rrarchive::restore(
//!     RestoreRequest::new(&backup.archive_path).with_destination_root("./restored"),
//!     None,
//!     None,
//! )
//! .await?;
//! println!("Restored {} files, {} issues", restored.restored, restored.issues.len());
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod chunk;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod paths;
pub mod progress;
pub mod registry;
pub mod restore;
pub mod snapshot;

// Re-export commonly used types
pub use backup::{ArchiveWriter, BackupRequest, BackupResult};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use manifest::{ConflictStrategy, Manifest, Policies};
pub use progress::{Progress, ProgressSink};
pub use restore::{
    read_manifest, verify_archive, IssueKind, RestoreEngine, RestoreIssue, RestoreRequest,
    RestoreResult, VerifyReport,
};
pub use tokio_util::sync::CancellationToken;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create an archive with a default [`ArchiveWriter`]
pub async fn create(
    request: BackupRequest,
    progress: Option<ProgressSink>,
    cancel: Option<CancellationToken>,
) -> Result<BackupResult> {
    ArchiveWriter::new().create(request, progress, cancel).await
}

/// Restore an archive with a default [`RestoreEngine`]
pub async fn restore(
    request: RestoreRequest,
    progress: Option<ProgressSink>,
    cancel: Option<CancellationToken>,
) -> Result<RestoreResult> {
    RestoreEngine::new().restore(request, progress, cancel).await
}

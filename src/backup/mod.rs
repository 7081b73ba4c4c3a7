//! Archive writer.
//!
//! Captures files, directory trees and HKCU registry keys into a single
//! rrarchive container: one deflated `payload/<target>` entry per file and a
//! root `manifest.json` describing everything.

pub mod writer;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::manifest::{App, Manifest, Policies, Profile};
use std::path::PathBuf;

pub use writer::ArchiveWriter;

/// Generator label used when the request does not name one
pub const DEFAULT_GENERATOR: &str = "rrarchive";

/// What to capture and where to put it
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Files and/or directories. May be empty when only registry keys are wanted.
    pub sources: Vec<PathBuf>,
    /// Archive file to create
    pub destination: PathBuf,
    /// Chunk size for hashing, clamped to [`MIN_CHUNK_SIZE`](crate::chunk::MIN_CHUNK_SIZE)
    pub chunk_size: usize,
    pub generator: Option<String>,
    pub policies: Policies,
    /// Full key paths such as `HKCU\Software\Vendor`. Other hives are ignored.
    pub registry_keys: Vec<String>,
    pub profiles: Option<Vec<Profile>>,
    pub apps: Option<Vec<App>>,
}

impl BackupRequest {
    pub fn new<I, P>(sources: I, destination: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            destination: destination.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            generator: None,
            policies: Policies::default(),
            registry_keys: Vec::new(),
            profiles: None,
            apps: None,
        }
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_registry_key(mut self, key_path: impl Into<String>) -> Self {
        self.registry_keys.push(key_path.into());
        self
    }

    pub fn with_profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_apps(mut self, apps: Vec<App>) -> Self {
        self.apps = Some(apps);
        self
    }
}

/// Outcome of a completed write
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub archive_path: PathBuf,
    pub manifest: Manifest,
    pub entry_count: usize,
    pub total_bytes: u64,
    /// Files found during the walk that could not be opened, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

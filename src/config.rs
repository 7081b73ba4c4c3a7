//! Engine defaults loaded from TOML

use crate::backup::{BackupRequest, DEFAULT_GENERATOR};
use crate::chunk::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::manifest::Policies;
use crate::restore::RestoreRequest;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Defaults applied to every request built from this config.
///
/// The crate never picks a config location itself; callers pass the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunk_size_bytes: usize,
    pub generator: String,
    pub policies: Policies,
    pub verify_hashes: bool,
    pub restore_registry: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            generator: DEFAULT_GENERATOR.to_string(),
            policies: Policies::default(),
            verify_hashes: true,
            restore_registry: false,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size_bytes < MIN_CHUNK_SIZE {
            return Err(Error::Configuration {
                reason: format!(
                    "chunk_size_bytes must be at least {} (got {})",
                    MIN_CHUNK_SIZE, self.chunk_size_bytes
                ),
            });
        }

        if self.generator.trim().is_empty() {
            return Err(Error::Configuration {
                reason: "generator must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Backup request seeded with these defaults
    pub fn backup_request<I, P>(&self, sources: I, destination: impl Into<PathBuf>) -> BackupRequest
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        BackupRequest::new(sources, destination)
            .with_chunk_size(self.chunk_size_bytes)
            .with_generator(self.generator.clone())
            .with_policies(self.policies.clone())
    }

    /// Restore request seeded with these defaults. The conflict strategy is
    /// left to the archive's own policy.
    pub fn restore_request(&self, archive_path: impl Into<PathBuf>) -> RestoreRequest {
        RestoreRequest::new(archive_path)
            .with_verify_hashes(self.verify_hashes)
            .with_restore_registry(self.restore_registry)
    }
}

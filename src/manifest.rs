//! Manifest model describing the contents of one archive

use crate::chunk::{HashValue, DEFAULT_CHUNK_SIZE, HASH_ALGORITHM};
use crate::registry::RegistryKind;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Manifest format version written by this crate
pub const MANIFEST_VERSION: u32 = 1;

/// Container format tag stored in every manifest
pub const ARCHIVE_FORMAT: &str = "rrarchive";

/// File name of the manifest at the container root
pub const MANIFEST_NAME: &str = "manifest.json";

/// Directory prefix of file payloads inside the container
pub const PAYLOAD_PREFIX: &str = "payload/";

/// The only registry hive that is ever captured or applied
pub const HKCU: &str = "HKCU";

/// What to do when a restore target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConflictStrategy {
    /// Delete the existing file and write the restored one
    Overwrite,
    /// Move the existing file to `<name>-backup`
    #[default]
    Rename,
    /// Leave the existing file untouched
    Skip,
    /// Move the existing file to `<name>.bak`
    BackupExisting,
}

/// Capture and restore policies recorded with the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Policies {
    pub conflict_strategy: ConflictStrategy,
    pub long_path_aware: bool,
    /// Opaque tag interpreted by the surrounding application
    pub one_drive_handling: String,
    /// Reserved for a consistent-snapshot reader
    pub vss_required: bool,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::default(),
            long_path_aware: true,
            one_drive_handling: "Default".to_string(),
            vss_required: false,
        }
    }
}

/// Hash parameters shared by every entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashInfo {
    pub algorithm: String,
    pub chunk_size_bytes: u64,
}

impl Default for HashInfo {
    fn default() -> Self {
        Self {
            algorithm: HASH_ALGORITHM.to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
}

/// Owner and security descriptor captured for an entry (informational)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclInfo {
    pub owner: Option<String>,
    pub sddl: Option<String>,
}

/// A single captured file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    /// Absolute path at capture time
    pub source_path: String,
    /// Archive-relative path, forward slashes
    pub target_path: String,
    pub size_bytes: u64,
    pub last_write_time_utc: DateTime<Utc>,
    pub hash: HashValue,
    pub attributes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AclInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vss_snapshot_id: Option<String>,
}

impl Entry {
    /// Name of this entry's payload inside the container
    pub fn payload_name(&self) -> String {
        format!("{}{}", PAYLOAD_PREFIX, self.target_path)
    }
}

/// One registry value in its JSON-safe form.
///
/// `data` is kept as text so that one malformed value never makes the whole
/// manifest unreadable; it is decoded per value at restore time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryValueRecord {
    pub name: String,
    pub kind: RegistryKind,
    pub data: String,
}

/// Recursive snapshot of one registry key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub root: String,
    /// Subkey path below the hive, backslash separated
    pub path: String,
    #[serde(default)]
    pub values: Vec<RegistryValueRecord>,
    #[serde(default)]
    pub children: Vec<RegistrySnapshot>,
}

impl RegistrySnapshot {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            root: HKCU.to_string(),
            path: path.into(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_current_user(&self) -> bool {
        self.root == HKCU
    }

    /// Number of keys in this subtree, including this one
    pub fn key_count(&self) -> usize {
        1 + self.children.iter().map(Self::key_count).sum::<usize>()
    }
}

/// A user profile associated with the archive (informational)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// An installed application associated with the archive (informational)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Archive manifest. Written once by the writer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format_version: u32,
    pub created_utc: DateTime<Utc>,
    pub archive_format: String,
    pub generator: String,
    #[serde(default)]
    pub policies: Policies,
    pub hash: HashInfo,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub registry: Vec<RegistrySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<Profile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<Vec<App>>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(generator: impl Into<String>, policies: Policies, chunk_size: usize) -> Self {
        Self {
            format_version: MANIFEST_VERSION,
            created_utc: Utc::now(),
            archive_format: ARCHIVE_FORMAT.to_string(),
            generator: generator.into(),
            policies,
            hash: HashInfo {
                algorithm: HASH_ALGORITHM.to_string(),
                chunk_size_bytes: chunk_size as u64,
            },
            entries: Vec::new(),
            registry: Vec::new(),
            profiles: None,
            apps: None,
        }
    }

    /// Sum of all entry sizes
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size_bytes).sum()
    }

    pub fn find_entry(&self, target_path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.target_path == target_path)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a manifest document
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json).map_err(|e| Error::InvalidManifest {
            reason: format!("unreadable manifest: {}", e),
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.archive_format != ARCHIVE_FORMAT {
            return Err(Error::InvalidManifest {
                reason: format!("unknown archive format '{}'", self.archive_format),
            });
        }

        if self.format_version == 0 || self.format_version > MANIFEST_VERSION {
            return Err(Error::InvalidManifest {
                reason: format!(
                    "unsupported manifest version: {} (expected at most {})",
                    self.format_version, MANIFEST_VERSION
                ),
            });
        }

        if self.hash.chunk_size_bytes == 0 {
            return Err(Error::InvalidManifest {
                reason: "chunk size must be positive".to_string(),
            });
        }

        Ok(())
    }
}

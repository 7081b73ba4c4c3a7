//! Current-user registry capture and restore.
//!
//! Values travel through the manifest as `{name, kind, data}` records with
//! text-only data. [`RegistryData`] is the typed form; each variant has its own
//! encode/decode pair. The host registry is reached exclusively through the
//! four primitives of [`RegistryStore`], all of which are scoped to HKCU.

pub mod memory;
#[cfg(windows)]
pub mod windows;

use crate::manifest::{RegistrySnapshot, RegistryValueRecord, HKCU};
use crate::restore::{IssueKind, RestoreIssue};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use memory::MemoryRegistry;
#[cfg(windows)]
pub use self::windows::WindowsRegistry;

/// Kind tag of a registry value as stored in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistryKind {
    String,
    /// String holding `%VAR%` references, expanded by the reader
    ExpandString,
    Binary,
    MultiString,
    DWord,
    QWord,
    /// Any tag this crate cannot restore
    #[serde(other)]
    Unsupported,
}

/// A typed registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    String(String),
    ExpandString(String),
    Binary(Vec<u8>),
    MultiString(Vec<String>),
    DWord(u32),
    QWord(u64),
}

impl RegistryData {
    pub fn kind(&self) -> RegistryKind {
        match self {
            RegistryData::String(_) => RegistryKind::String,
            RegistryData::ExpandString(_) => RegistryKind::ExpandString,
            RegistryData::Binary(_) => RegistryKind::Binary,
            RegistryData::MultiString(_) => RegistryKind::MultiString,
            RegistryData::DWord(_) => RegistryKind::DWord,
            RegistryData::QWord(_) => RegistryKind::QWord,
        }
    }

    /// Render the value as JSON-safe text
    pub fn encode(&self) -> String {
        match self {
            RegistryData::String(s) | RegistryData::ExpandString(s) => s.clone(),
            RegistryData::Binary(bytes) => encode_binary(bytes),
            RegistryData::MultiString(items) => encode_multi_string(items),
            RegistryData::DWord(n) => n.to_string(),
            RegistryData::QWord(n) => n.to_string(),
        }
    }

    /// Rebuild a typed value from its kind tag and text form
    pub fn decode(kind: RegistryKind, data: &str) -> Result<Self> {
        match kind {
            RegistryKind::String => Ok(RegistryData::String(data.to_string())),
            RegistryKind::ExpandString => Ok(RegistryData::ExpandString(data.to_string())),
            RegistryKind::Binary => decode_binary(data).map(RegistryData::Binary),
            RegistryKind::MultiString => decode_multi_string(data).map(RegistryData::MultiString),
            RegistryKind::DWord => Ok(RegistryData::DWord(decode_dword(data))),
            RegistryKind::QWord => Ok(RegistryData::QWord(decode_qword(data))),
            RegistryKind::Unsupported => Err(Error::Registry {
                reason: "unsupported value kind".to_string(),
            }),
        }
    }
}

/// Build the manifest record for a named value
pub fn encode_value(name: &str, data: &RegistryData) -> RegistryValueRecord {
    RegistryValueRecord {
        name: name.to_string(),
        kind: data.kind(),
        data: data.encode(),
    }
}

/// Decode a manifest record back into typed data
pub fn decode_value(record: &RegistryValueRecord) -> Result<RegistryData> {
    RegistryData::decode(record.kind, &record.data)
}

fn encode_binary(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

fn decode_binary(data: &str) -> Result<Vec<u8>> {
    BASE64.decode(data.trim()).map_err(|e| Error::Registry {
        reason: format!("invalid base64 binary value: {}", e),
    })
}

fn encode_multi_string(items: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn decode_multi_string(data: &str) -> Result<Vec<String>> {
    serde_json::from_str(data).map_err(|e| Error::Registry {
        reason: format!("invalid multi-string value: {}", e),
    })
}

fn decode_dword(data: &str) -> u32 {
    let data = data.trim();
    data.parse::<u32>()
        .or_else(|_| data.parse::<i32>().map(|n| n as u32))
        .unwrap_or(0)
}

fn decode_qword(data: &str) -> u64 {
    let data = data.trim();
    data.parse::<u64>()
        .or_else(|_| data.parse::<i64>().map(|n| n as u64))
        .unwrap_or(0)
}

/// Access to the current-user registry hive.
///
/// Every path is a backslash-separated subkey path relative to HKCU.
pub trait RegistryStore: Send + Sync {
    /// Open the key for writing, creating it and any missing parents
    fn create_key(&self, path: &str) -> Result<()>;

    /// Named values of a key
    fn values(&self, path: &str) -> Result<Vec<(String, RegistryData)>>;

    /// Names of the direct child keys of a key
    fn subkeys(&self, path: &str) -> Result<Vec<String>>;

    fn set_value(&self, path: &str, name: &str, data: &RegistryData) -> Result<()>;
}

/// The registry of the host: the real HKCU hive on Windows, an empty
/// in-memory hive elsewhere.
pub fn default_store() -> Arc<dyn RegistryStore> {
    #[cfg(windows)]
    {
        Arc::new(WindowsRegistry::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(MemoryRegistry::new())
    }
}

/// Split a full key path like `HKCU\Software\Vendor` into its HKCU subkey
/// path. Returns `None` for any other hive.
pub fn parse_key_path(key_path: &str) -> Option<String> {
    let normalized = key_path.replace('/', "\\");
    let mut parts = normalized.split('\\').filter(|p| !p.is_empty());
    let hive = parts.next()?;

    if !hive.eq_ignore_ascii_case(HKCU) && !hive.eq_ignore_ascii_case("HKEY_CURRENT_USER") {
        return None;
    }

    Some(parts.collect::<Vec<_>>().join("\\"))
}

/// Join a parent key path and a child name
pub fn join_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}\\{}", parent, child)
    }
}

/// Recursively snapshot the subtree at `path`.
///
/// The root key must be readable; unreadable descendants are skipped.
pub fn capture(
    store: &dyn RegistryStore,
    path: &str,
    cancel: Option<&CancellationToken>,
) -> Result<RegistrySnapshot> {
    if cancel.is_some_and(|token| token.is_cancelled()) {
        return Err(Error::Cancelled);
    }

    let mut snapshot = RegistrySnapshot::new(path);

    for (name, data) in store.values(path)? {
        snapshot.values.push(encode_value(&name, &data));
    }

    for child in store.subkeys(path)? {
        let child_path = join_key(path, &child);
        match capture(store, &child_path, cancel) {
            Ok(child_snapshot) => snapshot.children.push(child_snapshot),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => warn!("Skipping registry key HKCU\\{}: {}", child_path, e),
        }
    }

    debug!(
        "Captured registry key HKCU\\{} ({} values)",
        path,
        snapshot.values.len()
    );
    Ok(snapshot)
}

/// Outcome of applying registry snapshots
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub keys_written: usize,
    pub values_written: usize,
    pub issues: Vec<RestoreIssue>,
}

/// Recursively write a snapshot back into the store.
///
/// Best-effort: a failing key or value becomes an issue and the walk goes on.
/// Snapshots rooted anywhere but HKCU are refused at every level.
pub fn apply(store: &dyn RegistryStore, snapshot: &RegistrySnapshot, report: &mut ApplyReport) {
    let key_display = format!("{}\\{}", snapshot.root, snapshot.path);

    if !snapshot.is_current_user() {
        warn!("Refusing to restore registry key outside HKCU: {}", key_display);
        report.issues.push(RestoreIssue::new(
            IssueKind::RegistryRejected,
            key_display,
            "only HKCU keys may be restored",
        ));
        return;
    }

    match store.create_key(&snapshot.path) {
        Ok(()) => {
            report.keys_written += 1;

            for record in &snapshot.values {
                let result =
                    decode_value(record).and_then(|data| store.set_value(&snapshot.path, &record.name, &data));

                match result {
                    Ok(()) => report.values_written += 1,
                    Err(e) => {
                        warn!("Failed to restore value {} in {}: {}", record.name, key_display, e);
                        report.issues.push(RestoreIssue::new(
                            IssueKind::Registry,
                            format!("{}\\{}", key_display, record.name),
                            e.to_string(),
                        ));
                    }
                }
            }
        }
        Err(e) => {
            warn!("Failed to open registry key {}: {}", key_display, e);
            report
                .issues
                .push(RestoreIssue::new(IssueKind::Registry, key_display, e.to_string()));
        }
    }

    for child in &snapshot.children {
        apply(store, child, report);
    }
}

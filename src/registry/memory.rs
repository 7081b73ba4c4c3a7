//! In-process registry hive

use super::{RegistryData, RegistryStore};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MemoryKey {
    /// Path with its original casing
    path: String,
    values: Vec<(String, RegistryData)>,
}

/// A registry hive held in memory.
///
/// Key and value names are matched case-insensitively, like the Windows
/// registry. Used on hosts without a registry and in tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: RwLock<BTreeMap<String, MemoryKey>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a key and everything below it
    pub fn delete_tree(&self, path: &str) -> Result<()> {
        let (_, lookup) = normalize(path);
        let prefix = format!("{}\\", lookup);
        let mut keys = self.write()?;
        keys.retain(|key, _| *key != lookup && !key.starts_with(&prefix));
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, MemoryKey>>> {
        self.keys.read().map_err(|_| Error::Registry {
            reason: "registry lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, MemoryKey>>> {
        self.keys.write().map_err(|_| Error::Registry {
            reason: "registry lock poisoned".to_string(),
        })
    }
}

/// Returns the cleaned path and its lowercase lookup key
fn normalize(path: &str) -> (String, String) {
    let cleaned = path
        .split(['\\', '/'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\\");
    let lookup = cleaned.to_lowercase();
    (cleaned, lookup)
}

fn not_found(path: &str) -> Error {
    Error::Registry {
        reason: format!("key not found: HKCU\\{}", path),
    }
}

impl RegistryStore for MemoryRegistry {
    fn create_key(&self, path: &str) -> Result<()> {
        let (cleaned, _) = normalize(path);
        if cleaned.is_empty() {
            return Ok(());
        }

        let mut keys = self.write()?;
        let mut current = String::new();
        for part in cleaned.split('\\') {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(part);

            keys.entry(current.to_lowercase()).or_insert_with(|| MemoryKey {
                path: current.clone(),
                values: Vec::new(),
            });
        }
        Ok(())
    }

    fn values(&self, path: &str) -> Result<Vec<(String, RegistryData)>> {
        let (_, lookup) = normalize(path);
        let keys = self.read()?;

        match keys.get(&lookup) {
            Some(key) => Ok(key.values.clone()),
            None if lookup.is_empty() => Ok(Vec::new()),
            None => Err(not_found(path)),
        }
    }

    fn subkeys(&self, path: &str) -> Result<Vec<String>> {
        let (_, lookup) = normalize(path);
        let keys = self.read()?;

        if !lookup.is_empty() && !keys.contains_key(&lookup) {
            return Err(not_found(path));
        }

        let prefix = if lookup.is_empty() {
            String::new()
        } else {
            format!("{}\\", lookup)
        };

        Ok(keys
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix) && !key[prefix.len()..].contains('\\'))
            .filter_map(|(_, key)| key.path.rsplit('\\').next().map(str::to_string))
            .collect())
    }

    fn set_value(&self, path: &str, name: &str, data: &RegistryData) -> Result<()> {
        let (_, lookup) = normalize(path);
        let mut keys = self.write()?;
        let key = keys.get_mut(&lookup).ok_or_else(|| not_found(path))?;

        match key
            .values
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = data.clone(),
            None => key.values.push((name.to_string(), data.clone())),
        }
        Ok(())
    }
}

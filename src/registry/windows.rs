//! HKCU access through the Win32 registry API

use super::{RegistryData, RegistryStore};
use crate::{Error, Result};
use std::io;
use tracing::debug;
use winreg::enums::{
    RegType, HKEY_CURRENT_USER, KEY_READ, REG_BINARY, REG_DWORD, REG_EXPAND_SZ, REG_MULTI_SZ,
    REG_QWORD, REG_SZ,
};
use winreg::types::{FromRegValue, ToRegValue};
use winreg::{RegKey, RegValue};

/// The current user's registry hive
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRegistry;

impl WindowsRegistry {
    pub fn new() -> Self {
        Self
    }

    fn hive() -> RegKey {
        RegKey::predef(HKEY_CURRENT_USER)
    }

    fn open_read(path: &str) -> Result<RegKey> {
        Self::hive()
            .open_subkey_with_flags(path, KEY_READ)
            .map_err(|e| registry_error(path, e))
    }
}

fn registry_error(path: &str, error: io::Error) -> Error {
    Error::Registry {
        reason: format!("HKCU\\{}: {}", path, error),
    }
}

fn to_data(value: &RegValue) -> io::Result<Option<RegistryData>> {
    let data = match value.vtype {
        REG_SZ => RegistryData::String(String::from_reg_value(value)?),
        REG_EXPAND_SZ => RegistryData::ExpandString(String::from_reg_value(value)?),
        REG_MULTI_SZ => RegistryData::MultiString(Vec::<String>::from_reg_value(value)?),
        REG_DWORD => RegistryData::DWord(u32::from_reg_value(value)?),
        REG_QWORD => RegistryData::QWord(u64::from_reg_value(value)?),
        REG_BINARY => RegistryData::Binary(value.bytes.clone()),
        _ => return Ok(None),
    };
    Ok(Some(data))
}

fn kind_name(vtype: &RegType) -> String {
    format!("{:?}", vtype)
}

impl RegistryStore for WindowsRegistry {
    fn create_key(&self, path: &str) -> Result<()> {
        Self::hive()
            .create_subkey(path)
            .map(|_| ())
            .map_err(|e| registry_error(path, e))
    }

    fn values(&self, path: &str) -> Result<Vec<(String, RegistryData)>> {
        let key = Self::open_read(path)?;
        let mut values = Vec::new();

        for item in key.enum_values() {
            let (name, value) = item.map_err(|e| registry_error(path, e))?;
            match to_data(&value).map_err(|e| registry_error(path, e))? {
                Some(data) => values.push((name, data)),
                None => debug!(
                    "Skipping value {} of unsupported kind {} in HKCU\\{}",
                    name,
                    kind_name(&value.vtype),
                    path
                ),
            }
        }

        Ok(values)
    }

    fn subkeys(&self, path: &str) -> Result<Vec<String>> {
        let key = Self::open_read(path)?;
        key.enum_keys()
            .collect::<io::Result<Vec<_>>>()
            .map_err(|e| registry_error(path, e))
    }

    fn set_value(&self, path: &str, name: &str, data: &RegistryData) -> Result<()> {
        let (key, _) = Self::hive()
            .create_subkey(path)
            .map_err(|e| registry_error(path, e))?;

        let result = match data {
            RegistryData::String(s) => key.set_value(name, s),
            RegistryData::ExpandString(s) => key.set_raw_value(
                name,
                &RegValue {
                    bytes: s.to_reg_value().bytes,
                    vtype: REG_EXPAND_SZ,
                },
            ),
            RegistryData::MultiString(items) => key.set_value(name, items),
            RegistryData::DWord(n) => key.set_value(name, n),
            RegistryData::QWord(n) => key.set_value(name, n),
            RegistryData::Binary(bytes) => key.set_raw_value(
                name,
                &RegValue {
                    bytes: bytes.clone(),
                    vtype: REG_BINARY,
                },
            ),
        };

        result.map_err(|e| registry_error(path, e))
    }
}

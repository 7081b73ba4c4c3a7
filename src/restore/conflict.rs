//! Conflict handling for restore targets that already exist

use crate::manifest::ConflictStrategy;
use std::path::{Path, PathBuf};

/// Suffix given to an existing file moved aside by [`ConflictStrategy::Rename`]
pub const RENAME_SUFFIX: &str = "-backup";

/// Suffix given to an existing file moved aside by [`ConflictStrategy::BackupExisting`]
pub const BACKUP_SUFFIX: &str = ".bak";

/// What to do with a restore target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    /// Nothing in the way, write directly
    Write,
    /// Delete the existing file first
    Overwrite,
    /// Move the existing file to `<name>-backup`
    Rename,
    /// Leave the existing file alone and do not write
    Skip,
    /// Move the existing file to `<name>.bak`
    Backup,
}

impl ConflictAction {
    /// Suffix for the moved-aside sibling, if this action keeps the old file
    pub fn sibling_suffix(self) -> Option<&'static str> {
        match self {
            ConflictAction::Rename => Some(RENAME_SUFFIX),
            ConflictAction::Backup => Some(BACKUP_SUFFIX),
            _ => None,
        }
    }
}

/// Map target existence and the configured strategy to an action
pub fn resolve(exists: bool, strategy: ConflictStrategy) -> ConflictAction {
    if !exists {
        return ConflictAction::Write;
    }

    match strategy {
        ConflictStrategy::Overwrite => ConflictAction::Overwrite,
        ConflictStrategy::Rename => ConflictAction::Rename,
        ConflictStrategy::Skip => ConflictAction::Skip,
        ConflictStrategy::BackupExisting => ConflictAction::Backup,
    }
}

/// First free sibling named `<name><suffix>`, then `<name><suffix>1`,
/// `<name><suffix>2`, …
pub fn unique_sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = format!("{}{}", name, suffix);

    let candidate = path.with_file_name(&base);
    if !candidate.exists() {
        return candidate;
    }

    let mut n: u32 = 1;
    loop {
        let candidate = path.with_file_name(format!("{}{}", base, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_without_conflict_always_writes() {
        for strategy in [
            ConflictStrategy::Overwrite,
            ConflictStrategy::Rename,
            ConflictStrategy::Skip,
            ConflictStrategy::BackupExisting,
        ] {
            assert_eq!(resolve(false, strategy), ConflictAction::Write);
        }
    }

    #[test]
    fn test_resolve_existing_target() {
        assert_eq!(resolve(true, ConflictStrategy::Overwrite), ConflictAction::Overwrite);
        assert_eq!(resolve(true, ConflictStrategy::Rename), ConflictAction::Rename);
        assert_eq!(resolve(true, ConflictStrategy::Skip), ConflictAction::Skip);
        assert_eq!(resolve(true, ConflictStrategy::BackupExisting), ConflictAction::Backup);
    }

    #[test]
    fn test_unique_sibling_numbering() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let target = temp_dir.path().join("note.txt");

        assert_eq!(unique_sibling(&target, ".bak"), temp_dir.path().join("note.txt.bak"));

        fs::write(temp_dir.path().join("note.txt.bak"), b"1")?;
        assert_eq!(unique_sibling(&target, ".bak"), temp_dir.path().join("note.txt.bak1"));

        fs::write(temp_dir.path().join("note.txt.bak1"), b"2")?;
        assert_eq!(unique_sibling(&target, ".bak"), temp_dir.path().join("note.txt.bak2"));
        Ok(())
    }

    #[test]
    fn test_sibling_suffix() {
        assert_eq!(ConflictAction::Rename.sibling_suffix(), Some("-backup"));
        assert_eq!(ConflictAction::Backup.sibling_suffix(), Some(".bak"));
        assert_eq!(ConflictAction::Overwrite.sibling_suffix(), None);
    }
}

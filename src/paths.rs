//! Path helpers shared by the writer and the restorer

use std::path::{Component, Path, PathBuf};

/// Render a path for manifests and logs, without the Windows verbatim prefix
/// that `fs::canonicalize` adds.
pub fn display_path(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    match rendered.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC\\") => rest.to_string(),
        Some(rest) => format!(r"\\{}", &rest[4..]),
        None => rendered.into_owned(),
    }
}

/// Drop the drive, UNC prefix and root from a path, keeping the ordinary
/// components. `..` components are discarded.
pub fn strip_root(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// Re-root an absolute capture path under `root`
pub fn rebase(original: &Path, root: &Path) -> PathBuf {
    root.join(strip_root(original))
}

/// Forward-slash archive path for a relative filesystem path
pub fn to_archive_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Prefix absolute paths with `\\?\` so Win32 accepts paths past MAX_PATH.
/// No-op elsewhere or when disabled.
///
/// Verbatim paths skip separator normalization, so the path is rebuilt from
/// its components first.
pub fn extended_length(path: &Path, enabled: bool) -> PathBuf {
    #[cfg(windows)]
    {
        let rendered = path.to_string_lossy();
        if enabled && path.is_absolute() && !rendered.starts_with(r"\\") && !rendered.starts_with("//") {
            let normalized: PathBuf = path.components().collect();
            return PathBuf::from(format!(r"\\?\{}", normalized.display()));
        }
    }
    let _ = enabled;
    path.to_path_buf()
}

/// Make `target` unique among `used` (compared case-insensitively) by adding
/// ` (2)`, ` (3)`, … to the file stem.
pub fn unique_archive_path(target: &str, used: &mut std::collections::HashSet<String>) -> String {
    if used.insert(target.to_lowercase()) {
        return target.to_string();
    }

    let (dir, name) = match target.rfind('/') {
        Some(pos) => (&target[..=pos], &target[pos + 1..]),
        None => ("", target),
    };
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{}{} ({}){}", dir, stem, n, ext);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

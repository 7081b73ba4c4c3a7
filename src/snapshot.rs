//! Source read capability used by the archive writer.
//!
//! The writer never opens source files itself; it asks a [`SnapshotReader`].
//! A consistent point-in-time provider (for example one backed by volume
//! shadow copies) can be plugged in without touching the writer.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Opens source files for reading
pub trait SnapshotReader: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Whether reads observe a consistent point-in-time view
    fn is_consistent(&self) -> bool {
        false
    }
}

/// Reads live files with a shared handle that tolerates concurrent writers
/// and deleters on Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectReader;

impl DirectReader {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
fn open_shared(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x1;
    const FILE_SHARE_WRITE: u32 = 0x2;
    const FILE_SHARE_DELETE: u32 = 0x4;

    OpenOptions::new()
        .read(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE)
        .open(path)
}

#[cfg(not(windows))]
fn open_shared(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

impl SnapshotReader for DirectReader {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = open_shared(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

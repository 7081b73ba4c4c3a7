//! Archive writer implementation

use super::{BackupRequest, BackupResult, DEFAULT_GENERATOR};
use crate::chunk::{clamp_chunk_size, ChunkHasher, COPY_BUFFER_SIZE};
use crate::manifest::{Entry, EntryKind, Manifest, MANIFEST_NAME, PAYLOAD_PREFIX};
use crate::paths::{display_path, to_archive_path, unique_archive_path};
use crate::progress::{ProgressSink, RunControl};
use crate::registry::{self, RegistryStore};
use crate::snapshot::{DirectReader, SnapshotReader};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, span, warn, Level};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A file selected for capture
#[derive(Debug, Clone)]
struct FilePlan {
    full_path: PathBuf,
    target_path: String,
}

/// Builds rrarchive containers
#[derive(Clone)]
pub struct ArchiveWriter {
    reader: Arc<dyn SnapshotReader>,
    registry: Arc<dyn RegistryStore>,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("consistent_reads", &self.reader.is_consistent())
            .finish()
    }
}

impl ArchiveWriter {
    /// Writer reading live files and the host registry
    pub fn new() -> Self {
        Self {
            reader: Arc::new(DirectReader::new()),
            registry: registry::default_store(),
        }
    }

    /// Substitute the source read capability
    pub fn with_reader(mut self, reader: Arc<dyn SnapshotReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Substitute the registry the writer captures from
    pub fn with_registry(mut self, registry: Arc<dyn RegistryStore>) -> Self {
        self.registry = registry;
        self
    }

    /// Create an archive on a blocking worker thread
    pub async fn create(
        &self,
        request: BackupRequest,
        progress: Option<ProgressSink>,
        cancel: Option<CancellationToken>,
    ) -> Result<BackupResult> {
        let writer = self.clone();
        tokio::task::spawn_blocking(move || {
            writer.create_blocking(&request, progress.as_ref(), cancel.as_ref())
        })
        .await?
    }

    /// Create an archive on the current thread.
    ///
    /// On cancellation the partially written archive is left on disk and must
    /// be discarded by the caller.
    pub fn create_blocking(
        &self,
        request: &BackupRequest,
        progress: Option<&ProgressSink>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BackupResult> {
        if request.destination.as_os_str().is_empty() {
            return Err(Error::InvalidRequest {
                reason: "destination archive path is empty".to_string(),
            });
        }

        let span = span!(Level::INFO, "create_archive", archive = %request.destination.display());
        let _enter = span.enter();

        let control = RunControl::new(progress, cancel);
        let chunk_size = clamp_chunk_size(request.chunk_size);
        let generator = request
            .generator
            .clone()
            .unwrap_or_else(|| DEFAULT_GENERATOR.to_string());

        if let Some(parent) = request.destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let destination = canonical_destination(&request.destination)?;

        let sources = canonical_sources(&request.sources);
        info!(
            "Starting archive: {} sources, {} registry keys, chunk size {}",
            sources.len(),
            request.registry_keys.len(),
            chunk_size
        );

        let plan = plan_files(&sources, &destination, &control)?;

        let mut manifest = Manifest::new(generator, request.policies.clone(), chunk_size);
        manifest.profiles = request.profiles.clone();
        manifest.apps = request.apps.clone();
        manifest.registry = self.capture_registry(&request.registry_keys, &control)?;

        if request.policies.vss_required && !self.reader.is_consistent() {
            warn!("Consistent snapshot requested but no snapshot provider is configured; reading live files");
        }

        let file = File::create(&request.destination)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut skipped = Vec::new();
        let total = plan.len();

        for (index, file_plan) in plan.iter().enumerate() {
            control.checkpoint()?;

            match self.write_entry(&mut zip, file_plan, chunk_size)? {
                Ok(entry) => {
                    debug!("Archived {} ({} bytes)", entry.source_path, entry.size_bytes);
                    manifest.entries.push(entry);
                }
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", file_plan.full_path.display(), e);
                    skipped.push((file_plan.full_path.clone(), e.to_string()));
                }
            }

            control.report(index + 1, total, &display_path(&file_plan.full_path));
        }

        zip.start_file(MANIFEST_NAME, payload_options(0))?;
        zip.write_all(manifest.to_json()?.as_bytes())?;
        let mut file = zip.finish()?.into_inner().map_err(|e| e.into_error())?;
        // Aborted payloads can leave stale bytes past the central directory.
        let end = file.stream_position()?;
        file.set_len(end)?;

        let total_bytes = manifest.total_bytes();
        info!(
            "Archive completed: {} entries, {} bytes, {} registry trees",
            manifest.entries.len(),
            total_bytes,
            manifest.registry.len()
        );

        Ok(BackupResult {
            archive_path: request.destination.clone(),
            entry_count: manifest.entries.len(),
            total_bytes,
            manifest,
            skipped,
        })
    }

    /// Snapshot every requested HKCU key. Other hives are ignored.
    fn capture_registry(
        &self,
        key_paths: &[String],
        control: &RunControl<'_>,
    ) -> Result<Vec<crate::manifest::RegistrySnapshot>> {
        let mut snapshots = Vec::new();

        for key_path in key_paths {
            control.checkpoint()?;

            let Some(subkey) = registry::parse_key_path(key_path) else {
                warn!("Ignoring registry key outside HKCU: {}", key_path);
                continue;
            };

            match registry::capture(self.registry.as_ref(), &subkey, control.token()) {
                Ok(snapshot) => {
                    info!("Captured {} ({} keys)", key_path, snapshot.key_count());
                    snapshots.push(snapshot);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => warn!("Skipping registry key {}: {}", key_path, e),
            }
        }

        Ok(snapshots)
    }

    /// Copy one file into the container while hashing it.
    ///
    /// The inner error is a read failure of the source file. A payload entry
    /// already started for it is aborted, so the container never holds a
    /// partial copy. Container errors are fatal.
    fn write_entry<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        file_plan: &FilePlan,
        chunk_size: usize,
    ) -> Result<io::Result<Entry>> {
        let opened = fs::metadata(&file_plan.full_path)
            .and_then(|metadata| Ok((metadata, self.reader.open(&file_plan.full_path)?)));

        let (metadata, mut reader) = match opened {
            Ok(opened) => opened,
            Err(e) => return Ok(Err(e)),
        };

        let payload_name = format!("{}{}", PAYLOAD_PREFIX, file_plan.target_path);
        zip.start_file(payload_name, payload_options(metadata.len()))?;

        let mut hasher = ChunkHasher::new(chunk_size);
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    zip.abort_file()?;
                    return Ok(Err(e));
                }
            };
            zip.write_all(&buffer[..bytes_read])?;
            hasher.update(&buffer[..bytes_read]);
        }

        let size_bytes = hasher.total_bytes();
        Ok(Ok(Entry {
            id: Uuid::new_v4().to_string(),
            kind: EntryKind::File,
            source_path: display_path(&file_plan.full_path),
            target_path: file_plan.target_path.clone(),
            size_bytes,
            last_write_time_utc: last_write_time(&metadata),
            hash: hasher.finish(),
            attributes: attributes_string(&metadata),
            acl: None,
            app_id: None,
            vss_snapshot_id: None,
        }))
    }
}

fn payload_options(size_hint: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size_hint >= u32::MAX as u64)
}

/// Canonicalize and deduplicate (case-insensitively) the requested sources.
/// Paths that cannot be resolved are dropped.
fn canonical_sources(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut canonical = Vec::new();

    for source in sources {
        if source.as_os_str().is_empty() {
            continue;
        }

        match fs::canonicalize(source) {
            Ok(path) => {
                if seen.insert(display_path(&path).to_lowercase()) {
                    canonical.push(path);
                }
            }
            Err(e) => debug!("Dropping unresolvable source {}: {}", source.display(), e),
        }
    }

    canonical
}

/// Absolute form of the archive path, resolved through its (existing) parent
fn canonical_destination(destination: &Path) -> Result<PathBuf> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent)?,
        _ => std::env::current_dir()?,
    };

    let name = destination.file_name().ok_or_else(|| Error::InvalidRequest {
        reason: format!("destination {} has no file name", destination.display()),
    })?;
    Ok(parent.join(name))
}

/// Expand sources into the ordered list of files to capture.
///
/// Directory members are relative to the directory itself; a single file is
/// stored under its bare name. The archive being written is never planned.
fn plan_files(
    sources: &[PathBuf],
    destination: &Path,
    control: &RunControl<'_>,
) -> Result<Vec<FilePlan>> {
    let mut plan = Vec::new();
    let mut used = HashSet::new();

    for source in sources {
        if source == destination {
            debug!("Not archiving the destination itself: {}", source.display());
            continue;
        }

        if source.is_file() {
            control.checkpoint()?;
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            plan.push(FilePlan {
                full_path: source.clone(),
                target_path: unique_archive_path(&name, &mut used),
            });
            continue;
        }

        for entry in WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry due to error: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || entry.path() == destination {
                continue;
            }
            control.checkpoint()?;

            let relative = match entry.path().strip_prefix(source) {
                Ok(relative) => relative,
                Err(_) => continue,
            };

            plan.push(FilePlan {
                full_path: entry.path().to_path_buf(),
                target_path: unique_archive_path(&to_archive_path(relative), &mut used),
            });
        }
    }

    Ok(plan)
}

fn last_write_time(metadata: &Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(windows)]
fn attributes_string(metadata: &Metadata) -> String {
    use std::os::windows::fs::MetadataExt;

    const FLAGS: [(u32, &str); 11] = [
        (0x1, "ReadOnly"),
        (0x2, "Hidden"),
        (0x4, "System"),
        (0x20, "Archive"),
        (0x100, "Temporary"),
        (0x200, "SparseFile"),
        (0x400, "ReparsePoint"),
        (0x800, "Compressed"),
        (0x1000, "Offline"),
        (0x2000, "NotContentIndexed"),
        (0x4000, "Encrypted"),
    ];

    let attributes = metadata.file_attributes();
    let names: Vec<&str> = FLAGS
        .iter()
        .filter(|(flag, _)| attributes & flag != 0)
        .map(|(_, name)| *name)
        .collect();

    if names.is_empty() {
        "Normal".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(not(windows))]
fn attributes_string(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "ReadOnly".to_string()
    } else {
        "Normal".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MIN_CHUNK_SIZE;
    use crate::manifest::MANIFEST_NAME;
    use crate::registry::{MemoryRegistry, RegistryData};
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn writer() -> ArchiveWriter {
        ArchiveWriter::new().with_registry(Arc::new(MemoryRegistry::new()))
    }

    fn archive_names(path: &Path) -> anyhow::Result<Vec<String>> {
        let archive = ZipArchive::new(File::open(path)?)?;
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }

    #[test]
    fn test_directory_targets_are_relative_to_source_root() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("root");
        fs::create_dir_all(root.join("a"))?;
        fs::write(root.join("a").join("b.txt"), b"bee")?;
        fs::write(root.join("top.txt"), b"top")?;

        let archive = temp_dir.path().join("out").join("backup.rrarchive");
        let result = writer().create_blocking(&BackupRequest::new([&root], &archive), None, None)?;

        let targets: Vec<&str> = result
            .manifest
            .entries
            .iter()
            .map(|e| e.target_path.as_str())
            .collect();
        assert_eq!(targets, vec!["a/b.txt", "top.txt"]);
        assert_eq!(result.entry_count, 2);
        assert_eq!(result.total_bytes, 6);

        assert_eq!(
            archive_names(&archive)?,
            vec!["manifest.json", "payload/a/b.txt", "payload/top.txt"]
        );
        Ok(())
    }

    #[test]
    fn test_single_file_manifest() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir)?;
        let note = data_dir.join("note.txt");
        fs::write(&note, b"hello")?;

        let archive = temp_dir.path().join("archive.rrarchive");
        let request = BackupRequest::new([&note], &archive).with_generator("TestHarness");
        let result = writer().create_blocking(&request, None, None)?;

        let manifest = &result.manifest;
        assert_eq!(manifest.entries.len(), 1);
        assert_eq!(manifest.hash.algorithm, "SHA256");
        assert_eq!(manifest.generator, "TestHarness");
        assert_eq!(manifest.entries[0].target_path, "note.txt");
        assert_eq!(
            manifest.entries[0].hash.full_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let mut zip = ZipArchive::new(File::open(&archive)?)?;
        let mut stored = String::new();
        zip.by_name(MANIFEST_NAME)?.read_to_string(&mut stored)?;
        assert_eq!(Manifest::from_json(&stored)?, *manifest);
        Ok(())
    }

    #[test]
    fn test_sources_are_deduplicated_and_unresolvable_dropped() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"a")?;

        let archive = temp_dir.path().join("out.rrarchive");
        let request = BackupRequest::new(
            [
                file.clone(),
                temp_dir.path().join(".").join("a.txt"),
                temp_dir.path().join("missing.txt"),
            ],
            &archive,
        );
        let result = writer().create_blocking(&request, None, None)?;

        assert_eq!(result.entry_count, 1);
        Ok(())
    }

    #[test]
    fn test_colliding_targets_get_suffix() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        for dir in ["one", "two"] {
            fs::create_dir_all(temp_dir.path().join(dir))?;
            fs::write(temp_dir.path().join(dir).join("readme.txt"), dir)?;
        }

        let archive = temp_dir.path().join("out.rrarchive");
        let request = BackupRequest::new(
            [temp_dir.path().join("one"), temp_dir.path().join("two")],
            &archive,
        );
        let result = writer().create_blocking(&request, None, None)?;

        let targets: Vec<&str> = result
            .manifest
            .entries
            .iter()
            .map(|e| e.target_path.as_str())
            .collect();
        assert_eq!(targets, vec!["readme.txt", "readme (2).txt"]);
        Ok(())
    }

    #[test]
    fn test_empty_destination_is_rejected() {
        let result = writer().create_blocking(&BackupRequest::new(Vec::<PathBuf>::new(), ""), None, None);
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    }

    #[test]
    fn test_chunk_size_is_clamped_and_chunks_recorded() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let big = temp_dir.path().join("big.bin");
        fs::write(&big, vec![3u8; MIN_CHUNK_SIZE * 2 + 10])?;

        let archive = temp_dir.path().join("out.rrarchive");
        let request = BackupRequest::new([&big], &archive).with_chunk_size(16);
        let result = writer().create_blocking(&request, None, None)?;

        assert_eq!(result.manifest.hash.chunk_size_bytes, MIN_CHUNK_SIZE as u64);
        assert_eq!(result.manifest.entries[0].hash.chunk_hashes.len(), 3);
        Ok(())
    }

    #[test]
    fn test_registry_capture_only_hkcu() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let store = Arc::new(MemoryRegistry::new());
        store.create_key("Software\\Nova")?;
        store.set_value("Software\\Nova", "Theme", &RegistryData::String("dark".into()))?;

        let archive = temp_dir.path().join("reg.rrarchive");
        let request = BackupRequest::new(Vec::<PathBuf>::new(), &archive)
            .with_registry_key("HKCU\\Software\\Nova")
            .with_registry_key("HKLM\\Software\\Nova")
            .with_registry_key("HKCU\\Software\\Missing");
        let result = ArchiveWriter::new()
            .with_registry(store)
            .create_blocking(&request, None, None)?;

        assert_eq!(result.entry_count, 0);
        assert_eq!(result.manifest.registry.len(), 1);
        let snapshot = &result.manifest.registry[0];
        assert_eq!(snapshot.root, "HKCU");
        assert_eq!(snapshot.path, "Software\\Nova");
        assert_eq!(snapshot.values[0].data, "dark");
        Ok(())
    }

    #[test]
    fn test_progress_is_reported_per_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("src");
        fs::create_dir_all(&source)?;
        for name in ["a", "b", "c"] {
            fs::write(source.join(name), name)?;
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = crate::progress::sink(move |p| {
            seen_clone.lock().unwrap().push((p.processed, p.total));
        });

        let archive = temp_dir.path().join("out.rrarchive");
        writer().create_blocking(&BackupRequest::new([&source], &archive), Some(&sink), None)?;

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
        Ok(())
    }

    #[test]
    fn test_cancellation_is_reported_distinctly() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("src");
        fs::create_dir_all(&source)?;
        fs::write(source.join("a.txt"), b"a")?;

        let token = CancellationToken::new();
        token.cancel();

        let archive = temp_dir.path().join("out.rrarchive");
        let result = writer().create_blocking(&BackupRequest::new([&source], &archive), None, Some(&token));

        assert!(matches!(result, Err(ref e) if e.is_cancelled()));
        Ok(())
    }

    struct FailingReader {
        blocked: PathBuf,
    }

    impl SnapshotReader for FailingReader {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            if path == self.blocked {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            DirectReader.open(path)
        }
    }

    #[test]
    fn test_unreadable_file_is_skipped() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = fs::canonicalize(temp_dir.path())?.join("src");
        fs::create_dir_all(&source)?;
        fs::write(source.join("ok.txt"), b"ok")?;
        fs::write(source.join("locked.txt"), b"no")?;

        let archive = temp_dir.path().join("out.rrarchive");
        let result = writer()
            .with_reader(Arc::new(FailingReader {
                blocked: source.join("locked.txt"),
            }))
            .create_blocking(&BackupRequest::new([&source], &archive), None, None)?;

        assert_eq!(result.entry_count, 1);
        assert_eq!(result.manifest.entries[0].target_path, "ok.txt");
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(archive_names(&archive)?, vec!["manifest.json", "payload/ok.txt"]);
        Ok(())
    }

    /// Yields a few bytes, then fails like a byte-range lock violation
    struct BrokenStream {
        sent: bool,
    }

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::Other, "lock violation"));
            }
            self.sent = true;
            let n = buf.len().min(3);
            buf[..n].copy_from_slice(&b"bad"[..n]);
            Ok(n)
        }
    }

    struct MidReadFailure {
        broken: PathBuf,
    }

    impl SnapshotReader for MidReadFailure {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            if path == self.broken {
                return Ok(Box::new(BrokenStream { sent: false }));
            }
            DirectReader.open(path)
        }
    }

    #[test]
    fn test_read_failure_mid_file_skips_only_that_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = fs::canonicalize(temp_dir.path())?.join("src");
        fs::create_dir_all(&source)?;
        fs::write(source.join("a.txt"), b"first")?;
        fs::write(source.join("bad.txt"), b"bad bytes on disk")?;
        fs::write(source.join("c.txt"), b"third")?;

        let archive = temp_dir.path().join("out.rrarchive");
        let result = writer()
            .with_reader(Arc::new(MidReadFailure {
                broken: source.join("bad.txt"),
            }))
            .create_blocking(&BackupRequest::new([&source], &archive), None, None)?;

        let targets: Vec<&str> = result
            .manifest
            .entries
            .iter()
            .map(|e| e.target_path.as_str())
            .collect();
        assert_eq!(targets, vec!["a.txt", "c.txt"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].0, source.join("bad.txt"));
        assert!(result.skipped[0].1.contains("lock violation"));

        assert_eq!(
            archive_names(&archive)?,
            vec!["manifest.json", "payload/a.txt", "payload/c.txt"]
        );

        let mut zip = ZipArchive::new(File::open(&archive)?)?;
        let mut third = String::new();
        zip.by_name("payload/c.txt")?.read_to_string(&mut third)?;
        assert_eq!(third, "third");
        Ok(())
    }

    #[test]
    fn test_destination_inside_source_is_not_archived() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("src");
        fs::create_dir_all(&source)?;
        fs::write(source.join("a.bin"), vec![1u8; 4096])?;

        let archive = source.join("self.rrarchive");
        let request = BackupRequest::new([&source], &archive);
        writer().create_blocking(&request, None, None)?;
        let second = writer().create_blocking(&request, None, None)?;

        let targets: Vec<&str> = second
            .manifest
            .entries
            .iter()
            .map(|e| e.target_path.as_str())
            .collect();
        assert_eq!(targets, vec!["a.bin"]);
        assert!(second.skipped.is_empty());

        let only_itself = writer().create_blocking(&BackupRequest::new([&archive], &archive), None, None)?;
        assert_eq!(only_itself.entry_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_async_create()-> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"async")?;

        let archive = temp_dir.path().join("out.rrarchive");
        let result = writer()
            .create(BackupRequest::new([&file], &archive), None, None)
            .await?;

        assert_eq!(result.entry_count, 1);
        assert!(archive.exists());
        Ok(())
    }
}

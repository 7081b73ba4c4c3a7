//! Streaming SHA-256 hashing with fixed-size chunk digests

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};

/// Name recorded in the manifest for the digest algorithm
pub const HASH_ALGORITHM: &str = "SHA256";

/// Default chunk size for hashing (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest chunk size accepted by the writer (64 KiB)
pub const MIN_CHUNK_SIZE: usize = 64 * 1024;

/// I/O buffer used when streaming file contents. Independent of the chunk size.
pub(crate) const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Clamp a requested chunk size to the minimum floor.
pub fn clamp_chunk_size(chunk_size: usize) -> usize {
    chunk_size.max(MIN_CHUNK_SIZE)
}

/// Digests recorded for one file: every chunk in order plus the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashValue {
    pub chunk_hashes: Vec<String>,
    pub full_hash: String,
}

impl HashValue {
    /// Describe how `actual` differs from `self`, or `None` when they match.
    pub fn mismatch(&self, actual: &HashValue) -> Option<String> {
        if self.chunk_hashes.len() != actual.chunk_hashes.len() {
            return Some(format!(
                "chunk count mismatch: expected {}, got {}",
                self.chunk_hashes.len(),
                actual.chunk_hashes.len()
            ));
        }

        if let Some(index) = self
            .chunk_hashes
            .iter()
            .zip(&actual.chunk_hashes)
            .position(|(expected, got)| !expected.eq_ignore_ascii_case(got))
        {
            return Some(format!(
                "chunk {} hash mismatch: expected {}, got {}",
                index, self.chunk_hashes[index], actual.chunk_hashes[index]
            ));
        }

        if !self.full_hash.eq_ignore_ascii_case(&actual.full_hash) {
            return Some(format!(
                "file hash mismatch: expected {}, got {}",
                self.full_hash, actual.full_hash
            ));
        }

        None
    }

    pub fn matches(&self, actual: &HashValue) -> bool {
        self.mismatch(actual).is_none()
    }
}

/// Incremental hasher that emits one digest per `chunk_size` bytes.
///
/// Chunk boundaries depend only on the byte offset, never on how the input was
/// split across [`update`](Self::update) calls.
#[derive(Debug, Clone)]
pub struct ChunkHasher {
    chunk_size: usize,
    full: Sha256,
    chunk: Sha256,
    chunk_fill: usize,
    chunk_hashes: Vec<String>,
    total_bytes: u64,
}

impl ChunkHasher {
    /// Create a hasher. A zero chunk size is treated as one byte.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            full: Sha256::new(),
            chunk: Sha256::new(),
            chunk_fill: 0,
            chunk_hashes: Vec::new(),
            total_bytes: 0,
        }
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.full.update(data);
        self.total_bytes += data.len() as u64;

        while !data.is_empty() {
            let room = self.chunk_size - self.chunk_fill;
            let take = room.min(data.len());
            self.chunk.update(&data[..take]);
            self.chunk_fill += take;
            data = &data[take..];

            if self.chunk_fill == self.chunk_size {
                self.flush_chunk();
            }
        }
    }

    /// Bytes fed so far
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Finish hashing. A trailing partial chunk becomes the last chunk digest.
    pub fn finish(mut self) -> HashValue {
        if self.chunk_fill > 0 {
            self.flush_chunk();
        }

        HashValue {
            chunk_hashes: self.chunk_hashes,
            full_hash: hex::encode(self.full.finalize()),
        }
    }

    fn flush_chunk(&mut self) {
        let digest = std::mem::take(&mut self.chunk).finalize();
        self.chunk_hashes.push(hex::encode(digest));
        self.chunk_fill = 0;
    }
}

/// Writer adapter that hashes everything passing through it.
pub struct HashingWriter<W> {
    inner: W,
    hasher: ChunkHasher,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W, chunk_size: usize) -> Self {
        Self {
            inner,
            hasher: ChunkHasher::new(chunk_size),
        }
    }

    /// Return the wrapped writer together with the computed digests.
    pub fn finish(self) -> (W, HashValue) {
        (self.inner, self.hasher.finish())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hash an entire stream in `chunk_size` units.
pub fn hash_reader<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<(HashValue, u64)> {
    let mut hasher = ChunkHasher::new(chunk_size);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    let total = hasher.total_bytes();
    Ok((hasher.finish(), total))
}

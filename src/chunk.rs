//! Chunked byte access over a file's content
//!
//! A `ChunkSource` hands out the bytes of one file in bounded-size, ordered
//! chunks so that peak memory never scales with file size. Prefix reads for
//! signature/metadata inspection are separate bounded reads and do not
//! disturb chunk iteration.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::AnalysisResult;

/// Default chunk size: 2MB, bounds peak memory independent of file size
pub const CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// One bounded slice of a file's bytes
///
/// Offsets start at 0 and are strictly increasing with no gaps or overlap.
#[derive(Debug, Clone)]
pub struct ByteChunk {
    /// Byte offset of the first byte of `data` within the file
    pub offset: u64,
    /// The chunk payload, at most the source's chunk size
    pub data: Vec<u8>,
}

impl ByteChunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sequential access to a file's bytes in bounded-size chunks
pub trait ChunkSource {
    /// Next chunk in order, or `None` at end of stream
    ///
    /// I/O failures surface as `AnalysisError::Read` and are not retried
    /// here; retry policy belongs to the caller.
    fn next_chunk(&mut self) -> AnalysisResult<Option<ByteChunk>>;

    /// Read up to `n` leading bytes without consuming the chunk stream
    ///
    /// Returns fewer than `n` bytes when the file is shorter.
    fn read_prefix(&mut self, n: usize) -> AnalysisResult<Vec<u8>>;

    /// Total size in bytes, when the source knows it up front
    fn total_size(&self) -> Option<u64> {
        None
    }
}

// =============================================================================
// File-backed source
// =============================================================================

/// `ChunkSource` over a file on disk
pub struct FileChunkSource {
    path: PathBuf,
    file: File,
    offset: u64,
    chunk_size: usize,
    total_size: u64,
}

impl FileChunkSource {
    /// Open a file with the default 2MB chunk size
    pub fn open(path: &Path) -> AnalysisResult<Self> {
        Self::with_chunk_size(path, CHUNK_SIZE)
    }

    /// Open a file with a custom chunk size
    ///
    /// Small sizes are only useful in tests (chunk-invariance checks);
    /// chunk size never changes the resulting digests.
    pub fn with_chunk_size(path: &Path, chunk_size: usize) -> AnalysisResult<Self> {
        let file = File::open(path)?;
        let total_size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: 0,
            chunk_size: chunk_size.max(1),
            total_size,
        })
    }
}

impl ChunkSource for FileChunkSource {
    fn next_chunk(&mut self) -> AnalysisResult<Option<ByteChunk>> {
        let mut data = vec![0u8; self.chunk_size];
        let mut filled = 0;
        // read_exact semantics up to EOF: a chunk is full-size except the last
        while filled < data.len() {
            let n = self.file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        data.truncate(filled);
        let chunk = ByteChunk {
            offset: self.offset,
            data,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    fn read_prefix(&mut self, n: usize) -> AnalysisResult<Vec<u8>> {
        // Independent handle so the chunk cursor is untouched
        let mut file = File::open(&self.path)?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < buf.len() {
            let read = file.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.total_size)
    }
}

// =============================================================================
// In-memory source
// =============================================================================

/// `ChunkSource` over a byte buffer already in memory
///
/// Used by tests and by callers that receive the upload as one buffer.
pub struct MemoryChunkSource {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl MemoryChunkSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_chunk_size(data, CHUNK_SIZE)
    }

    pub fn with_chunk_size(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ChunkSource for MemoryChunkSource {
    fn next_chunk(&mut self) -> AnalysisResult<Option<ByteChunk>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = ByteChunk {
            offset: self.pos as u64,
            data: self.data[self.pos..end].to_vec(),
        };
        self.pos = end;
        Ok(Some(chunk))
    }

    fn read_prefix(&mut self, n: usize) -> AnalysisResult<Vec<u8>> {
        let end = n.min(self.data.len());
        Ok(self.data[..end].to_vec())
    }

    fn total_size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_chunk_ordering() {
        let mut source = MemoryChunkSource::with_chunk_size((0u8..100).collect(), 7);
        let mut expected_offset = 0u64;
        let mut collected = Vec::new();
        while let Some(chunk) = source.next_chunk().unwrap() {
            assert_eq!(chunk.offset, expected_offset);
            assert!(chunk.len() <= 7);
            expected_offset += chunk.len() as u64;
            collected.extend_from_slice(&chunk.data);
        }
        assert_eq!(collected, (0u8..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_memory_prefix_does_not_consume() {
        let mut source = MemoryChunkSource::with_chunk_size(b"abcdef".to_vec(), 2);
        assert_eq!(source.read_prefix(3).unwrap(), b"abc");
        let first = source.next_chunk().unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.data, b"ab");
    }

    #[test]
    fn test_memory_prefix_short_file() {
        let mut source = MemoryChunkSource::new(b"ab".to_vec());
        assert_eq!(source.read_prefix(16).unwrap(), b"ab");
    }

    #[test]
    fn test_empty_source() {
        let mut source = MemoryChunkSource::new(Vec::new());
        assert!(source.next_chunk().unwrap().is_none());
        assert!(source.read_prefix(8).unwrap().is_empty());
    }

    #[test]
    fn test_file_chunk_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        tmp.write_all(&payload).unwrap();
        tmp.flush().unwrap();

        let mut source = FileChunkSource::with_chunk_size(tmp.path(), 128).unwrap();
        assert_eq!(source.total_size(), Some(1000));
        assert_eq!(source.read_prefix(4).unwrap(), &payload[..4]);

        let mut collected = Vec::new();
        let mut expected_offset = 0u64;
        while let Some(chunk) = source.next_chunk().unwrap() {
            assert_eq!(chunk.offset, expected_offset);
            expected_offset += chunk.len() as u64;
            collected.extend_from_slice(&chunk.data);
        }
        assert_eq!(collected, payload);
    }
}

//! Fixed-size chunk reader used by large uploads.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::LARGE_UPLOAD_CHUNK_SIZE;

/// A slice of a file at a given byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub offset: u64,
    pub data: Vec<u8>,
}

impl Chunk {
    /// Inclusive offset of the last byte in this chunk.
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64 - 1
    }

    /// `Content-Range` header value for this chunk.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.offset, self.end(), total)
    }
}

/// Reads a file sequentially in fixed-size chunks.
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`LARGE_UPLOAD_CHUNK_SIZE`] is used.
    pub async fn open(path: &Path, chunk_size: usize) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let file_size = file.metadata().await?.len();
        let chunk_size = if chunk_size == 0 {
            LARGE_UPLOAD_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Chunk>> {
        let remaining = self.file_size.saturating_sub(self.offset);
        if remaining == 0 {
            return Ok(None);
        }

        let read_size = remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; read_size];
        let mut filled = 0;
        while filled < read_size {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let chunk = Chunk {
            offset: self.offset,
            data: buf,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

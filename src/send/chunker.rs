use crate::tools::error::{Error, Result};
use std::io::Read;

/// Bytes to encode: an in-memory buffer or an owned reader.
pub enum ChunkSource {
    /// Whole content in memory
    Buffer(Vec<u8>),
    /// Owned reader; the total length is tracked by the chunker
    Stream(Box<dyn Read + Send>),
}

impl std::fmt::Debug for ChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChunkSource::Buffer(buffer) => write!(f, "ChunkSource::Buffer({} bytes)", buffer.len()),
            ChunkSource::Stream(_) => write!(f, "ChunkSource::Stream"),
        }
    }
}

/// Ordered, finite, non-restartable sequence of file chunks.
///
/// Every chunk is exactly `chunk_bytes` long except the last, which holds
/// the remaining `1..=chunk_bytes` bytes. Chunks are addressed by a 32-bit
/// index starting at 0.
#[derive(Debug)]
pub struct Chunker {
    source: ChunkSource,
    chunk_bytes: usize,
    total: u64,
    offset: u64,
    next_index: u32,
}

impl Chunker {
    /// Chunk an in-memory buffer.
    pub fn from_buffer(buffer: Vec<u8>, chunk_bytes: usize) -> Result<Chunker> {
        let total = buffer.len() as u64;
        Self::new(ChunkSource::Buffer(buffer), total, chunk_bytes)
    }

    /// Chunk a file from disk.
    pub fn from_file(path: &std::path::Path, chunk_bytes: usize) -> Result<Chunker> {
        let file = std::fs::File::open(path)?;
        let total = file.metadata()?.len();
        Self::new(ChunkSource::Stream(Box::new(file)), total, chunk_bytes)
    }

    fn new(source: ChunkSource, total: u64, chunk_bytes: usize) -> Result<Chunker> {
        if chunk_bytes == 0 {
            return Err(Error::config("chunk size is 0"));
        }

        if total == 0 {
            return Err(Error::config("refusing to chunk an empty input"));
        }

        let chunk_count = num_integer::div_ceil(total, chunk_bytes as u64);
        if chunk_count > u32::MAX as u64 {
            return Err(Error::config(format!(
                "{} chunks do not fit a 32-bit chunk index",
                chunk_count
            )));
        }

        Ok(Chunker {
            source,
            chunk_bytes,
            total,
            offset: 0,
            next_index: 0,
        })
    }

    /// Total number of chunks this chunker will produce.
    pub fn chunk_count(&self) -> u32 {
        num_integer::div_ceil(self.total, self.chunk_bytes as u64) as u32
    }

    /// Read the next chunk; `None` after the last one.
    pub fn next_chunk(&mut self) -> Result<Option<(u32, Vec<u8>)>> {
        if self.offset >= self.total {
            return Ok(None);
        }

        let want = std::cmp::min(self.chunk_bytes as u64, self.total - self.offset) as usize;
        let data = match &mut self.source {
            ChunkSource::Buffer(buffer) => {
                let start = self.offset as usize;
                buffer[start..start + want].to_vec()
            }
            ChunkSource::Stream(reader) => {
                let mut buffer = vec![0u8; want];
                reader.read_exact(&mut buffer)?;
                buffer
            }
        };

        let index = self.next_index;
        self.next_index += 1;
        self.offset += want as u64;
        log::debug!("chunk {} read, {} bytes", index, want);
        Ok(Some((index, data)))
    }
}

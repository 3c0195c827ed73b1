use super::block::ChunkEncoder;
use super::chunker::Chunker;
use super::manifest::ChunkManifestEntry;
use crate::common::pkt::Packet;
use crate::common::{Config, FileId};
use crate::crypto::{self, EncryptionKey};
use crate::tools::error::{Error, Result};
use rayon::prelude::*;
use std::collections::VecDeque;

/// Converts a file into a stream of fountain-coded packets.
///
/// Packets come out in strictly increasing `block_id` order within a chunk
/// and strictly increasing `chunk_index` order across chunks, so the video
/// layer can consume them as an ordered stream.
#[derive(Debug)]
pub struct Sender {
    chunker: Chunker,
    encoder: ChunkEncoder,
    key: Option<EncryptionKey>,
    chunk_count: u32,
    manifest: Vec<ChunkManifestEntry>,
    pending: VecDeque<Packet>,
    nb_pkt_sent: usize,
}

impl Sender {
    /// Create a sender over an in-memory buffer.
    ///
    /// A password switches on per-chunk authenticated encryption.
    pub fn from_buffer(
        content: Vec<u8>,
        file_id: FileId,
        config: &Config,
        password: Option<&str>,
    ) -> Result<Sender> {
        config.validate()?;
        let key = derive_key(password, &file_id)?;
        let chunker = Chunker::from_buffer(content, config.plaintext_chunk_bytes(key.is_some()))?;
        Sender::new(chunker, file_id, config, key)
    }

    /// Create a sender reading a file from disk.
    pub fn from_file(
        path: &std::path::Path,
        file_id: FileId,
        config: &Config,
        password: Option<&str>,
    ) -> Result<Sender> {
        config.validate()?;
        let key = derive_key(password, &file_id)?;
        let chunker = Chunker::from_file(path, config.plaintext_chunk_bytes(key.is_some()))?;
        Sender::new(chunker, file_id, config, key)
    }

    fn new(
        chunker: Chunker,
        file_id: FileId,
        config: &Config,
        key: Option<EncryptionKey>,
    ) -> Result<Sender> {
        let encoder = ChunkEncoder::new(file_id, config)?;
        let chunk_count = chunker.chunk_count();
        Ok(Sender {
            chunker,
            encoder,
            key,
            chunk_count,
            manifest: Vec::new(),
            pending: VecDeque::new(),
            nb_pkt_sent: 0,
        })
    }

    /// Number of chunks this sender emits.
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Number of packets handed out so far.
    pub fn nb_pkt_sent(&self) -> usize {
        self.nb_pkt_sent
    }

    /// Manifest entries of the chunks encoded so far.
    pub fn manifest(&self) -> &[ChunkManifestEntry] {
        &self.manifest
    }

    /// Pull the next packet blob, encoding chunks on demand.
    ///
    /// `None` once every chunk has been emitted.
    pub fn read(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(pkt) = self.pending.pop_front() {
                self.nb_pkt_sent += 1;
                return Ok(Some(pkt.bytes));
            }

            match self.chunker.next_chunk()? {
                None => return Ok(None),
                Some((chunk_index, chunk_data)) => {
                    let is_last = chunk_index + 1 == self.chunk_count;
                    let (packets, entry) = self.encoder.encode_chunk(
                        chunk_index,
                        &chunk_data,
                        is_last,
                        self.key.as_ref(),
                    )?;
                    self.manifest.push(entry);
                    self.pending.extend(packets);
                }
            }
        }
    }

    /// Encode every remaining chunk and return the packet blobs in order.
    ///
    /// Chunks are independent, so their encoding fans out over a worker
    /// pool; results are reassembled in chunk-index order before returning.
    pub fn encode_all(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.chunker.next_chunk()? {
            chunks.push(chunk);
        }

        let encoder = &self.encoder;
        let key = self.key.as_ref();
        let chunk_count = self.chunk_count;
        let encoded: Vec<(Vec<Packet>, ChunkManifestEntry)> = chunks
            .into_par_iter()
            .map(|(chunk_index, chunk_data)| {
                encoder.encode_chunk(
                    chunk_index,
                    &chunk_data,
                    chunk_index + 1 == chunk_count,
                    key,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out: Vec<Vec<u8>> = Vec::new();
        for pkt in self.pending.drain(..) {
            out.push(pkt.bytes);
        }
        for (packets, entry) in encoded {
            self.manifest.push(entry);
            out.extend(packets.into_iter().map(|pkt| pkt.bytes));
        }
        self.nb_pkt_sent += out.len();
        Ok(out)
    }
}

fn derive_key(password: Option<&str>, file_id: &FileId) -> Result<Option<EncryptionKey>> {
    match password {
        Some(password) if password.is_empty() => Err(Error::config("empty password")),
        Some(password) => Ok(Some(crypto::derive_key(password.as_bytes(), file_id)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use crate::common::{header, Config, FileId};
    use crate::tools::error::Error;

    fn config() -> Config {
        Config {
            chunk_bytes: 2048,
            symbol_size: 64,
            repair_overhead: 0.2,
            include_source: true,
        }
    }

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 256) as u8).collect()
    }

    #[test]
    pub fn test_read_emits_packets_in_order() {
        crate::tests::init();

        let mut sender = super::Sender::from_buffer(
            content(5000),
            FileId::from_bytes([3u8; 16]),
            &config(),
            None,
        )
        .unwrap();
        assert_eq!(sender.chunk_count(), 3);

        let mut last: Option<(u32, u32)> = None;
        while let Some(pkt) = sender.read().unwrap() {
            let (h, _) = header::parse_packet(&pkt).unwrap();
            if let Some((chunk, block)) = last {
                assert!(
                    h.chunk_index > chunk || (h.chunk_index == chunk && h.block_id > block),
                    "packet order regressed"
                );
            }
            assert_eq!(h.is_last_chunk(), h.chunk_index == 2);
            last = Some((h.chunk_index, h.block_id));
        }

        assert_eq!(sender.manifest().len(), 3);
        assert_eq!(sender.manifest()[2].original_size, 5000 - 2 * 2048);
    }

    #[test]
    pub fn test_encode_all_matches_streaming_read() {
        crate::tests::init();

        let file_id = FileId::from_bytes([4u8; 16]);
        let mut streaming =
            super::Sender::from_buffer(content(6000), file_id, &config(), None).unwrap();
        let mut parallel =
            super::Sender::from_buffer(content(6000), file_id, &config(), None).unwrap();

        let mut streamed = Vec::new();
        while let Some(pkt) = streaming.read().unwrap() {
            streamed.push(pkt);
        }

        assert_eq!(parallel.encode_all().unwrap(), streamed);
    }

    #[test]
    pub fn test_invalid_config_surfaces_before_chunking() {
        crate::tests::init();

        // chunk_bytes too small to hold the AEAD overhead
        let config = Config {
            chunk_bytes: 10,
            ..Default::default()
        };
        assert!(matches!(
            super::Sender::from_buffer(
                content(100),
                FileId::from_bytes([6u8; 16]),
                &config,
                Some("hunter2"),
            ),
            Err(Error::Config(_))
        ));
    }

    #[test]
    pub fn test_empty_password_is_rejected() {
        crate::tests::init();

        assert!(super::Sender::from_buffer(
            content(100),
            FileId::from_bytes([5u8; 16]),
            &config(),
            Some(""),
        )
        .is_err());
    }
}

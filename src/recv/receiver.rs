use super::blockdecoder::{BlockDecoder, ChunkStatus, SymbolPush};
use crate::common::header::{self, PacketHeader};
use crate::common::{FileId, AEAD_OVERHEAD};
use crate::crypto::{self, EncryptionKey};
use crate::tools::error::{Error, Result};

/// One slot of the chunk table.
#[derive(Debug)]
struct ChunkState {
    decoder: BlockDecoder,
    /// Recovered payload: plaintext once finalized, ciphertext blob before
    data: Option<Vec<u8>>,
    plaintext: bool,
}

impl ChunkState {
    fn new() -> ChunkState {
        ChunkState {
            decoder: BlockDecoder::new(),
            data: None,
            plaintext: false,
        }
    }

    /// Authenticate and decrypt the recovered erasure payload, storing the
    /// plaintext. Marks the chunk `Failed` on tag mismatch.
    fn finalize(&mut self, raw: Vec<u8>, key: &EncryptionKey, file_id: &FileId, chunk_index: u32) {
        debug_assert_eq!(self.decoder.status, ChunkStatus::Recovered);

        let original_size = self.decoder.original_size() as usize;
        let blob_len = original_size + AEAD_OVERHEAD;
        if blob_len > raw.len() {
            log::warn!("chunk {} shorter than its declared ciphertext", chunk_index);
            self.decoder.status = ChunkStatus::Failed;
            self.data = None;
            return;
        }

        match crypto::decrypt_chunk(&raw[..blob_len], key, file_id, chunk_index) {
            Ok(plain) => {
                debug_assert_eq!(plain.len(), original_size);
                self.data = Some(plain);
                self.plaintext = true;
            }
            Err(_) => {
                log::warn!("chunk {} failed authentication", chunk_index);
                self.decoder.status = ChunkStatus::Failed;
                self.data = None;
            }
        }
    }
}

/// Reconstructs a file from fountain-coded packet blobs.
///
/// Feed every candidate blob the video layer yields to [`Receiver::push`].
/// Malformed, corrupt or foreign packets are dropped silently: loss is the
/// expected failure mode of the channel, never a reason to abort. Once
/// enough packets went in, [`Receiver::assemble`] returns the file.
///
/// All session parameters (file id, chunk layout, encryption) are taken
/// from the packet headers, so a receiver needs no configuration.
#[derive(Debug)]
pub struct Receiver {
    file_id: Option<FileId>,
    encrypted: Option<bool>,
    key: Option<EncryptionKey>,
    chunks: Vec<ChunkState>,
    max_chunk_index: Option<u32>,
    last_chunk_index: Option<u32>,
    nb_pkt_received: usize,
    nb_pkt_accepted: usize,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    /// Create an empty receiver.
    pub fn new() -> Receiver {
        Receiver {
            file_id: None,
            encrypted: None,
            key: None,
            chunks: Vec::new(),
            max_chunk_index: None,
            last_chunk_index: None,
            nb_pkt_received: 0,
            nb_pkt_accepted: 0,
        }
    }

    /// Feed one candidate packet blob.
    ///
    /// Returns true when the packet was accepted into a chunk.
    pub fn push(&mut self, data: &[u8]) -> bool {
        self.nb_pkt_received += 1;

        let (pkt_header, payload) = match header::parse_packet(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("drop packet: {}", e);
                return false;
            }
        };

        if !self.bind_session(&pkt_header) {
            return false;
        }

        let chunk_index = pkt_header.chunk_index;
        self.max_chunk_index = Some(match self.max_chunk_index {
            Some(max) => max.max(chunk_index),
            None => chunk_index,
        });
        if pkt_header.is_last_chunk() {
            self.last_chunk_index = Some(chunk_index);
        }

        if chunk_index as usize >= self.chunks.len() {
            self.chunks
                .resize_with(chunk_index as usize + 1, ChunkState::new);
        }

        let state = &mut self.chunks[chunk_index as usize];
        if !state.decoder.matches(&pkt_header) {
            log::debug!("drop packet: parameter mismatch for chunk {}", chunk_index);
            return false;
        }

        if state.decoder.status != ChunkStatus::Accumulating {
            log::trace!("drop packet: chunk {} already done", chunk_index);
            return false;
        }

        state.decoder.init(&pkt_header);

        let completed = match state.decoder.push(&pkt_header, payload) {
            SymbolPush::Duplicate => return false,
            SymbolPush::Accepted => false,
            SymbolPush::Completed => true,
        };
        self.nb_pkt_accepted += 1;

        if completed {
            match state.decoder.source_block() {
                Ok(raw) => {
                    let raw = raw.to_vec();
                    state.decoder.deallocate();
                    if pkt_header.is_encrypted() {
                        match &self.key {
                            // Key already known: finalize right away.
                            Some(key) => {
                                let file_id = pkt_header.file_id;
                                state.finalize(raw, key, &file_id, chunk_index);
                            }
                            // Keep the ciphertext blob for assembly time.
                            None => {
                                state.data = Some(raw);
                                state.plaintext = false;
                            }
                        }
                    } else {
                        let mut plain = raw;
                        plain.truncate(state.decoder.original_size() as usize);
                        state.data = Some(plain);
                        state.plaintext = true;
                    }
                }
                Err(e) => {
                    log::error!("chunk {} recovery failed: {}", chunk_index, e);
                    state.decoder.status = ChunkStatus::Failed;
                }
            }
        }

        true
    }

    // First accepted packet binds the session; later packets must agree on
    // the file id and the encrypted flag.
    fn bind_session(&mut self, pkt_header: &PacketHeader) -> bool {
        match self.file_id {
            None => self.file_id = Some(pkt_header.file_id),
            Some(file_id) if file_id != pkt_header.file_id => {
                log::debug!("drop packet: foreign file id");
                return false;
            }
            _ => {}
        }

        let pkt_encrypted = pkt_header.is_encrypted();
        match self.encrypted {
            None => self.encrypted = Some(pkt_encrypted),
            Some(encrypted) if encrypted != pkt_encrypted => {
                log::debug!("drop packet: encrypted flag disagrees with session");
                return false;
            }
            _ => {}
        }

        true
    }

    /// File id captured from the first accepted packet.
    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    /// True when the received packets were encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted.unwrap_or(false)
    }

    /// Derive the decryption key from a password and the observed file id.
    ///
    /// Needs at least one accepted packet.
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        let file_id = self
            .file_id
            .ok_or_else(|| Error::config("no file id observed yet"))?;
        let key = crypto::derive_key(password.as_bytes(), &file_id)?;
        self.set_decrypt_key(key);
        Ok(())
    }

    /// Install a pre-derived decryption key.
    pub fn set_decrypt_key(&mut self, key: EncryptionKey) {
        self.key = Some(key);
    }

    /// Drop the decryption key; the key buffer is zeroed.
    pub fn clear_decrypt_key(&mut self) {
        self.key = None;
    }

    /// Heuristic chunk count from the observed headers.
    ///
    /// `last_chunk_index + 1` once a `LAST_CHUNK` packet was seen, otherwise
    /// `max_chunk_index + 1`. `None` before the first accepted packet.
    pub fn expected_chunks(&self) -> Option<u32> {
        match self.last_chunk_index {
            Some(index) => Some(index + 1),
            None => self.max_chunk_index.map(|index| index + 1),
        }
    }

    /// Number of packet blobs pushed so far.
    pub fn nb_pkt_received(&self) -> usize {
        self.nb_pkt_received
    }

    /// Number of packets accepted into a chunk.
    pub fn nb_pkt_accepted(&self) -> usize {
        self.nb_pkt_accepted
    }

    /// Number of chunks recovered so far.
    pub fn nb_chunks_completed(&self) -> usize {
        self.chunks
            .iter()
            .filter(|state| state.decoder.status == ChunkStatus::Recovered)
            .count()
    }

    /// Status of a chunk the receiver has seen packets for.
    pub fn chunk_status(&self, chunk_index: u32) -> Option<ChunkStatus> {
        self.chunks
            .get(chunk_index as usize)
            .map(|state| state.decoder.status)
    }

    /// Assemble the file from the first `expected_chunks` chunks.
    ///
    /// Fails with `IncompleteFile` when a chunk is missing, `AuthFailed`
    /// when a chunk did not authenticate (wrong password or corrupted
    /// data), and `Config` when the stream is encrypted but no key was set.
    pub fn assemble(&mut self, expected_chunks: u32) -> Result<Vec<u8>> {
        if expected_chunks == 0 {
            return Err(Error::config("expected chunk count is 0"));
        }

        let encrypted = self.is_encrypted();
        if encrypted && self.key.is_none() {
            return Err(Error::config(
                "content is encrypted, a password is required",
            ));
        }

        // Late finalization of chunks recovered before the key was set.
        if encrypted {
            let key = self.key.as_ref().unwrap();
            let file_id = self.file_id.unwrap();
            for (chunk_index, state) in self.chunks.iter_mut().enumerate() {
                if state.decoder.status == ChunkStatus::Recovered && !state.plaintext {
                    let raw = state.data.take().unwrap_or_default();
                    state.finalize(raw, key, &file_id, chunk_index as u32);
                }
            }
        }

        let mut decoded = 0u32;
        let mut failed = 0u32;
        for chunk_index in 0..expected_chunks as usize {
            match self.chunks.get(chunk_index).map(|s| s.decoder.status) {
                Some(ChunkStatus::Recovered) => decoded += 1,
                Some(ChunkStatus::Failed) => failed += 1,
                _ => {}
            }
        }

        if failed > 0 {
            log::error!("{} chunks failed authentication", failed);
            return Err(Error::AuthFailed);
        }

        if decoded < expected_chunks {
            return Err(Error::IncompleteFile {
                decoded,
                expected: expected_chunks,
            });
        }

        let total: usize = self.chunks[..expected_chunks as usize]
            .iter()
            .map(|state| state.decoder.original_size() as usize)
            .sum();
        let mut out = Vec::with_capacity(total);
        for state in &self.chunks[..expected_chunks as usize] {
            out.extend_from_slice(state.data.as_ref().unwrap());
        }

        Ok(out)
    }
}

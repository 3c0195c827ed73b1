use crate::common::header::PacketHeader;
use crate::fec::raptor::RaptorDecoder;
use crate::fec::FecDecoder;
use crate::tools::error::{Error, Result};
use std::collections::HashSet;

/// Recovery progress of one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Collecting encoding symbols
    Accumulating,
    /// Chunk bytes recovered
    Recovered,
    /// Recovered but failed authentication
    Failed,
}

/// Outcome of feeding one symbol to a [`BlockDecoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolPush {
    /// Block id was already consumed; the symbol was dropped
    Duplicate,
    /// Symbol consumed, the chunk is still incomplete
    Accepted,
    /// Symbol consumed and the chunk just completed
    Completed,
}

/// Accumulates the encoding symbols of one chunk until it can be rebuilt.
#[derive(Debug)]
pub struct BlockDecoder {
    /// Current status
    pub status: ChunkStatus,
    symbol_size: u16,
    nb_source_symbols: u32,
    chunk_size: u32,
    original_size: u32,
    seen: HashSet<u32>,
    decoder: Option<Box<dyn FecDecoder>>,
}

impl BlockDecoder {
    pub fn new() -> BlockDecoder {
        BlockDecoder {
            status: ChunkStatus::Accumulating,
            symbol_size: 0,
            nb_source_symbols: 0,
            chunk_size: 0,
            original_size: 0,
            seen: HashSet::new(),
            decoder: None,
        }
    }

    /// Capture the chunk parameters from the first accepted header.
    pub fn init(&mut self, header: &PacketHeader) {
        if self.decoder.is_some() {
            return;
        }

        self.symbol_size = header.symbol_size;
        self.nb_source_symbols = header.nb_source_symbols;
        self.chunk_size = header.chunk_size;
        self.original_size = header.original_size;
        self.decoder = Some(Box::new(RaptorDecoder::new(
            header.nb_source_symbols,
            header.chunk_size as usize,
        )));
    }

    /// Check an inbound header against the captured parameters.
    ///
    /// Always true before [`BlockDecoder::init`] ran.
    pub fn matches(&self, header: &PacketHeader) -> bool {
        self.decoder.is_none()
            || (self.symbol_size == header.symbol_size
                && self.nb_source_symbols == header.nb_source_symbols
                && self.chunk_size == header.chunk_size
                && self.original_size == header.original_size)
    }

    /// Plaintext size declared by the headers of this chunk.
    pub fn original_size(&self) -> u32 {
        self.original_size
    }

    /// Feed one symbol.
    ///
    /// The caller must only push while the status is `Accumulating`.
    pub fn push(&mut self, header: &PacketHeader, payload: &[u8]) -> SymbolPush {
        debug_assert!(self.decoder.is_some());
        debug_assert_eq!(self.status, ChunkStatus::Accumulating);

        if !self.seen.insert(header.block_id) {
            log::trace!(
                "duplicate block {} for chunk {}",
                header.block_id,
                header.chunk_index
            );
            return SymbolPush::Duplicate;
        }

        let decoder = self.decoder.as_mut().unwrap();
        decoder.push_symbol(payload, header.block_id);

        if decoder.can_decode() && decoder.decode() {
            self.status = ChunkStatus::Recovered;
            log::debug!(
                "chunk {} recovered from {} symbols",
                header.chunk_index,
                self.seen.len()
            );
            return SymbolPush::Completed;
        }

        SymbolPush::Accepted
    }

    /// The recovered erasure payload, `chunk_size` bytes long.
    pub fn source_block(&self) -> Result<&[u8]> {
        match self.decoder.as_ref() {
            Some(decoder) => decoder.source_block(),
            None => Err(Error::encode("chunk decoder was never initialized")),
        }
    }

    /// Release the decoder and duplicate-tracking allocations.
    pub fn deallocate(&mut self) {
        self.decoder = None;
        self.seen = HashSet::new();
    }
}

//! Erasure-coder capability contract.
//!
//! Wire `block_id`s are 1-based: ids `<= N` address source symbols, ids
//! `> N` address repair symbols. Implementations map them to their own
//! symbol identifiers.

pub mod raptor;

use crate::tools::error::Result;

/// Erasure encoder over one prepared chunk buffer.
pub trait FecEncoder {
    /// Produce the encoding symbol for `block_id`.
    fn encode_symbol(&mut self, block_id: u32) -> Result<Vec<u8>>;

    /// Number of source symbols `N` of the underlying message.
    fn nb_source_symbols(&self) -> u32;
}

/// Erasure decoder accumulating symbols of one chunk.
pub trait FecDecoder {
    /// Feed one received encoding symbol.
    fn push_symbol(&mut self, symbol: &[u8], block_id: u32);

    /// True once enough unique symbols arrived to attempt recovery.
    fn can_decode(&self) -> bool;

    /// Attempt recovery; true on success.
    fn decode(&mut self) -> bool;

    /// The recovered message once [`FecDecoder::decode`] succeeded.
    fn source_block(&self) -> Result<&[u8]>;
}

impl std::fmt::Debug for dyn FecDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "FecDecoder {{  }}")
    }
}

use serde::Serialize;

/// Validation metadata for one encoded chunk.
///
/// Not part of the wire format; callers may persist it for out-of-band
/// verification of a later decode.
#[derive(Clone, Debug, Serialize)]
pub struct ChunkManifestEntry {
    /// Chunk index within the file
    pub chunk_index: u32,
    /// Plaintext size of the chunk before encryption and padding
    pub original_size: u32,
    /// Size handed to the erasure encoder, padding included
    pub chunk_size: u32,
    /// Encoding-symbol size `T`
    pub symbol_size: u16,
    /// Number of source symbols `N`
    pub nb_source_symbols: u32,
    /// SHA-256 of the plaintext chunk
    pub sha256: [u8; 32],
}

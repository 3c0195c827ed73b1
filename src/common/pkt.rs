use super::header::HEADER_SIZE;

/// A wire packet: fixed-size header followed by one encoding-symbol payload.
///
/// Immutable after construction. The `bytes` buffer is what the video layer
/// transports; `chunk_index` and `block_id` duplicate the header fields so
/// callers can address packets without re-parsing.
#[derive(Clone, Debug)]
pub struct Packet {
    /// Chunk this packet belongs to
    pub chunk_index: u32,
    /// Fountain block id carried in the header
    pub block_id: u32,
    /// Header and payload bytes, ready for transport
    pub bytes: Vec<u8>,
}

impl Packet {
    /// The encoding-symbol payload following the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }
}

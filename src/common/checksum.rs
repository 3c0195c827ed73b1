//! Integrity primitives shared by the packet codec and the chunk manifest.

use sha2::{Digest, Sha256};

/// CRC-32C over a packet.
///
/// `header` must already have its CRC field zeroed; the checksum covers the
/// header bytes followed by the payload bytes.
pub fn packet_crc32c(header: &[u8], payload: &[u8]) -> u32 {
    let crc = crc32c::crc32c(header);
    crc32c::crc32c_append(crc, payload)
}

/// SHA-256 digest of a chunk.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

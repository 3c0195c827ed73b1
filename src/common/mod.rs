use crate::tools::error::{Error, Result};
use rand::RngCore;
use serde::Serialize;

pub mod checksum;
pub mod header;
pub mod pkt;

/// Number of bytes in a [`FileId`].
pub const FILE_ID_BYTES: usize = 16;

/// Default size of the buffer handed to the erasure encoder per chunk.
pub const CHUNK_BYTES: usize = 1024 * 1024;

/// Default encoding-symbol size `T` in bytes.
pub const SYMBOL_SIZE_BYTES: u16 = 1024;

/// Default ratio of repair symbols to source symbols.
pub const REPAIR_OVERHEAD: f64 = 0.1;

/// Whether source symbols are emitted alongside repair symbols by default.
pub const INCLUDE_SOURCE: bool = true;

/// Magic number opening every packet header ("FVLT", little-endian).
pub const MAGIC_ID: u32 = 0x544C_5646;

/// Version byte of the v2 packet header.
pub const VERSION_ID_V2: u8 = 2;

/// AEAD overhead added to an encrypted chunk: 12-byte nonce + 16-byte tag.
pub const AEAD_OVERHEAD: usize = crate::crypto::NONCE_BYTES + crate::crypto::TAG_BYTES;

/// Packet flags bitfield
pub mod flags {
    /// Set when `block_id > N`, i.e. the payload is a repair symbol
    pub const IS_REPAIR_SYMBOL: u8 = 1;
    /// Set on every packet of the final chunk of the file
    pub const LAST_CHUNK: u8 = 2;
    /// Set on every packet when the session used encryption
    pub const ENCRYPTED: u8 = 4;
}

///
/// 16-byte identifier bound to one encoded file.
///
/// Carried in every packet header; also the KDF salt and part of the AEAD
/// associated data when the session is encrypted. The id must be generated
/// by the caller, either randomly or derived from content.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FileId([u8; FILE_ID_BYTES]);

impl FileId {
    /// Wrap fixed bytes into a file id.
    pub fn from_bytes(bytes: [u8; FILE_ID_BYTES]) -> Self {
        FileId(bytes)
    }

    /// Generate a random file id.
    pub fn random() -> Self {
        let mut bytes = [0u8; FILE_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        FileId(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; FILE_ID_BYTES] {
        &self.0
    }
}

///
/// Codec parameters shared by the sender and the receiver of one session.
///
/// The receiver recovers everything it needs from packet headers; this
/// configuration only drives the sender. Defaults are the production
/// constants.
///
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    /// Size of the buffer handed to the erasure encoder per chunk
    pub chunk_bytes: usize,
    /// Encoding-symbol size `T`
    pub symbol_size: u16,
    /// Ratio of repair symbols to source symbols
    pub repair_overhead: f64,
    /// Emit source symbols in addition to repair symbols
    pub include_source: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_bytes: CHUNK_BYTES,
            symbol_size: SYMBOL_SIZE_BYTES,
            repair_overhead: REPAIR_OVERHEAD,
            include_source: INCLUDE_SOURCE,
        }
    }
}

impl Config {
    /// Check parameter sanity.
    pub fn validate(&self) -> Result<()> {
        if self.symbol_size == 0 {
            return Err(Error::config("symbol size is 0"));
        }

        if self.chunk_bytes <= AEAD_OVERHEAD {
            return Err(Error::config(format!(
                "chunk size {} does not leave room for the AEAD overhead",
                self.chunk_bytes
            )));
        }

        if self.chunk_bytes > u32::MAX as usize {
            return Err(Error::config("chunk size does not fit the wire format"));
        }

        if !(self.repair_overhead >= 0.0) {
            return Err(Error::config("repair overhead must be >= 0"));
        }

        if !self.include_source && self.repair_overhead < 1.0 {
            log::warn!(
                "repair-only mode with overhead {} cannot produce enough symbols to decode",
                self.repair_overhead
            );
        }

        Ok(())
    }

    /// Upper bound of a plaintext chunk for this configuration.
    ///
    /// When encrypting, room is left so the ciphertext still fits
    /// `chunk_bytes`.
    pub fn plaintext_chunk_bytes(&self, encrypted: bool) -> usize {
        match encrypted {
            true => self.chunk_bytes - AEAD_OVERHEAD,
            false => self.chunk_bytes,
        }
    }
}

#[cfg(test)]
mod tests {

    #[test]
    pub fn test_config_default_is_valid() {
        crate::tests::init();
        super::Config::default().validate().unwrap();
    }

    #[test]
    pub fn test_config_rejects_zero_symbol_size() {
        crate::tests::init();
        let config = super::Config {
            symbol_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    pub fn test_config_rejects_tiny_chunk() {
        crate::tests::init();
        let config = super::Config {
            chunk_bytes: super::AEAD_OVERHEAD,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    pub fn test_plaintext_chunk_bytes() {
        crate::tests::init();
        let config = super::Config::default();
        assert_eq!(config.plaintext_chunk_bytes(false), config.chunk_bytes);
        assert_eq!(
            config.plaintext_chunk_bytes(true),
            config.chunk_bytes - super::AEAD_OVERHEAD
        );
    }

    #[test]
    pub fn test_random_file_ids_differ() {
        crate::tests::init();
        assert_ne!(super::FileId::random(), super::FileId::random());
    }
}

//! # FrameVault - File storage inside video containers
//!
//! Stores arbitrary binary files inside a video by turning file bytes into
//! a stream of self-describing, CRC-protected packets, and recovers the
//! file from the packets read back out of the frames.
//!
//! The video layer is treated as a lossy, byte-framed channel: frames get
//! dropped, re-encoded and reordered by hosting platforms. Every chunk of
//! the file is therefore expanded with a rateless (fountain) erasure code,
//! so any sufficiently large subset of a chunk's packets rebuilds it.
//! Content can additionally be encrypted per chunk with a password, keeping
//! it confidential from the hosting platform.
//!
//! | Stage | Component |
//! | ------------- | ------------- |
//! | file → chunks | [`sender::Chunker`] |
//! | chunk → packets | [`sender::ChunkEncoder`] |
//! | file → packet stream | [`sender::Sender`] |
//! | packet stream → chunks → file | [`receiver::Receiver`] |
//!
//! # Encoding a file into packets
//!
//! ```rust
//! use framevault::sender::Sender;
//! use framevault::core::{Config, FileId};
//!
//! let content = vec![0xA5u8; 4096];
//! let mut sender = Sender::from_buffer(content, FileId::random(),
//!     &Config::default(), None).unwrap();
//!
//! // Hand every packet blob over to the video encoder
//! let mut packets = Vec::new();
//! while let Some(pkt) = sender.read().unwrap() {
//!     packets.push(pkt);
//! }
//! assert!(!packets.is_empty());
//! ```
//!
//! # Decoding packets back into the file
//!
//! ```rust
//! use framevault::receiver::Receiver;
//! use framevault::sender::Sender;
//! use framevault::core::{Config, FileId};
//!
//! let content: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
//! let mut sender = Sender::from_buffer(content.clone(), FileId::random(),
//!     &Config::default(), None).unwrap();
//!
//! // Push every candidate blob the video decoder yields; corrupt or
//! // missing packets are tolerated up to the repair overhead.
//! let mut receiver = Receiver::new();
//! while let Some(pkt) = sender.read().unwrap() {
//!     receiver.push(&pkt);
//! }
//!
//! let expected = receiver.expected_chunks().unwrap();
//! assert_eq!(receiver.assemble(expected).unwrap(), content);
//! ```
//!
//! # Encrypted sessions
//!
//! ```rust,no_run
//! use framevault::receiver::Receiver;
//! use framevault::sender::Sender;
//! use framevault::core::{Config, FileId};
//!
//! let mut sender = Sender::from_buffer(b"secret".to_vec(), FileId::random(),
//!     &Config::default(), Some("hunter2")).unwrap();
//! let mut receiver = Receiver::new();
//! while let Some(pkt) = sender.read().unwrap() {
//!     receiver.push(&pkt);
//! }
//!
//! // The encrypted flag travels in every header; the password is only
//! // needed once all packets are in.
//! assert!(receiver.is_encrypted());
//! receiver.set_password("hunter2").unwrap();
//! let expected = receiver.expected_chunks().unwrap();
//! assert_eq!(receiver.assemble(expected).unwrap(), b"secret");
//! ```

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(warnings))]

mod common;
mod crypto;
mod fec;
mod recv;
mod send;
mod tools;

///
/// Sender converting a file into fountain-coded packets
///
pub mod sender {
    pub use crate::send::block::ChunkEncoder;
    pub use crate::send::chunker::{ChunkSource, Chunker};
    pub use crate::send::manifest::ChunkManifestEntry;
    pub use crate::send::sender::Sender;
}

///
/// Receiver re-constructing the file from packet blobs
///
pub mod receiver {
    pub use crate::recv::blockdecoder::ChunkStatus;
    pub use crate::recv::receiver::Receiver;
}

/// Identifiers, configuration and wire constants shared by both sides
pub mod core {
    pub use crate::common::flags;
    pub use crate::common::header::{parse_packet, PacketHeader, HEADER_SIZE};
    pub use crate::common::pkt::Packet;
    pub use crate::common::{
        Config, FileId, AEAD_OVERHEAD, CHUNK_BYTES, FILE_ID_BYTES, INCLUDE_SOURCE, MAGIC_ID,
        REPAIR_OVERHEAD, SYMBOL_SIZE_BYTES, VERSION_ID_V2,
    };
    pub use crate::crypto::{derive_key, EncryptionKey};
}

pub use crate::tools::error;

#[cfg(test)]
mod tests {
    pub fn init() {
        // std::env::set_var("RUST_LOG", "debug");
        env_logger::builder().is_test(true).try_init().ok();
    }
}

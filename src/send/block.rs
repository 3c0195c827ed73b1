use super::manifest::ChunkManifestEntry;
use crate::common::header::{self, PacketHeader};
use crate::common::pkt::Packet;
use crate::common::{checksum, flags, Config, FileId};
use crate::crypto::{self, EncryptionKey};
use crate::fec::raptor::RaptorEncoder;
use crate::fec::FecEncoder;
use crate::tools::error::{Error, Result};

/// Stateless per-chunk encode pipeline.
///
/// Turns one plaintext chunk into framed, CRC-protected packets:
/// optional AEAD, zero-padding up to the fountain minimum, symbol sweep,
/// header assembly. Chunks are independent, so one instance may encode
/// many chunks concurrently.
#[derive(Clone, Debug)]
pub struct ChunkEncoder {
    file_id: FileId,
    config: Config,
}

impl ChunkEncoder {
    /// Create an encoder bound to one file id and configuration.
    pub fn new(file_id: FileId, config: &Config) -> Result<ChunkEncoder> {
        config.validate()?;
        Ok(ChunkEncoder {
            file_id,
            config: config.clone(),
        })
    }

    /// Encode one chunk into its packets and manifest entry.
    ///
    /// Passing `key` switches on per-chunk authenticated encryption.
    pub fn encode_chunk(
        &self,
        chunk_index: u32,
        chunk_data: &[u8],
        is_last_chunk: bool,
        key: Option<&EncryptionKey>,
    ) -> Result<(Vec<Packet>, ChunkManifestEntry)> {
        let encrypted = key.is_some();
        let max_plain = self.config.plaintext_chunk_bytes(encrypted);
        if chunk_data.is_empty() || chunk_data.len() > max_plain {
            return Err(Error::encode(format!(
                "chunk {} size {} outside 1..={}",
                chunk_index,
                chunk_data.len(),
                max_plain
            )));
        }

        let mut data_to_encode = match key {
            Some(key) => crypto::encrypt_chunk(chunk_data, key, &self.file_id, chunk_index)?,
            None => chunk_data.to_vec(),
        };

        // The fountain code needs at least two symbols worth of input.
        let symbol_size = self.config.symbol_size;
        let min_size = 2 * symbol_size as usize;
        if data_to_encode.len() < min_size {
            data_to_encode.resize(min_size, 0);
        }

        let chunk_size = data_to_encode.len() as u32;
        let mut encoder = RaptorEncoder::new(&data_to_encode, symbol_size)?;
        let nb_source_symbols = encoder.nb_source_symbols();
        let nb_repair = repair_count(nb_source_symbols, self.config.repair_overhead);

        let first_block_id = match self.config.include_source {
            true => 1,
            false => nb_source_symbols + 1,
        };
        let last_block_id = nb_source_symbols + nb_repair;

        let mut packets = Vec::with_capacity((last_block_id + 1 - first_block_id) as usize);
        for block_id in first_block_id..=last_block_id {
            let payload = encoder.encode_symbol(block_id)?;
            debug_assert!(payload.len() <= symbol_size as usize);

            let mut pkt_flags = 0u8;
            if block_id > nb_source_symbols {
                pkt_flags |= flags::IS_REPAIR_SYMBOL;
            }
            if is_last_chunk {
                pkt_flags |= flags::LAST_CHUNK;
            }
            if encrypted {
                pkt_flags |= flags::ENCRYPTED;
            }

            let pkt_header = PacketHeader {
                flags: pkt_flags,
                file_id: self.file_id,
                chunk_index,
                chunk_size,
                original_size: chunk_data.len() as u32,
                symbol_size,
                nb_source_symbols,
                block_id,
                payload_length: payload.len() as u16,
            };

            let mut bytes = Vec::new();
            header::push_packet(&mut bytes, &pkt_header, &payload);
            packets.push(Packet {
                chunk_index,
                block_id,
                bytes,
            });
        }

        let manifest = ChunkManifestEntry {
            chunk_index,
            original_size: chunk_data.len() as u32,
            chunk_size,
            symbol_size,
            nb_source_symbols,
            sha256: checksum::sha256(chunk_data),
        };

        log::debug!(
            "chunk {} encoded: N={} R={} packets={}",
            chunk_index,
            nb_source_symbols,
            nb_repair,
            packets.len()
        );
        Ok((packets, manifest))
    }
}

fn repair_count(nb_source_symbols: u32, overhead: f64) -> u32 {
    (nb_source_symbols as f64 * overhead).ceil() as u32
}

#[cfg(test)]
mod tests {
    use crate::common::{header, Config, FileId};
    use crate::crypto::EncryptionKey;

    fn encoder(config: &Config) -> super::ChunkEncoder {
        super::ChunkEncoder::new(FileId::from_bytes([1u8; 16]), config).unwrap()
    }

    fn config() -> Config {
        Config {
            chunk_bytes: 4096,
            symbol_size: 64,
            repair_overhead: 0.25,
            include_source: true,
        }
    }

    #[test]
    pub fn test_encode_chunk_packet_sweep() {
        crate::tests::init();

        let config = config();
        let chunk: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
        let (packets, manifest) = encoder(&config).encode_chunk(0, &chunk, false, None).unwrap();

        // N = 64, R = ceil(64 * 0.25) = 16
        assert_eq!(manifest.nb_source_symbols, 64);
        assert_eq!(packets.len(), 80);

        for (i, pkt) in packets.iter().enumerate() {
            let (h, payload) = header::parse_packet(&pkt.bytes).unwrap();
            assert_eq!(h.block_id, i as u32 + 1);
            assert_eq!(h.chunk_index, 0);
            assert_eq!(h.is_repair_symbol(), h.block_id > 64);
            assert!(!h.is_last_chunk());
            assert!(!h.is_encrypted());
            assert_eq!(payload.len(), h.payload_length as usize);
        }
    }

    #[test]
    pub fn test_small_chunk_is_padded_to_two_symbols() {
        crate::tests::init();

        let config = config();
        let (packets, manifest) = encoder(&config).encode_chunk(0, b"A", true, None).unwrap();
        assert_eq!(manifest.original_size, 1);
        assert_eq!(manifest.chunk_size, 128);
        assert_eq!(manifest.nb_source_symbols, 2);

        let (h, _) = header::parse_packet(&packets[0].bytes).unwrap();
        assert!(h.is_last_chunk());
        assert_eq!(h.chunk_size, 128);
        assert_eq!(h.original_size, 1);
    }

    #[test]
    pub fn test_encrypted_chunk_carries_aead_overhead() {
        crate::tests::init();

        let config = config();
        let key = EncryptionKey::from_bytes([7u8; 32]);
        let chunk = vec![0x55u8; 1000];
        let (packets, manifest) = encoder(&config)
            .encode_chunk(2, &chunk, false, Some(&key))
            .unwrap();

        assert_eq!(manifest.original_size, 1000);
        assert_eq!(manifest.chunk_size, 1000 + crate::common::AEAD_OVERHEAD as u32);
        let (h, _) = header::parse_packet(&packets[0].bytes).unwrap();
        assert!(h.is_encrypted());
    }

    #[test]
    pub fn test_oversized_chunk_is_rejected() {
        crate::tests::init();

        let config = config();
        assert!(encoder(&config)
            .encode_chunk(0, &vec![0u8; 4097], false, None)
            .is_err());
    }

    #[test]
    pub fn test_repair_only_sweep() {
        crate::tests::init();

        let config = Config {
            include_source: false,
            repair_overhead: 2.0,
            ..config()
        };
        let chunk = vec![0x33u8; 640];
        let (packets, manifest) = encoder(&config).encode_chunk(0, &chunk, false, None).unwrap();

        // N = 10, R = 20, source symbols suppressed
        assert_eq!(manifest.nb_source_symbols, 10);
        assert_eq!(packets.len(), 20);
        for pkt in &packets {
            let (h, _) = header::parse_packet(&pkt.bytes).unwrap();
            assert!(h.is_repair_symbol());
            assert!(h.block_id > 10);
        }
    }
}

use super::checksum;
use super::{flags, FileId, FILE_ID_BYTES, MAGIC_ID, VERSION_ID_V2};
use crate::tools::error::{Error, Result};

/*
 * v2 packet header, little-endian
 *
 *  offset  size  field
 *  ------  ----  -----------------------------------------------------
 *       0     4  magic
 *       4     1  version
 *       5     1  flags
 *       6    16  file_id
 *      22     4  chunk_index
 *      26     4  chunk_size        (bytes fed to the erasure encoder)
 *      30     4  original_size     (plaintext bytes before encryption)
 *      34     2  symbol_size       (T)
 *      36     4  nb_source_symbols (N)
 *      40     4  block_id          (1-based; > N means repair symbol)
 *      44     2  payload_length
 *      46     4  crc               (CRC-32C, header with this field
 *                                   zeroed, then payload)
 */

const MAGIC_OFF: usize = 0;
const VERSION_OFF: usize = 4;
const FLAGS_OFF: usize = 5;
const FILE_ID_OFF: usize = 6;
const CHUNK_INDEX_OFF: usize = 22;
const CHUNK_SIZE_OFF: usize = 26;
const ORIGINAL_SIZE_OFF: usize = 30;
const SYMBOL_SIZE_OFF: usize = 34;
const NB_SOURCE_OFF: usize = 36;
const BLOCK_ID_OFF: usize = 40;
const PAYLOAD_LEN_OFF: usize = 44;
const CRC_OFF: usize = 46;

/// Size of the v2 packet header in bytes.
pub const HEADER_SIZE: usize = 50;

/// Parsed v2 packet header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    /// Flags bitfield, see [`crate::core::flags`]
    pub flags: u8,
    /// File this packet belongs to
    pub file_id: FileId,
    /// Chunk index within the file, starting at 0
    pub chunk_index: u32,
    /// Size of the buffer fed to the erasure encoder, padding included
    pub chunk_size: u32,
    /// Plaintext chunk size before encryption and padding
    pub original_size: u32,
    /// Encoding-symbol size `T`
    pub symbol_size: u16,
    /// Number of source symbols `N`
    pub nb_source_symbols: u32,
    /// Fountain block id, 1-based
    pub block_id: u32,
    /// Payload length in bytes
    pub payload_length: u16,
}

impl PacketHeader {
    /// True when the payload is a repair symbol.
    pub fn is_repair_symbol(&self) -> bool {
        self.flags & flags::IS_REPAIR_SYMBOL != 0
    }

    /// True when this packet belongs to the final chunk of the file.
    pub fn is_last_chunk(&self) -> bool {
        self.flags & flags::LAST_CHUNK != 0
    }

    /// True when the session used encryption.
    pub fn is_encrypted(&self) -> bool {
        self.flags & flags::ENCRYPTED != 0
    }
}

/// Append a packet (header, CRC and payload) to the provided data vector.
pub fn push_packet(data: &mut Vec<u8>, header: &PacketHeader, payload: &[u8]) {
    debug_assert_eq!(payload.len(), header.payload_length as usize);

    let start = data.len();
    data.reserve(HEADER_SIZE + payload.len());
    data.extend(MAGIC_ID.to_le_bytes());
    data.push(VERSION_ID_V2);
    data.push(header.flags);
    data.extend(header.file_id.as_bytes());
    data.extend(header.chunk_index.to_le_bytes());
    data.extend(header.chunk_size.to_le_bytes());
    data.extend(header.original_size.to_le_bytes());
    data.extend(header.symbol_size.to_le_bytes());
    data.extend(header.nb_source_symbols.to_le_bytes());
    data.extend(header.block_id.to_le_bytes());
    data.extend(header.payload_length.to_le_bytes());
    data.extend(0u32.to_le_bytes());

    let crc = checksum::packet_crc32c(&data[start..], payload);
    data[start + CRC_OFF..start + CRC_OFF + 4].copy_from_slice(&crc.to_le_bytes());
    data.extend_from_slice(payload);
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Parse and verify one candidate packet.
///
/// Returns the header and the payload slice. Fails with `Format` on bad
/// magic/version, short buffers or inconsistent lengths, and with
/// `Integrity` on CRC mismatch.
pub fn parse_packet(data: &[u8]) -> Result<(PacketHeader, &[u8])> {
    if data.len() < HEADER_SIZE {
        return Err(Error::Format(format!(
            "packet size is {} whereas header size is {}",
            data.len(),
            HEADER_SIZE
        )));
    }

    let magic = read_u32(data, MAGIC_OFF);
    if magic != MAGIC_ID {
        return Err(Error::Format(format!("bad magic {:#010x}", magic)));
    }

    let version = data[VERSION_OFF];
    if version != VERSION_ID_V2 {
        return Err(Error::Format(format!(
            "packet version {} is not supported",
            version
        )));
    }

    let payload_length = read_u16(data, PAYLOAD_LEN_OFF) as usize;
    if HEADER_SIZE + payload_length > data.len() {
        return Err(Error::Format(format!(
            "payload ends at offset {} whereas packet size is {}",
            HEADER_SIZE + payload_length,
            data.len()
        )));
    }
    let payload = &data[HEADER_SIZE..HEADER_SIZE + payload_length];

    let mut zeroed = [0u8; HEADER_SIZE];
    zeroed.copy_from_slice(&data[..HEADER_SIZE]);
    zeroed[CRC_OFF..CRC_OFF + 4].fill(0);
    let crc = read_u32(data, CRC_OFF);
    if checksum::packet_crc32c(&zeroed, payload) != crc {
        return Err(Error::Integrity);
    }

    let mut file_id = [0u8; FILE_ID_BYTES];
    file_id.copy_from_slice(&data[FILE_ID_OFF..FILE_ID_OFF + FILE_ID_BYTES]);

    let header = PacketHeader {
        flags: data[FLAGS_OFF],
        file_id: FileId::from_bytes(file_id),
        chunk_index: read_u32(data, CHUNK_INDEX_OFF),
        chunk_size: read_u32(data, CHUNK_SIZE_OFF),
        original_size: read_u32(data, ORIGINAL_SIZE_OFF),
        symbol_size: read_u16(data, SYMBOL_SIZE_OFF),
        nb_source_symbols: read_u32(data, NB_SOURCE_OFF),
        block_id: read_u32(data, BLOCK_ID_OFF),
        payload_length: payload_length as u16,
    };

    if header.block_id == 0 {
        return Err(Error::Format("block id 0".to_owned()));
    }

    if header.payload_length > header.symbol_size {
        return Err(Error::Format(format!(
            "payload length {} exceeds symbol size {}",
            header.payload_length, header.symbol_size
        )));
    }

    let block_bytes = header.nb_source_symbols as u64 * header.symbol_size as u64;
    if header.original_size as u64 > header.chunk_size as u64
        || header.chunk_size as u64 > block_bytes
    {
        return Err(Error::Format(format!(
            "inconsistent sizes: original={} chunk={} N*T={}",
            header.original_size, header.chunk_size, block_bytes
        )));
    }

    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::PacketHeader;
    use crate::common::FileId;
    use crate::tools::error::Error;

    fn header() -> PacketHeader {
        PacketHeader {
            flags: crate::common::flags::LAST_CHUNK,
            file_id: FileId::from_bytes([7u8; 16]),
            chunk_index: 3,
            chunk_size: 2048,
            original_size: 2000,
            symbol_size: 1024,
            nb_source_symbols: 2,
            block_id: 1,
            payload_length: 5,
        }
    }

    #[test]
    pub fn test_packet_roundtrip() {
        crate::tests::init();

        let payload = b"hello";
        let mut data = Vec::new();
        super::push_packet(&mut data, &header(), payload);
        assert_eq!(data.len(), super::HEADER_SIZE + payload.len());

        let (parsed, parsed_payload) = super::parse_packet(&data).unwrap();
        assert_eq!(parsed, header());
        assert_eq!(parsed_payload, payload);
        assert!(parsed.is_last_chunk());
        assert!(!parsed.is_encrypted());
        assert!(!parsed.is_repair_symbol());
    }

    #[test]
    pub fn test_corrupted_packet_is_rejected() {
        crate::tests::init();

        let mut data = Vec::new();
        super::push_packet(&mut data, &header(), b"hello");

        for offset in 0..data.len() {
            let mut corrupted = data.clone();
            corrupted[offset] ^= 0x01;
            assert!(
                super::parse_packet(&corrupted).is_err(),
                "bit flip at offset {} went undetected",
                offset
            );
        }
    }

    #[test]
    pub fn test_short_packet_is_rejected() {
        crate::tests::init();

        let mut data = Vec::new();
        super::push_packet(&mut data, &header(), b"hello");
        assert!(matches!(
            super::parse_packet(&data[..super::HEADER_SIZE - 1]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    pub fn test_crc_mismatch_is_integrity_error() {
        crate::tests::init();

        let mut data = Vec::new();
        super::push_packet(&mut data, &header(), b"hello");
        // flip one payload bit, leaving the header intact
        let last = data.len() - 1;
        data[last] ^= 0x80;
        assert!(matches!(super::parse_packet(&data), Err(Error::Integrity)));
    }
}

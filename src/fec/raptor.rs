use super::{FecDecoder, FecEncoder};
use crate::tools::error::{Error, Result};

/// Systematic Raptor fountain encoder for one chunk.
pub struct RaptorEncoder {
    encoder: raptor_code::SourceBlockEncoder,
    nb_source_symbols: u32,
}

impl RaptorEncoder {
    /// Build an encoder over `data`, split into symbols of at most
    /// `symbol_size` bytes.
    pub fn new(data: &[u8], symbol_size: u16) -> Result<RaptorEncoder> {
        if symbol_size == 0 {
            return Err(Error::encode("symbol size is 0"));
        }

        let nb_source_symbols = num_integer::div_ceil(data.len(), symbol_size as usize);
        let encoder = raptor_code::SourceBlockEncoder::new(data, nb_source_symbols)
            .map_err(Error::encode)?;
        // The library recomputes the symbol partition; trust its count.
        let nb_source_symbols = encoder.nb_source_symbols();
        log::debug!(
            "new RaptorEncoder data_len={} symbol_size={} nb_source_symbols={}",
            data.len(),
            symbol_size,
            nb_source_symbols
        );

        Ok(RaptorEncoder {
            encoder,
            nb_source_symbols: nb_source_symbols as u32,
        })
    }
}

impl FecEncoder for RaptorEncoder {
    fn encode_symbol(&mut self, block_id: u32) -> Result<Vec<u8>> {
        if block_id == 0 {
            return Err(Error::encode("block id must be >= 1"));
        }
        Ok(self.encoder.fountain(block_id - 1))
    }

    fn nb_source_symbols(&self) -> u32 {
        self.nb_source_symbols
    }
}

/// Fountain decoder accumulating the symbols of one chunk.
pub struct RaptorDecoder {
    decoder: raptor_code::SourceBlockDecoder,
    message_size: usize,
    data: Option<Vec<u8>>,
}

impl RaptorDecoder {
    /// Create a decoder for a message of `message_size` bytes split into
    /// `nb_source_symbols` symbols.
    pub fn new(nb_source_symbols: u32, message_size: usize) -> RaptorDecoder {
        log::debug!(
            "new RaptorDecoder nb_source_symbols={} message_size={}",
            nb_source_symbols,
            message_size
        );
        RaptorDecoder {
            decoder: raptor_code::SourceBlockDecoder::new(nb_source_symbols as usize),
            message_size,
            data: None,
        }
    }
}

impl FecDecoder for RaptorDecoder {
    fn push_symbol(&mut self, symbol: &[u8], block_id: u32) {
        if self.data.is_some() || block_id == 0 {
            return;
        }

        self.decoder.push_encoding_symbol(symbol, block_id - 1)
    }

    fn can_decode(&self) -> bool {
        self.decoder.fully_specified()
    }

    fn decode(&mut self) -> bool {
        self.data = self.decoder.decode(self.message_size);
        self.data.is_some()
    }

    fn source_block(&self) -> Result<&[u8]> {
        match self.data.as_ref() {
            Some(e) => Ok(e),
            None => Err(Error::encode("chunk not decoded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FecDecoder, FecEncoder};

    #[test]
    pub fn test_roundtrip_from_source_symbols() {
        crate::tests::init();

        let data: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
        let mut encoder = super::RaptorEncoder::new(&data, 50).unwrap();
        let n = encoder.nb_source_symbols();
        assert_eq!(n, 10);

        let mut decoder = super::RaptorDecoder::new(n, data.len());
        for block_id in 1..=n {
            assert!(!decoder.can_decode());
            let symbol = encoder.encode_symbol(block_id).unwrap();
            decoder.push_symbol(&symbol, block_id);
        }

        assert!(decoder.can_decode());
        assert!(decoder.decode());
        assert_eq!(decoder.source_block().unwrap(), &data[..]);
    }

    #[test]
    pub fn test_roundtrip_with_losses_and_repair() {
        crate::tests::init();

        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut encoder = super::RaptorEncoder::new(&data, 100).unwrap();
        let n = encoder.nb_source_symbols();

        // Two source symbols lost; feed everything else plus five repairs.
        let mut decoder = super::RaptorDecoder::new(n, data.len());
        for block_id in (1..=n + 5).filter(|id| *id != 2 && *id != 7) {
            let symbol = encoder.encode_symbol(block_id).unwrap();
            decoder.push_symbol(&symbol, block_id);
            if decoder.can_decode() {
                break;
            }
        }

        assert!(decoder.can_decode());
        assert!(decoder.decode());
        assert_eq!(decoder.source_block().unwrap(), &data[..]);
    }

    #[test]
    pub fn test_source_block_before_decode_fails() {
        crate::tests::init();

        let decoder = super::RaptorDecoder::new(4, 100);
        assert!(decoder.source_block().is_err());
    }
}

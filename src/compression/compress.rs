use crate::core::error::{Error, ErrorKind, Result};
use serde::{Serialize, Deserialize};

/// Codec applied to a durable record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,      // Fast, ratio 2-3x
    Zstd,     // Better ratio, slower
    Snappy,
}

impl CompressionType {
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        let compressed = match self {
            CompressionType::None => data.to_vec(),

            CompressionType::Lz4 => lz4_flex::compress_prepend_size(data),

            CompressionType::Zstd => {
                zstd::encode_all(data, 3)?  // Level 3 is balanced
            }

            CompressionType::Snappy => {
                snap::raw::Encoder::new()
                    .compress_vec(data)
                    .map_err(|e| Error::new(ErrorKind::Io, e.to_string()))?
            }
        };

        Ok(compressed)
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),

            CompressionType::Lz4 => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| Error::new(ErrorKind::Corruption, format!("lz4: {}", e))),

            CompressionType::Zstd => zstd::decode_all(data)
                .map_err(|e| Error::new(ErrorKind::Corruption, format!("zstd: {}", e))),

            CompressionType::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| Error::new(ErrorKind::Corruption, format!("snappy: {}", e))),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;

/// Payload encoding inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordCodec {
    Bincode,
    Json,
}

/// On-disk form of a tiered-out document.
///
/// [ version | stored_at | codec | compression | crc32 | payload ]
///
/// The checksum covers the encoded payload before compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub version: u32,
    pub stored_at: DateTime<Utc>,
    pub codec: RecordCodec,
    pub compression: CompressionType,
    pub checksum: u32,
    pub payload: Vec<u8>,
}

impl DocumentRecord {
    pub const VERSION: u32 = 1;

    pub fn encode(doc: &Document, codec: RecordCodec, compression: CompressionType) -> Result<Vec<u8>> {
        let encoded = match codec {
            RecordCodec::Bincode => bincode::serialize(doc)?,
            RecordCodec::Json => serde_json::to_vec(doc)?,
        };

        let record = DocumentRecord {
            version: Self::VERSION,
            stored_at: Utc::now(),
            codec,
            compression,
            checksum: crc32fast::hash(&encoded),
            payload: compression.compress(&encoded)?,
        };

        Ok(bincode::serialize(&record)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Document> {
        let record: DocumentRecord = bincode::deserialize(bytes)
            .map_err(|e| Error::new(ErrorKind::Corruption, format!("unreadable record: {}", e)))?;

        if record.version != Self::VERSION {
            return Err(Error::new(
                ErrorKind::Corruption,
                format!("unsupported record version {}", record.version),
            ));
        }

        let encoded = record.compression.decompress(&record.payload)?;
        if crc32fast::hash(&encoded) != record.checksum {
            return Err(Error::new(ErrorKind::Corruption, "record checksum mismatch".to_string()));
        }

        let doc = match record.codec {
            RecordCodec::Bincode => bincode::deserialize(&encoded)?,
            RecordCodec::Json => serde_json::from_slice(&encoded)?,
        };
        Ok(doc)
    }
}

use std::path::PathBuf;
use crate::analysis::tokenizer::StandardTokenizer;
use crate::compression::compress::CompressionType;
use crate::storage::btree::DEFAULT_ORDER;
use crate::storage::record::RecordCodec;

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_path: Option<PathBuf>,          // None → private temp dir, removed on drop
    pub btree_order: usize,                     // Entries per node; even and > 2

    // Resident-set caps, None = unlimited
    pub max_document_count: Option<usize>,
    pub max_document_bytes: Option<usize>,      // Raw content bytes only

    // Durable record format
    pub compression: CompressionType,
    pub codec: RecordCodec,

    pub tokenizer: StandardTokenizer,
}

impl Config {
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_max_document_count(mut self, limit: usize) -> Self {
        self.max_document_count = Some(limit);
        self
    }

    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = Some(limit);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: None,
            btree_order: DEFAULT_ORDER,
            max_document_count: None,
            max_document_bytes: None,
            compression: CompressionType::Lz4,
            codec: RecordCodec::Bincode,
            tokenizer: StandardTokenizer::default(),
        }
    }
}

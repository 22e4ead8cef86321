use serde::{Serialize, Deserialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use crate::analysis::tokenizer::normalize_word;
use crate::core::error::{Error, Result};

/// Unique document key. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocKey(String);

impl DocKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::invalid_argument("document key must not be blank"));
        }
        Ok(DocKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for DocKey {
    type Error = Error;

    fn try_from(key: &str) -> Result<Self> {
        DocKey::new(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Txt,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }
}

/// A stored document. Content is immutable once built; metadata and the
/// last-used stamp change in place.
///
/// Equality is by key only. Recency order is available through
/// [`Document::recency_cmp`] and is deliberately not an `Ord` impl, since it
/// disagrees with equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    key: DocKey,
    content: Content,
    metadata: HashMap<String, String>,
    word_counts: Option<HashMap<String, u32>>,
    #[serde(skip)]
    last_used: u64,
}

impl Document {
    pub fn text(key: DocKey, text: String, word_counts: HashMap<String, u32>) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::invalid_argument(format!("text document {} is blank", key)));
        }
        Ok(Document {
            key,
            content: Content::Text(text),
            metadata: HashMap::new(),
            word_counts: Some(word_counts),
            last_used: 0,
        })
    }

    pub fn binary(key: DocKey, bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::invalid_argument(format!("binary document {} is empty", key)));
        }
        Ok(Document {
            key,
            content: Content::Binary(bytes),
            metadata: HashMap::new(),
            word_counts: None,
            last_used: 0,
        })
    }

    pub fn key(&self) -> &DocKey {
        &self.key
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Binary(_) => None,
        }
    }

    pub fn binary_content(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Binary(bytes) => Some(bytes),
            Content::Text(_) => None,
        }
    }

    pub fn format(&self) -> DocumentFormat {
        match self.content {
            Content::Text(_) => DocumentFormat::Txt,
            Content::Binary(_) => DocumentFormat::Binary,
        }
    }

    /// Raw content size, the unit the byte budget is measured in.
    pub fn byte_len(&self) -> usize {
        self.content.as_bytes().len()
    }

    pub fn words(&self) -> HashSet<&str> {
        match &self.word_counts {
            Some(counts) => counts.keys().map(String::as_str).collect(),
            None => HashSet::new(),
        }
    }

    /// Occurrences of `word`, after dropping its non-alphanumeric characters.
    /// Always 0 for binary documents.
    pub fn word_count(&self, word: &str) -> u32 {
        self.word_counts
            .as_ref()
            .and_then(|counts| counts.get(&normalize_word(word)).copied())
            .unwrap_or(0)
    }

    pub fn word_counts(&self) -> Option<&HashMap<String, u32>> {
        self.word_counts.as_ref()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, field: &str) -> Option<&str> {
        self.metadata.get(field).map(String::as_str)
    }

    pub fn set_metadata_value(&mut self, field: &str, value: &str) -> Result<Option<String>> {
        if field.trim().is_empty() {
            return Err(Error::invalid_argument("metadata field must not be blank"));
        }
        Ok(self.metadata.insert(field.to_string(), value.to_string()))
    }

    pub(crate) fn remove_metadata_value(&mut self, field: &str) -> Option<String> {
        self.metadata.remove(field)
    }

    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    pub fn set_last_used(&mut self, stamp: u64) {
        self.last_used = stamp;
    }

    pub fn recency_cmp(&self, other: &Document) -> std::cmp::Ordering {
        self.last_used.cmp(&other.last_used)
    }

    /// Content identity code: CRC32 over key and content. Never 0, which is
    /// reserved for "no document".
    pub fn identity_code(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.key.as_str().as_bytes());
        hasher.update(self.content.as_bytes());
        hasher.finalize().max(1)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Document {}

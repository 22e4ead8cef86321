use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, Result};
use crate::core::types::{DocKey, Document};
use crate::storage::layout::StorageLayout;
use crate::storage::record::{DocumentRecord, RecordCodec};

/// Durable home for values tiered out of the primary store.
pub trait PersistenceManager<K, V>: Send {
    /// Write or overwrite the record for `key`.
    fn serialize(&mut self, key: &K, value: &V) -> Result<()>;

    /// Read the record for `key`. Fails with `NotFound` when there is none.
    fn deserialize(&mut self, key: &K) -> Result<V>;

    /// Remove the record for `key`, returning whether one existed.
    fn delete(&mut self, key: &K) -> Result<bool>;
}

/// File-per-document persistence under a [`StorageLayout`].
pub struct DocumentPersistence {
    pub layout: StorageLayout,
    pub codec: RecordCodec,
    pub compression: CompressionType,
    // Keeps an owned temp directory alive for the store's lifetime.
    _temp_dir: Option<TempDir>,
}

impl DocumentPersistence {
    pub fn open(base_dir: PathBuf, codec: RecordCodec, compression: CompressionType) -> Result<Self> {
        Ok(DocumentPersistence {
            layout: StorageLayout::new(base_dir)?,
            codec,
            compression,
            _temp_dir: None,
        })
    }

    /// Persistence rooted in a fresh temp directory, removed on drop.
    pub fn temporary(codec: RecordCodec, compression: CompressionType) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut persistence = Self::open(temp_dir.path().to_path_buf(), codec, compression)?;
        persistence._temp_dir = Some(temp_dir);
        Ok(persistence)
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.layout.base_dir
    }
}

impl PersistenceManager<DocKey, Document> for DocumentPersistence {
    fn serialize(&mut self, key: &DocKey, doc: &Document) -> Result<()> {
        let path = self.layout.document_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = DocumentRecord::encode(doc, self.codec, self.compression)?;

        // Write aside, then rename over the target
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        if let Err(e) = write_then_rename(&tmp, &path, &data) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        tracing::trace!(key = %key, bytes = data.len(), "document record written");
        Ok(())
    }

    fn deserialize(&mut self, key: &DocKey) -> Result<Document> {
        let path = self.layout.document_path(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                return Err(Error::not_found(format!("no durable record for {}", key)));
            }
            Err(e) => return Err(e.into()),
        };

        DocumentRecord::decode(&data).map_err(|e| {
            tracing::warn!(key = %key, error = %e, "unreadable document record");
            e
        })
    }

    fn delete(&mut self, key: &DocKey) -> Result<bool> {
        let path = self.layout.document_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.layout.prune_empty_parents(&path);
                Ok(true)
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Map-backed persistence for embedding without a filesystem, and for tests.
pub struct MemoryPersistence<K, V> {
    pub records: HashMap<K, V>,
}

impl<K, V> MemoryPersistence<K, V> {
    pub fn new() -> Self {
        MemoryPersistence {
            records: HashMap::new(),
        }
    }
}

impl<K, V> Default for MemoryPersistence<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistenceManager<K, V> for MemoryPersistence<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send,
    V: Clone + Send,
{
    fn serialize(&mut self, key: &K, value: &V) -> Result<()> {
        self.records.insert(key.clone(), value.clone());
        Ok(())
    }

    fn deserialize(&mut self, key: &K) -> Result<V> {
        self.records
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("no durable record for {:?}", key)))
    }

    fn delete(&mut self, key: &K) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }
}

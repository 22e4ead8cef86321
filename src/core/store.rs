use std::collections::{HashMap, HashSet};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use crate::analysis::tokenizer::Tokenizer;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::handle::{DocHandle, HandleArena, HandleId};
use crate::core::stats::{Counters, ResidencyStats, StoreStats};
use crate::core::types::{DocKey, Document, DocumentFormat};
use crate::index::trie::WordIndex;
use crate::memory::budget::MemoryBudget;
use crate::memory::heap::EvictionHeap;
use crate::storage::btree::TieredBTree;
use crate::storage::persistence::{DocumentPersistence, PersistenceManager};
use crate::undo::{Revert, UndoAction, UndoBatch, UndoLog};

/// Inverse of one mutation on one key.
#[derive(Debug, Clone)]
pub enum Reversal {
    /// Put `previous` back in the key's slot; `None` deletes whatever is there.
    Replace { previous: Option<Document> },
    /// Restore a metadata field; `None` removes it.
    SetMetadata { field: String, previous: Option<String> },
}

/// Everything the undo log reverts against, kept apart from the log itself
/// so an entry can run while the log is borrowed.
pub(crate) struct StoreCore {
    docs: TieredBTree<DocKey, Document>,
    handles: HandleArena,
    words: WordIndex<HandleId>,
    heap: EvictionHeap<HandleId>,
    budget: MemoryBudget,
    tokenizer: Box<dyn Tokenizer>,
    clock: u64,                  // Logical last-used clock
    counters: Counters,
}

/// Embeddable document store: a tiered B-tree of documents with a word
/// index, LRU eviction to a durable tier under count/byte caps, and an undo
/// log with per-key undo.
///
/// Single-threaded; wrap it in a [`SharedDocumentStore`](crate::core::shared::SharedDocumentStore)
/// to share between threads.
pub struct DocumentStore {
    core: StoreCore,
    undo: UndoLog<DocKey, Reversal>,
    config: Config,
    started: Instant,
    start_time: SystemTime,
}

impl DocumentStore {
    /// Store with default settings, tiering to a private temp dir.
    pub fn new() -> Result<Self> {
        Self::open(Config::default())
    }

    pub fn open(config: Config) -> Result<Self> {
        let persistence = match &config.storage_path {
            Some(path) => {
                let persistence = DocumentPersistence::open(path.clone(), config.codec, config.compression)?;
                let stale = persistence.layout.clear_documents()?;
                if stale > 0 {
                    warn!(path = %path.display(), stale, "discarded document records left by an earlier store");
                }
                persistence
            }
            None => DocumentPersistence::temporary(config.codec, config.compression)?,
        };
        info!(
            path = %persistence.base_dir().display(),
            compression = ?config.compression,
            codec = ?config.codec,
            "opening document store"
        );
        Self::with_persistence(config, Box::new(persistence))
    }

    /// Store tiering through a caller-supplied backing store.
    pub fn with_persistence(
        config: Config,
        persistence: Box<dyn PersistenceManager<DocKey, Document>>,
    ) -> Result<Self> {
        let mut docs = TieredBTree::new(config.btree_order)?;
        docs.set_persistence_manager(persistence);

        let core = StoreCore {
            docs,
            handles: HandleArena::new(),
            words: WordIndex::new(),
            heap: EvictionHeap::new(),
            budget: MemoryBudget::new(config.max_document_count, config.max_document_bytes)?,
            tokenizer: config.tokenizer.clone_box(),
            clock: 0,
            counters: Counters::default(),
        };

        Ok(DocumentStore {
            core,
            undo: UndoLog::new(),
            config,
            started: Instant::now(),
            start_time: SystemTime::now(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert or replace the document at `key`; `None` content deletes it.
    /// Returns the identity code of the document that was there, or 0.
    pub fn put(&mut self, key: &str, content: Option<&[u8]>, format: DocumentFormat) -> Result<u32> {
        let key = DocKey::new(key)?;
        let Some(bytes) = content else {
            let previous = self.remove(&key)?;
            return Ok(previous.as_ref().map_or(0, Document::identity_code));
        };

        self.core.budget.check_document(bytes.len())?;
        let doc = self.core.build_document(key.clone(), bytes, format)?;
        let previous = self.core.replace(&key, Some(doc))?;
        let code = previous.as_ref().map_or(0, Document::identity_code);

        self.undo.push_action(key, Reversal::Replace { previous });
        self.core.counters.writes += 1;
        self.core.enforce_budget()?;
        Ok(code)
    }

    pub fn put_text(&mut self, key: &str, text: &str) -> Result<u32> {
        self.put(key, Some(text.as_bytes()), DocumentFormat::Txt)
    }

    pub fn put_binary(&mut self, key: &str, bytes: &[u8]) -> Result<u32> {
        self.put(key, Some(bytes), DocumentFormat::Binary)
    }

    /// Copy of the document, promoting it back to memory if tiered out.
    pub fn get(&mut self, key: &str) -> Result<Option<Document>> {
        let key = DocKey::new(key)?;
        let doc = self.core.with_document(&key, |doc| Ok(doc.clone()))?;
        self.core.counters.reads += 1;
        self.core.enforce_budget()?;
        Ok(doc)
    }

    /// Returns false when there was nothing to delete.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let key = DocKey::new(key)?;
        Ok(self.remove(&key)?.is_some())
    }

    fn remove(&mut self, key: &DocKey) -> Result<Option<Document>> {
        if self.core.handles.id_of(key).is_none() {
            return Ok(None);
        }
        let previous = self.core.replace(key, None)?;
        if previous.is_some() {
            self.undo.push_action(key.clone(), Reversal::Replace { previous: previous.clone() });
            self.core.counters.writes += 1;
        }
        Ok(previous)
    }

    /// Set a metadata field, returning its old value.
    pub fn set_metadata(&mut self, key: &str, field: &str, value: &str) -> Result<Option<String>> {
        let key = DocKey::new(key)?;
        check_field(field)?;

        let (old, metadata) = self
            .core
            .with_document(&key, |doc| {
                let old = doc.set_metadata_value(field, value)?;
                Ok((old, doc.metadata().clone()))
            })?
            .ok_or_else(|| Error::not_found(format!("no document at {}", key)))?;
        self.core.sync_metadata(&key, metadata);

        self.undo.push_action(
            key,
            Reversal::SetMetadata { field: field.to_string(), previous: old.clone() },
        );
        self.core.counters.writes += 1;
        self.core.enforce_budget()?;
        Ok(old)
    }

    pub fn get_metadata(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        let key = DocKey::new(key)?;
        check_field(field)?;

        let value = self
            .core
            .with_document(&key, |doc| Ok(doc.metadata_value(field).map(str::to_string)))?
            .ok_or_else(|| Error::not_found(format!("no document at {}", key)))?;
        self.core.counters.reads += 1;
        self.core.enforce_budget()?;
        Ok(value)
    }

    /// Documents containing `keyword`, most occurrences first. Matching is
    /// case sensitive and the keyword is not normalized.
    pub fn search(&mut self, keyword: &str) -> Result<Vec<Document>> {
        let keys = self.core.rank(self.core.words.get(keyword), |h| h.count(keyword), |_| true);
        self.core.materialize(keys)
    }

    /// Documents with a word starting with `prefix`, ranked by the summed
    /// counts of all such words.
    pub fn search_by_prefix(&mut self, prefix: &str) -> Result<Vec<Document>> {
        let ids = self.core.words.get_all_with_prefix(prefix);
        let keys = self.core.rank(ids, |h| h.prefix_count(prefix), |_| true);
        self.core.materialize(keys)
    }

    /// Documents carrying every pair in `required`, in key order.
    pub fn search_by_metadata(&mut self, required: &HashMap<String, String>) -> Result<Vec<Document>> {
        let keys = self.core.keys_with_metadata(required);
        self.core.materialize(keys)
    }

    pub fn search_by_keyword_and_metadata(
        &mut self,
        keyword: &str,
        required: &HashMap<String, String>,
    ) -> Result<Vec<Document>> {
        let ids = self.core.words.get(keyword);
        let keys = self.core.rank(ids, |h| h.count(keyword), |h| h.matches_metadata(required));
        self.core.materialize(keys)
    }

    pub fn search_by_prefix_and_metadata(
        &mut self,
        prefix: &str,
        required: &HashMap<String, String>,
    ) -> Result<Vec<Document>> {
        let ids = self.core.words.get_all_with_prefix(prefix);
        let keys = self.core.rank(ids, |h| h.prefix_count(prefix), |h| h.matches_metadata(required));
        self.core.materialize(keys)
    }

    /// Delete every document containing `keyword`, as one undoable batch.
    pub fn delete_all(&mut self, keyword: &str) -> Result<HashSet<DocKey>> {
        let keys = self.core.rank(self.core.words.get(keyword), |_| 0, |_| true);
        self.delete_batch(keys)
    }

    pub fn delete_all_with_prefix(&mut self, prefix: &str) -> Result<HashSet<DocKey>> {
        let keys = self.core.rank(self.core.words.get_all_with_prefix(prefix), |_| 0, |_| true);
        self.delete_batch(keys)
    }

    pub fn delete_all_with_metadata(&mut self, required: &HashMap<String, String>) -> Result<HashSet<DocKey>> {
        let keys = self.core.keys_with_metadata(required);
        self.delete_batch(keys)
    }

    pub fn delete_all_with_keyword_and_metadata(
        &mut self,
        keyword: &str,
        required: &HashMap<String, String>,
    ) -> Result<HashSet<DocKey>> {
        let ids = self.core.words.get(keyword);
        let keys = self.core.rank(ids, |_| 0, |h| h.matches_metadata(required));
        self.delete_batch(keys)
    }

    pub fn delete_all_with_prefix_and_metadata(
        &mut self,
        prefix: &str,
        required: &HashMap<String, String>,
    ) -> Result<HashSet<DocKey>> {
        let ids = self.core.words.get_all_with_prefix(prefix);
        let keys = self.core.rank(ids, |_| 0, |h| h.matches_metadata(required));
        self.delete_batch(keys)
    }

    // A failure part-way still logs the deletes that happened.
    fn delete_batch(&mut self, keys: Vec<DocKey>) -> Result<HashSet<DocKey>> {
        let mut batch = UndoBatch::new();
        let mut removed = HashSet::with_capacity(keys.len());
        let mut failure = None;

        for key in keys {
            match self.core.replace(&key, None) {
                Ok(previous) => {
                    if batch.add(UndoAction::new(key.clone(), Reversal::Replace { previous })).is_ok() {
                        removed.insert(key);
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.core.counters.writes += removed.len() as u64;
        self.undo.push_batch(batch);
        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Undo the most recent mutation. Returns false if a restore was skipped
    /// because the document no longer fits the byte limit.
    pub fn undo(&mut self) -> Result<bool> {
        let result = self.undo.undo_last(&mut self.core);
        self.core.enforce_budget()?;
        result
    }

    /// Undo the most recent mutation of `key`, leaving every other entry in
    /// place. Inside a batch only `key`'s part is undone.
    pub fn undo_key(&mut self, key: &str) -> Result<bool> {
        let key = DocKey::new(key)?;
        let result = self.undo.undo_target(&key, &mut self.core);
        self.core.enforce_budget()?;
        result
    }

    pub fn set_max_document_count(&mut self, limit: usize) -> Result<()> {
        self.core.budget.set_max_count(limit)?;
        self.core.enforce_budget()
    }

    pub fn set_max_document_bytes(&mut self, limit: usize) -> Result<()> {
        self.core.budget.set_max_bytes(limit)?;
        self.core.enforce_budget()
    }

    pub fn contains(&self, key: &str) -> bool {
        DocKey::new(key).is_ok_and(|key| self.core.handles.id_of(&key).is_some())
    }

    /// `Some(false)` when the document exists but is tiered out.
    pub fn is_resident(&self, key: &str) -> Option<bool> {
        let key = DocKey::new(key).ok()?;
        self.core.handles.by_key(&key).map(|h| h.resident)
    }

    /// Live documents, resident or not.
    pub fn len(&self) -> usize {
        self.core.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.handles.is_empty()
    }

    pub fn resident_count(&self) -> usize {
        self.core.budget.resident_count
    }

    pub fn resident_bytes(&self) -> usize {
        self.core.budget.resident_bytes
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn stats(&self) -> StoreStats {
        let budget = &self.core.budget;
        let counters = self.core.counters;
        StoreStats {
            uptime_secs: self.started.elapsed().as_secs(),
            start_time: self.start_time,
            live_documents: self.len(),
            tree_slots: self.core.docs.len(),
            tree_height: self.core.docs.height(),
            memory: ResidencyStats {
                resident_documents: budget.resident_count,
                resident_bytes: budget.resident_bytes,
                tiered_out_documents: self.len().saturating_sub(budget.resident_count),
                max_document_count: budget.max_count,
                max_document_bytes: budget.max_bytes,
            },
            undo_depth: self.undo.len(),
            reads: counters.reads,
            writes: counters.writes,
            evictions: counters.evictions,
            promotions: counters.promotions,
        }
    }
}

fn check_field(field: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(Error::invalid_argument("metadata field must not be blank"));
    }
    Ok(())
}

impl StoreCore {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn build_document(&self, key: DocKey, bytes: &[u8], format: DocumentFormat) -> Result<Document> {
        match format {
            DocumentFormat::Txt => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| Error::invalid_argument(format!("text for {} is not valid UTF-8", key)))?;
                let counts = self.tokenizer.word_counts(&text);
                Document::text(key, text, counts)
            }
            DocumentFormat::Binary => Document::binary(key, bytes.to_vec()),
        }
    }

    /// Swap the document at `key` for `doc` (or a tombstone) and move the
    /// handle, word index and heap over. The tree write comes first: it is
    /// the only step that can touch the backing store.
    fn replace(&mut self, key: &DocKey, mut doc: Option<Document>) -> Result<Option<Document>> {
        let stamp = self.tick();
        if let Some(doc) = doc.as_mut() {
            doc.set_last_used(stamp);
        }
        let handle = doc.as_ref().map(DocHandle::for_document);

        let previous = self.docs.put(key.clone(), doc)?;
        self.forget(key);
        if let Some(handle) = handle {
            self.adopt(handle, stamp);
        }
        Ok(previous)
    }

    fn forget(&mut self, key: &DocKey) -> Option<DocHandle> {
        let (id, handle) = self.handles.remove(key)?;
        for word in handle.word_counts.keys() {
            self.words.delete(word, &id);
        }
        if handle.resident {
            self.heap.remove(id);
            self.budget.release(handle.byte_len);
        }
        Some(handle)
    }

    fn adopt(&mut self, handle: DocHandle, stamp: u64) -> HandleId {
        let words: Vec<String> = handle.word_counts.keys().cloned().collect();
        let bytes = handle.byte_len;
        let id = self.handles.insert(handle);
        for word in &words {
            self.words.put(word, id);
        }
        self.heap.insert(id, stamp);
        self.budget.admit(bytes);
        id
    }

    /// Run `f` on the live document at `key`, touching it: the last-used
    /// stamp moves forward and a tiered-out document comes back into memory,
    /// unless it is bigger than the byte limit, in which case it goes
    /// straight back out. `None` when there is no live document.
    fn with_document<T, F>(&mut self, key: &DocKey, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let Some(id) = self.handles.id_of(key) else {
            return Ok(None);
        };
        let stamp = self.tick();
        let Some(doc) = self.docs.get_mut(key)? else {
            return Ok(None);
        };
        doc.set_last_used(stamp);
        let result = f(doc);

        if let Some(handle) = self.handles.get_mut(id) {
            if handle.resident {
                self.heap.re_heapify(id, stamp);
            } else if self.budget.fits(handle.byte_len) {
                handle.resident = true;
                self.heap.insert(id, stamp);
                self.budget.admit(handle.byte_len);
                self.counters.promotions += 1;
                debug!(key = %key, bytes = handle.byte_len, "document promoted");
            } else {
                self.docs.move_to_disk(key)?;
            }
        }
        result.map(Some)
    }

    fn sync_metadata(&mut self, key: &DocKey, metadata: HashMap<String, String>) {
        if let Some(handle) = self.handles.by_key_mut(key) {
            handle.metadata = metadata;
        }
    }

    /// Keys of `ids` passing `keep`, highest score first, ties by key.
    fn rank<S, F>(&self, ids: HashSet<HandleId>, score: S, keep: F) -> Vec<DocKey>
    where
        S: Fn(&DocHandle) -> u32,
        F: Fn(&DocHandle) -> bool,
    {
        let mut scored: Vec<(u32, &DocKey)> = ids
            .into_iter()
            .filter_map(|id| self.handles.get(id))
            .filter(|&handle| keep(handle))
            .map(|handle| (score(handle), &handle.key))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored.into_iter().map(|(_, key)| key.clone()).collect()
    }

    fn keys_with_metadata(&self, required: &HashMap<String, String>) -> Vec<DocKey> {
        if required.is_empty() {
            return Vec::new();
        }
        let mut keys: Vec<DocKey> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.matches_metadata(required))
            .map(|(_, handle)| handle.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Load each key in turn, re-checking the caps after every one.
    fn materialize(&mut self, keys: Vec<DocKey>) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(doc) = self.with_document(&key, |doc| Ok(doc.clone()))? {
                docs.push(doc);
            }
            self.counters.reads += 1;
            self.enforce_budget()?;
        }
        Ok(docs)
    }

    /// Evict least recently used documents until both caps hold, count cap
    /// first.
    fn enforce_budget(&mut self) -> Result<()> {
        while self.budget.over_count() && self.evict_one()? {}
        while self.budget.over_bytes() && self.evict_one()? {}
        Ok(())
    }

    // The victim is written out before the heap or its handle change, so a
    // failed write leaves it resident.
    fn evict_one(&mut self) -> Result<bool> {
        let Some(id) = self.heap.peek_min() else {
            return Ok(false);
        };
        let Some(handle) = self.handles.get_mut(id) else {
            self.heap.remove(id);
            return Ok(true);
        };

        self.docs.move_to_disk(&handle.key)?;
        self.heap.remove_min();
        handle.resident = false;
        self.budget.release(handle.byte_len);
        self.counters.evictions += 1;
        debug!(key = %handle.key, bytes = handle.byte_len, "document tiered out");
        Ok(true)
    }
}

impl Revert<DocKey, Reversal> for StoreCore {
    fn revert(&mut self, target: &DocKey, reversal: Reversal) -> Result<bool> {
        match reversal {
            Reversal::Replace { previous } => {
                if let Some(doc) = &previous {
                    if !self.budget.fits(doc.byte_len()) {
                        warn!(key = %target, bytes = doc.byte_len(), "undo skipped, document exceeds the byte limit");
                        return Ok(false);
                    }
                }
                let restored = previous.is_some();
                self.replace(target, previous)?;
                debug!(key = %target, restored, "undo replaced document");
                Ok(true)
            }
            Reversal::SetMetadata { field, previous } => {
                let metadata = self.with_document(target, |doc| {
                    match &previous {
                        Some(value) => {
                            doc.set_metadata_value(&field, value)?;
                        }
                        None => {
                            doc.remove_metadata_value(&field);
                        }
                    }
                    Ok(doc.metadata().clone())
                })?;
                let Some(metadata) = metadata else {
                    return Ok(false);
                };
                self.sync_metadata(target, metadata);
                debug!(key = %target, field = %field, "undo restored metadata");
                Ok(true)
            }
        }
    }
}

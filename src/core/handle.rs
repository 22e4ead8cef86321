use std::collections::HashMap;
use crate::core::types::{DocKey, Document};

/// Stable reference to a handle slot. The generation makes a stale id from a
/// deleted key miss instead of aliasing whichever handle reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId {
    index: u32,
    generation: u32,
}

/// Per-key residency record with cached copies of the document's word counts
/// and metadata, so ranking and filtering never load tiered-out content.
#[derive(Debug, Clone)]
pub struct DocHandle {
    pub key: DocKey,
    pub resident: bool,
    pub byte_len: usize,
    pub word_counts: HashMap<String, u32>,
    pub metadata: HashMap<String, String>,
}

impl DocHandle {
    pub fn for_document(doc: &Document) -> Self {
        DocHandle {
            key: doc.key().clone(),
            resident: true,
            byte_len: doc.byte_len(),
            word_counts: doc.word_counts().cloned().unwrap_or_default(),
            metadata: doc.metadata().clone(),
        }
    }

    /// Exact occurrence count of an indexed word.
    pub fn count(&self, word: &str) -> u32 {
        self.word_counts.get(word).copied().unwrap_or(0)
    }

    /// Summed counts of every word starting with `prefix`.
    pub fn prefix_count(&self, prefix: &str) -> u32 {
        self.word_counts
            .iter()
            .filter(|(word, _)| word.starts_with(prefix))
            .map(|(_, count)| count)
            .sum()
    }

    /// Every required pair must be present with an equal value. An empty
    /// requirement matches nothing.
    pub fn matches_metadata(&self, required: &HashMap<String, String>) -> bool {
        !required.is_empty()
            && required
                .iter()
                .all(|(field, value)| self.metadata.get(field) == Some(value))
    }
}

struct Slot {
    generation: u32,
    handle: Option<DocHandle>,
}

/// Arena of handles, one per live key, addressed by key or by [`HandleId`].
#[derive(Default)]
pub struct HandleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<DocKey, HandleId>,
}

impl HandleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Register `handle` for its key. The caller removes any existing handle
    /// for that key first.
    pub fn insert(&mut self, handle: DocHandle) -> HandleId {
        let key = handle.key.clone();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.handle = Some(handle);
                HandleId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, handle: Some(handle) });
                HandleId { index, generation: 0 }
            }
        };
        self.index.insert(key, id);
        id
    }

    pub fn remove(&mut self, key: &DocKey) -> Option<(HandleId, DocHandle)> {
        let id = self.index.remove(key)?;
        let handle = self.slots[id.index as usize].handle.take()?;
        self.free.push(id.index);
        Some((id, handle))
    }

    pub fn id_of(&self, key: &DocKey) -> Option<HandleId> {
        self.index.get(key).copied()
    }

    pub fn get(&self, id: HandleId) -> Option<&DocHandle> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.handle.as_ref()
    }

    pub fn get_mut(&mut self, id: HandleId) -> Option<&mut DocHandle> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.handle.as_mut()
    }

    pub fn by_key(&self, key: &DocKey) -> Option<&DocHandle> {
        self.get(self.id_of(key)?)
    }

    pub fn by_key_mut(&mut self, key: &DocKey) -> Option<&mut DocHandle> {
        let id = self.id_of(key)?;
        self.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HandleId, &DocHandle)> {
        self.index
            .values()
            .filter_map(|&id| self.get(id).map(|handle| (id, handle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(key: &str, text: &str) -> DocHandle {
        let counts = text.split_whitespace().fold(HashMap::new(), |mut m, w| {
            *m.entry(w.to_string()).or_insert(0) += 1;
            m
        });
        let doc = Document::text(DocKey::new(key).unwrap(), text.to_string(), counts).unwrap();
        DocHandle::for_document(&doc)
    }

    #[test]
    fn stale_ids_miss_after_slot_reuse() {
        let mut arena = HandleArena::new();
        let a = arena.insert(handle("a", "x"));
        arena.remove(&DocKey::new("a").unwrap()).unwrap();
        let b = arena.insert(handle("b", "y"));

        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().key.as_str(), "b");
        assert_eq!(arena.len(), 1);
        assert!(arena.id_of(&DocKey::new("a").unwrap()).is_none());
    }

    #[test]
    fn counts_and_metadata_matching() {
        let mut h = handle("k", "Hello Help Hello World");
        assert_eq!(h.count("Hello"), 2);
        assert_eq!(h.count("Hel"), 0);
        assert_eq!(h.prefix_count("Hel"), 3);

        h.metadata.insert("author".into(), "ann".into());
        let mut required = HashMap::new();
        assert!(!h.matches_metadata(&required));
        required.insert("author".to_string(), "ann".to_string());
        assert!(h.matches_metadata(&required));
        required.insert("year".to_string(), "2020".to_string());
        assert!(!h.matches_metadata(&required));
    }
}

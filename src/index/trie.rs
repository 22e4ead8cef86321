use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use crate::analysis::tokenizer::normalize_word;

/// Multi-map from word to a set of values, with prefix-subtree queries.
///
/// Words are normalized to their alphanumeric characters on the way in, but
/// every lookup walks the query exactly as given: a query containing
/// punctuation never reaches a stored word. Matching is case sensitive.
pub struct WordIndex<V> {
    root: TrieNode<V>,
}

struct TrieNode<V> {
    values: HashSet<V>,
    children: BTreeMap<char, TrieNode<V>>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        TrieNode {
            values: HashSet::new(),
            children: BTreeMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }
}

impl<V: Eq + Hash + Clone> TrieNode<V> {
    fn collect_into(&self, out: &mut HashSet<V>) {
        out.extend(self.values.iter().cloned());
        for child in self.children.values() {
            child.collect_into(out);
        }
    }

    fn into_values(self, out: &mut HashSet<V>) {
        out.extend(self.values);
        for (_, child) in self.children {
            child.into_values(out);
        }
    }
}

impl<V: Eq + Hash + Clone> WordIndex<V> {
    pub fn new() -> Self {
        WordIndex { root: TrieNode::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Add `value` under the alphanumeric form of `word`. Words with no
    /// alphanumeric characters are ignored.
    pub fn put(&mut self, word: &str, value: V) {
        let word = normalize_word(word);
        if word.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for c in word.chars() {
            node = node.children.entry(c).or_insert_with(TrieNode::new);
        }
        node.values.insert(value);
    }

    /// Values stored at exactly `word`.
    pub fn get(&self, word: &str) -> HashSet<V> {
        self.node(word)
            .map(|node| node.values.clone())
            .unwrap_or_default()
    }

    pub fn get_sorted<F>(&self, word: &str, compare: F) -> Vec<V>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut values: Vec<V> = match self.node(word) {
            Some(node) => node.values.iter().cloned().collect(),
            None => return Vec::new(),
        };
        values.sort_by(compare);
        values
    }

    /// Union of the values at `prefix` and everywhere beneath it.
    pub fn get_all_with_prefix(&self, prefix: &str) -> HashSet<V> {
        let mut values = HashSet::new();
        if let Some(node) = self.node(prefix) {
            node.collect_into(&mut values);
        }
        values
    }

    pub fn get_all_with_prefix_sorted<F>(&self, prefix: &str, compare: F) -> Vec<V>
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut values: Vec<V> = self.get_all_with_prefix(prefix).into_iter().collect();
        values.sort_by(compare);
        values
    }

    /// Remove one value from `word`'s node, pruning nodes left empty.
    pub fn delete(&mut self, word: &str, value: &V) -> Option<V> {
        let path = Self::path(word)?;
        Self::delete_at(&mut self.root, &path, value)
    }

    /// Clear `word`'s node, pruning it if nothing remains beneath it.
    pub fn delete_all(&mut self, word: &str) -> HashSet<V> {
        match Self::path(word) {
            Some(path) => Self::clear_at(&mut self.root, &path),
            None => HashSet::new(),
        }
    }

    /// Detach the whole subtree at `prefix`, returning every value it held.
    pub fn delete_all_with_prefix(&mut self, prefix: &str) -> HashSet<V> {
        let mut removed = HashSet::new();
        if let Some(path) = Self::path(prefix) {
            if let Some(subtree) = Self::detach(&mut self.root, &path) {
                subtree.into_values(&mut removed);
            }
        }
        removed
    }

    /// Blank words address nothing.
    fn path(word: &str) -> Option<Vec<char>> {
        if word.trim().is_empty() {
            None
        } else {
            Some(word.chars().collect())
        }
    }

    fn node(&self, word: &str) -> Option<&TrieNode<V>> {
        let path = Self::path(word)?;
        let mut node = &self.root;
        for c in path {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    fn delete_at(node: &mut TrieNode<V>, path: &[char], value: &V) -> Option<V> {
        match path.split_first() {
            None => node.values.take(value),
            Some((c, rest)) => {
                let child = node.children.get_mut(c)?;
                let removed = Self::delete_at(child, rest, value);
                if child.is_empty() {
                    node.children.remove(c);
                }
                removed
            }
        }
    }

    fn clear_at(node: &mut TrieNode<V>, path: &[char]) -> HashSet<V> {
        match path.split_first() {
            None => std::mem::take(&mut node.values),
            Some((c, rest)) => {
                let Some(child) = node.children.get_mut(c) else {
                    return HashSet::new();
                };
                let removed = Self::clear_at(child, rest);
                if child.is_empty() {
                    node.children.remove(c);
                }
                removed
            }
        }
    }

    fn detach(node: &mut TrieNode<V>, path: &[char]) -> Option<TrieNode<V>> {
        let (c, rest) = path.split_first()?;
        if rest.is_empty() {
            return node.children.remove(c);
        }
        let child = node.children.get_mut(c)?;
        let detached = Self::detach(child, rest);
        if child.is_empty() {
            node.children.remove(c);
        }
        detached
    }
}

impl<V: Eq + Hash + Clone> Default for WordIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> WordIndex<u32> {
        let mut index = WordIndex::new();
        index.put("Hello", 1);
        index.put("Hello", 2);
        index.put("Help", 3);
        index.put("Helpful", 4);
        index.put("World", 1);
        index
    }

    #[test]
    fn put_filters_punctuation_but_lookups_do_not() {
        let mut index = WordIndex::new();
        index.put("Hello!", 7);
        assert_eq!(index.get("Hello"), HashSet::from([7]));
        assert!(index.get("Hello!").is_empty());
        assert!(index.get("hello").is_empty());
    }

    #[test]
    fn blank_words_are_ignored() {
        let mut index = index();
        index.put("  ", 9);
        index.put("?!", 9);
        assert!(index.get("").is_empty());
        assert!(index.get_all_with_prefix(" ").is_empty());
        assert!(index.delete_all_with_prefix("").is_empty());
        assert_eq!(index.get("Hello").len(), 2);
    }

    #[test]
    fn sorted_lookups_use_the_caller_comparator() {
        let index = index();
        assert_eq!(index.get_sorted("Hello", |a, b| b.cmp(a)), vec![2, 1]);
        assert_eq!(
            index.get_all_with_prefix_sorted("Hel", |a, b| a.cmp(b)),
            vec![1, 2, 3, 4]
        );
        assert!(index.get_sorted("Nope", |a, b| a.cmp(b)).is_empty());
    }

    #[test]
    fn delete_prunes_empty_branches_only() {
        let mut index = index();
        assert_eq!(index.delete("Helpful", &4), Some(4));
        assert_eq!(index.delete("Helpful", &4), None);
        assert!(index.node("Helpf").is_none(), "dead branch pruned");
        assert_eq!(index.get("Help"), HashSet::from([3]));

        assert_eq!(index.delete("Help", &3), Some(3));
        assert!(index.node("Help").is_none());
        assert!(index.node("Hel").is_some(), "still leads to Hello");
    }

    #[test]
    fn delete_all_keeps_descendants() {
        let mut index = index();
        assert_eq!(index.delete_all("Help"), HashSet::from([3]));
        assert!(index.get("Help").is_empty());
        assert_eq!(index.get("Helpful"), HashSet::from([4]));
        assert!(index.delete_all("Nope").is_empty());
    }

    #[test]
    fn delete_all_with_prefix_removes_the_subtree() {
        let mut index = index();
        assert_eq!(index.delete_all_with_prefix("Hel"), HashSet::from([1, 2, 3, 4]));
        assert!(index.get_all_with_prefix("H").is_empty());
        assert_eq!(index.get("World"), HashSet::from([1]));

        index.delete_all_with_prefix("World");
        assert!(index.is_empty());
    }
}

use std::fmt::Debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::persistence::PersistenceManager;

pub const DEFAULT_ORDER: usize = 4;

/// Ordered map whose leaf values can be tiered out to a
/// [`PersistenceManager`] without changing the tree's shape.
///
/// A leaf slot holding `None` is a tombstone: the value is either on disk or
/// logically deleted. The tree does not tell the two apart; reading a
/// tombstone always asks the backing store, and a miss there means
/// "deleted". Slots are never removed once created.
pub struct TieredBTree<K, V> {
    root: Node<K, V>,
    height: usize,
    order: usize,
    len: usize,
    persistence: Option<Box<dyn PersistenceManager<K, V>>>,
}

enum Node<K, V> {
    Leaf(Vec<LeafEntry<K, V>>),
    Internal(Vec<ChildEntry<K, V>>),
}

struct LeafEntry<K, V> {
    key: K,
    value: Option<V>,
}

// key = smallest key in `child`'s subtree
struct ChildEntry<K, V> {
    key: K,
    child: Box<Node<K, V>>,
}

impl<K, V> Node<K, V> {
    fn len(&self) -> usize {
        match self {
            Node::Leaf(entries) => entries.len(),
            Node::Internal(children) => children.len(),
        }
    }
}

impl<K: Ord + Clone + Debug, V> Node<K, V> {
    /// Split in half by position. Returns the separator (the new right
    /// node's smallest key) and the right node.
    fn split(&mut self) -> (K, Node<K, V>) {
        match self {
            Node::Leaf(entries) => {
                let right = entries.split_off(entries.len() / 2);
                (right[0].key.clone(), Node::Leaf(right))
            }
            Node::Internal(children) => {
                let right = children.split_off(children.len() / 2);
                (right[0].key.clone(), Node::Internal(right))
            }
        }
    }

    fn first_key(&self) -> &K {
        match self {
            Node::Leaf(entries) => &entries[0].key,
            Node::Internal(children) => &children[0].key,
        }
    }
}

/// Child to descend into: the last entry whose key is <= `key`, or the first.
fn child_index<K: Ord, V>(children: &[ChildEntry<K, V>], key: &K) -> usize {
    children.partition_point(|c| c.key <= *key).saturating_sub(1)
}

impl<K: Ord + Clone + Debug, V> TieredBTree<K, V> {
    /// `order` is the most entries a node may hold; it must be even and > 2.
    pub fn new(order: usize) -> Result<Self> {
        if order <= 2 || order % 2 != 0 {
            return Err(Error::invalid_argument(format!(
                "B-tree order must be even and greater than 2, got {}",
                order
            )));
        }
        Ok(TieredBTree {
            root: Node::Leaf(Vec::new()),
            height: 0,
            order,
            len: 0,
            persistence: None,
        })
    }

    pub fn set_persistence_manager(&mut self, persistence: Box<dyn PersistenceManager<K, V>>) {
        self.persistence = Some(persistence);
    }

    /// Slots in the tree, tombstones included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&mut self, key: &K) -> Result<Option<&V>> {
        Ok(self.get_mut(key)?.map(|value| &*value))
    }

    /// Resident value for `key`. A tombstone is resolved against the backing
    /// store: a durable copy is loaded back into the slot and deleted from
    /// disk; no durable copy means the key is gone.
    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        let Some(entry) = Self::find_mut(&mut self.root, key) else {
            return Ok(None);
        };
        if entry.value.is_none() {
            entry.value = Self::load(&mut self.persistence, key)?;
        }
        Ok(entry.value.as_mut())
    }

    /// `Some(true)` for a tombstoned slot, `Some(false)` for a resident one,
    /// `None` when the key never had a slot. Never touches the backing store.
    pub fn is_tombstone(&self, key: &K) -> Option<bool> {
        Self::find(&self.root, key).map(|entry| entry.value.is_none())
    }

    /// Insert or replace. Replacing returns the previous value (loading it
    /// first if the slot was tombstoned); `None` as the new value tombstones
    /// the slot, which is how logical deletes are written. A tombstone for a
    /// key with no slot is a no-op.
    pub fn put(&mut self, key: K, value: Option<V>) -> Result<Option<V>> {
        if let Some(entry) = Self::find_mut(&mut self.root, &key) {
            if entry.value.is_none() {
                entry.value = Self::load(&mut self.persistence, &key)?;
            }
            return Ok(std::mem::replace(&mut entry.value, value));
        }

        let Some(value) = value else {
            return Ok(None);
        };

        if let Some((separator, sibling)) = Self::insert(&mut self.root, key, value, self.order) {
            // Root split: the tree grows one level
            let old_root = std::mem::replace(&mut self.root, Node::Leaf(Vec::new()));
            let left_key = old_root.first_key().clone();
            self.root = Node::Internal(vec![
                ChildEntry { key: left_key, child: Box::new(old_root) },
                ChildEntry { key: separator, child: Box::new(sibling) },
            ]);
            self.height += 1;
        }
        self.len += 1;
        Ok(None)
    }

    /// Write the resident value for `key` to the backing store and leave a
    /// tombstone in its slot. Already tombstoned → no-op.
    pub fn move_to_disk(&mut self, key: &K) -> Result<()> {
        let entry = Self::find_mut(&mut self.root, key)
            .ok_or_else(|| Error::not_found(format!("no entry for {:?}", key)))?;
        let Some(value) = entry.value.as_ref() else {
            return Ok(());
        };

        let persistence = self.persistence.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::NoPersistenceBackend, format!("cannot move {:?} to disk", key))
        })?;
        persistence.serialize(key, value)?;
        entry.value = None;
        Ok(())
    }

    /// Every key with a slot, in order.
    pub fn keys(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len);
        Self::collect_keys(&self.root, &mut keys);
        keys
    }

    fn collect_keys<'a>(node: &'a Node<K, V>, out: &mut Vec<&'a K>) {
        match node {
            Node::Leaf(entries) => out.extend(entries.iter().map(|e| &e.key)),
            Node::Internal(children) => {
                for child in children {
                    Self::collect_keys(&child.child, out);
                }
            }
        }
    }

    fn load(
        persistence: &mut Option<Box<dyn PersistenceManager<K, V>>>,
        key: &K,
    ) -> Result<Option<V>> {
        let persistence = persistence.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::NoPersistenceBackend, format!("cannot resolve tombstone for {:?}", key))
        })?;

        match persistence.deserialize(key) {
            Ok(value) => {
                // The in-memory copy is authoritative again
                persistence.delete(key)?;
                Ok(Some(value))
            }
            Err(e) if e.kind == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find<'a>(node: &'a Node<K, V>, key: &K) -> Option<&'a LeafEntry<K, V>> {
        match node {
            Node::Leaf(entries) => entries
                .binary_search_by(|e| e.key.cmp(key))
                .ok()
                .map(|i| &entries[i]),
            Node::Internal(children) => {
                let i = child_index(children, key);
                Self::find(&children[i].child, key)
            }
        }
    }

    fn find_mut<'a>(node: &'a mut Node<K, V>, key: &K) -> Option<&'a mut LeafEntry<K, V>> {
        match node {
            Node::Leaf(entries) => match entries.binary_search_by(|e| e.key.cmp(key)) {
                Ok(i) => Some(&mut entries[i]),
                Err(_) => None,
            },
            Node::Internal(children) => {
                let i = child_index(children, key);
                Self::find_mut(&mut children[i].child, key)
            }
        }
    }

    /// Recursive insert of a key known to be absent. Returns the separator
    /// and new right sibling when `node` had to split.
    fn insert(node: &mut Node<K, V>, key: K, value: V, order: usize) -> Option<(K, Node<K, V>)> {
        match node {
            Node::Leaf(entries) => {
                let at = entries.partition_point(|e| e.key < key);
                entries.insert(at, LeafEntry { key, value: Some(value) });
            }
            Node::Internal(children) => {
                let i = child_index(children, &key);
                if key < children[i].key {
                    // New subtree minimum (only possible at i == 0)
                    children[i].key = key.clone();
                }
                if let Some((separator, sibling)) = Self::insert(&mut children[i].child, key, value, order) {
                    children.insert(i + 1, ChildEntry { key: separator, child: Box::new(sibling) });
                }
            }
        }

        if node.len() > order {
            Some(node.split())
        } else {
            None
        }
    }
}

impl<K: Ord + Clone + Debug, V> Default for TieredBTree<K, V> {
    fn default() -> Self {
        TieredBTree {
            root: Node::Leaf(Vec::new()),
            height: 0,
            order: DEFAULT_ORDER,
            len: 0,
            persistence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use parking_lot::Mutex;

    /// Backing store whose records stay visible to the test after the tree
    /// takes ownership of the box.
    #[derive(Clone, Default)]
    struct SharedDisk(Arc<Mutex<HashMap<u32, String>>>);

    impl PersistenceManager<u32, String> for SharedDisk {
        fn serialize(&mut self, key: &u32, value: &String) -> Result<()> {
            self.0.lock().insert(*key, value.clone());
            Ok(())
        }

        fn deserialize(&mut self, key: &u32) -> Result<String> {
            self.0.lock().get(key).cloned().ok_or_else(|| Error::not_found("missing"))
        }

        fn delete(&mut self, key: &u32) -> Result<bool> {
            Ok(self.0.lock().remove(key).is_some())
        }
    }

    fn tree_with_disk() -> (TieredBTree<u32, String>, SharedDisk) {
        let disk = SharedDisk::default();
        let mut tree = TieredBTree::new(4).unwrap();
        tree.set_persistence_manager(Box::new(disk.clone()));
        (tree, disk)
    }

    fn check_node(node: &Node<u32, String>, order: usize) -> (u32, usize) {
        assert!(node.len() <= order);
        match node {
            Node::Leaf(entries) => {
                assert!(entries.windows(2).all(|w| w[0].key < w[1].key));
                (entries[0].key, 0)
            }
            Node::Internal(children) => {
                assert!(children.windows(2).all(|w| w[0].key < w[1].key));
                let mut depth = None;
                for child in children {
                    let (min, d) = check_node(&child.child, order);
                    assert_eq!(child.key, min, "separator must be the subtree minimum");
                    assert_eq!(*depth.get_or_insert(d), d, "leaves at uneven depth");
                }
                (children[0].key, depth.unwrap() + 1)
            }
        }
    }

    #[test]
    fn rejects_odd_or_tiny_orders() {
        assert!(TieredBTree::<u32, u32>::new(3).is_err());
        assert!(TieredBTree::<u32, u32>::new(2).is_err());
        assert!(TieredBTree::<u32, u32>::new(6).is_ok());
    }

    #[test]
    fn scattered_inserts_keep_the_tree_balanced_and_ordered() {
        let mut tree = TieredBTree::new(4).unwrap();
        // 37 is coprime with 1000, so this visits every key once out of order
        let keys: Vec<u32> = (0..1000).map(|i| (i * 37) % 1000).collect();
        for &k in &keys {
            assert_eq!(tree.put(k, Some(format!("v{}", k))).unwrap(), None);
        }

        assert_eq!(tree.len(), 1000);
        assert!(tree.height() >= 4);
        let (_, depth) = check_node(&tree.root, 4);
        assert_eq!(depth, tree.height());
        let collected: Vec<u32> = tree.keys().into_iter().copied().collect();
        assert_eq!(collected, (0..1000).collect::<Vec<_>>());

        for k in [0, 1, 499, 998, 999] {
            assert_eq!(tree.get(&k).unwrap(), Some(&format!("v{}", k)));
        }
        assert_eq!(tree.get(&1000).unwrap(), None);
    }

    #[test]
    fn descending_inserts_refresh_the_leftmost_separators() {
        let mut tree = TieredBTree::new(4).unwrap();
        for k in (0..200u32).rev() {
            tree.put(k, Some(k.to_string())).unwrap();
        }
        check_node(&tree.root, 4);
        assert_eq!(tree.get(&0).unwrap(), Some(&"0".to_string()));
    }

    #[test]
    fn replace_returns_old_value_in_place() {
        let mut tree = TieredBTree::new(4).unwrap();
        tree.put(1, Some("a".to_string())).unwrap();
        assert_eq!(tree.put(1, Some("b".to_string())).unwrap(), Some("a".to_string()));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&1).unwrap(), Some(&"b".to_string()));
    }

    #[test]
    fn move_to_disk_and_back() {
        let (mut tree, disk) = tree_with_disk();
        for k in 0..20 {
            tree.put(k, Some(format!("v{}", k))).unwrap();
        }

        tree.move_to_disk(&7).unwrap();
        assert_eq!(tree.is_tombstone(&7), Some(true));
        assert_eq!(disk.0.lock().get(&7), Some(&"v7".to_string()));
        // Second move is a no-op
        tree.move_to_disk(&7).unwrap();

        assert_eq!(tree.get(&7).unwrap(), Some(&"v7".to_string()));
        assert_eq!(tree.is_tombstone(&7), Some(false));
        assert!(disk.0.lock().is_empty(), "loading deletes the durable copy");
        assert_eq!(tree.len(), 20);
    }

    #[test]
    fn tombstone_without_durable_copy_reads_as_deleted() {
        let (mut tree, _disk) = tree_with_disk();
        tree.put(3, Some("x".to_string())).unwrap();
        assert_eq!(tree.put(3, None).unwrap(), Some("x".to_string()));

        assert_eq!(tree.get(&3).unwrap(), None);
        assert_eq!(tree.is_tombstone(&3), Some(true));
        assert_eq!(tree.len(), 1, "deleted slots are kept");

        // Reviving the slot reuses it
        assert_eq!(tree.put(3, Some("y".to_string())).unwrap(), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn replacing_a_tiered_out_value_returns_the_durable_copy() {
        let (mut tree, disk) = tree_with_disk();
        tree.put(5, Some("old".to_string())).unwrap();
        tree.move_to_disk(&5).unwrap();

        assert_eq!(tree.put(5, Some("new".to_string())).unwrap(), Some("old".to_string()));
        assert!(disk.0.lock().is_empty());
    }

    #[test]
    fn tombstone_for_unknown_key_is_a_no_op() {
        let mut tree: TieredBTree<u32, String> = TieredBTree::new(4).unwrap();
        assert_eq!(tree.put(9, None).unwrap(), None);
        assert!(tree.is_empty());
        assert_eq!(tree.is_tombstone(&9), None);
    }

    #[test]
    fn missing_backend_and_unknown_keys_are_errors() {
        let mut tree = TieredBTree::new(4).unwrap();
        tree.put(1, Some("a".to_string())).unwrap();

        let err = tree.move_to_disk(&1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoPersistenceBackend);

        tree.put(1, None).unwrap();
        assert_eq!(tree.get(&1).unwrap_err().kind, ErrorKind::NoPersistenceBackend);

        let (mut tree, _disk) = tree_with_disk();
        assert_eq!(tree.move_to_disk(&42).unwrap_err().kind, ErrorKind::NotFound);
    }
}

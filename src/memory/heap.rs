/// Binary min-heap of resident items ordered by last-used stamp, so the root
/// is always the least recently used item.
///
/// Slot 0 is unused; children of slot `i` live at `2i` and `2i + 1`. The heap
/// holds its own copy of each item's stamp, refreshed through
/// [`EvictionHeap::re_heapify`].
pub struct EvictionHeap<T> {
    elements: Vec<Option<HeapEntry<T>>>,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry<T> {
    item: T,
    last_used: u64,
}

impl<T: Copy + PartialEq> EvictionHeap<T> {
    const INITIAL_CAPACITY: usize = 8;

    pub fn new() -> Self {
        EvictionHeap {
            elements: vec![None; Self::INITIAL_CAPACITY],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn contains(&self, item: T) -> bool {
        self.position(item).is_some()
    }

    pub fn insert(&mut self, item: T, last_used: u64) {
        if self.count + 1 >= self.elements.len() {
            self.double_capacity();
        }
        self.count += 1;
        self.elements[self.count] = Some(HeapEntry { item, last_used });
        self.up_heap(self.count);
    }

    /// Least recently used item, without removing it.
    pub fn peek_min(&self) -> Option<T> {
        self.entry(1).map(|e| e.item)
    }

    pub fn remove_min(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.remove_at(1).map(|e| e.item)
    }

    /// Give `item` a new stamp and restore heap order around it. Returns
    /// false when the item is not in the heap.
    pub fn re_heapify(&mut self, item: T, last_used: u64) -> bool {
        let Some(index) = self.position(item) else {
            return false;
        };
        if let Some(entry) = self.elements[index].as_mut() {
            entry.last_used = last_used;
        }
        let index = self.up_heap(index);
        self.down_heap(index);
        true
    }

    /// Drop `item` from the heap wherever it sits.
    pub fn remove(&mut self, item: T) -> bool {
        match self.position(item) {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    fn remove_at(&mut self, index: usize) -> Option<HeapEntry<T>> {
        self.swap(index, self.count);
        let removed = self.elements[self.count].take();
        self.count -= 1;
        if index <= self.count {
            let index = self.up_heap(index);
            self.down_heap(index);
        }
        removed
    }

    // Linear scan; the heap only ever holds the resident set.
    fn position(&self, item: T) -> Option<usize> {
        (1..=self.count).find(|&i| self.entry(i).is_some_and(|e| e.item == item))
    }

    fn entry(&self, index: usize) -> Option<&HeapEntry<T>> {
        if index == 0 || index > self.count {
            return None;
        }
        self.elements[index].as_ref()
    }

    fn stamp(&self, index: usize) -> u64 {
        self.entry(index).map_or(u64::MAX, |e| e.last_used)
    }

    fn is_greater(&self, i: usize, j: usize) -> bool {
        self.stamp(i) > self.stamp(j)
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.elements.swap(i, j);
    }

    /// Returns the slot the element settled in.
    fn up_heap(&mut self, mut k: usize) -> usize {
        while k > 1 && self.is_greater(k / 2, k) {
            self.swap(k, k / 2);
            k /= 2;
        }
        k
    }

    fn down_heap(&mut self, mut k: usize) {
        while 2 * k <= self.count {
            let mut j = 2 * k;
            if j < self.count && self.is_greater(j, j + 1) {
                j += 1;
            }
            if !self.is_greater(k, j) {
                break;
            }
            self.swap(k, j);
            k = j;
        }
    }

    fn double_capacity(&mut self) {
        let doubled = self.elements.len() * 2;
        self.elements.resize(doubled, None);
    }
}

impl<T: Copy + PartialEq> Default for EvictionHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(heap: &mut EvictionHeap<char>) -> String {
        std::iter::from_fn(|| heap.remove_min()).collect()
    }

    #[test]
    fn removes_in_recency_order_and_grows_past_initial_capacity() {
        let mut heap = EvictionHeap::new();
        let stamps = [9, 3, 14, 1, 7, 12, 5, 2, 11, 8, 13, 4, 10, 6];
        for (i, &stamp) in stamps.iter().enumerate() {
            heap.insert((b'a' + i as u8) as char, stamp);
        }
        assert_eq!(heap.len(), 14);
        assert!(heap.capacity() >= 14);

        let order: Vec<u64> = std::iter::from_fn(|| heap.remove_min())
            .map(|c| stamps[(c as u8 - b'a') as usize])
            .collect();
        assert_eq!(order, (1..=14).collect::<Vec<_>>());
        assert_eq!(heap.remove_min(), None);
    }

    #[test]
    fn re_heapify_handles_moves_in_both_directions() {
        let mut heap = EvictionHeap::new();
        heap.insert('a', 1);
        heap.insert('b', 2);
        heap.insert('c', 3);
        heap.insert('d', 4);

        // Oldest becomes newest
        assert!(heap.re_heapify('a', 10));
        assert_eq!(heap.peek_min(), Some('b'));
        // Newest becomes oldest
        assert!(heap.re_heapify('d', 0));
        assert_eq!(drain(&mut heap), "dbca");
        assert!(!heap.re_heapify('z', 5));
    }

    #[test]
    fn remove_from_the_middle_keeps_order() {
        let mut heap = EvictionHeap::new();
        for (c, stamp) in [('a', 5), ('b', 1), ('c', 4), ('d', 2), ('e', 3)] {
            heap.insert(c, stamp);
        }
        assert!(heap.remove('d'));
        assert!(!heap.remove('d'));
        assert!(!heap.contains('d'));
        assert_eq!(drain(&mut heap), "beca");
    }
}

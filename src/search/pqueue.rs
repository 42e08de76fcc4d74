//! Mutable priority queue (C2): a keyed min-heap supporting `erase` and
//! `contains` in O(log n), used to drive every open set in the crate.
//!
//! Implemented as an array-based binary heap plus a side table mapping each
//! key to its current slot, so erase/reprioritize never need a linear scan.

use std::collections::HashMap;
use std::hash::Hash;

struct Slot<K, P, V> {
    key: K,
    priority: P,
    value: V,
}

pub struct MutablePriorityQueue<K, P, V>
where
    K: Eq + Hash + Clone,
    P: Ord + Clone,
{
    heap: Vec<Slot<K, P, V>>,
    position: HashMap<K, usize>,
}

impl<K, P, V> Clone for MutablePriorityQueue<K, P, V>
where
    K: Eq + Hash + Clone,
    P: Ord + Clone,
    V: Clone,
{
    /// Used to checkpoint a search's open set before a speculative repair.
    fn clone(&self) -> Self {
        MutablePriorityQueue {
            heap: self
                .heap
                .iter()
                .map(|s| Slot {
                    key: s.key.clone(),
                    priority: s.priority.clone(),
                    value: s.value.clone(),
                })
                .collect(),
            position: self.position.clone(),
        }
    }
}

impl<K, P, V> Default for MutablePriorityQueue<K, P, V>
where
    K: Eq + Hash + Clone,
    P: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, P, V> MutablePriorityQueue<K, P, V>
where
    K: Eq + Hash + Clone,
    P: Ord + Clone,
{
    pub fn new() -> Self {
        MutablePriorityQueue {
            heap: Vec::new(),
            position: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.position.contains_key(key)
    }

    /// Inserts a new key, or reprioritizes it in place if already present.
    pub fn push(&mut self, key: K, priority: P, value: V) {
        if let Some(&idx) = self.position.get(&key) {
            self.heap[idx].priority = priority;
            self.heap[idx].value = value;
            self.sift(idx);
            return;
        }
        let idx = self.heap.len();
        self.position.insert(key.clone(), idx);
        self.heap.push(Slot { key, priority, value });
        self.sift_up(idx);
    }

    /// Removes and returns the item with minimum priority, or `None` if the
    /// queue is empty. Never returns a key that was `erase`d in between.
    pub fn pop(&mut self) -> Option<(K, P, V)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let slot = self.heap.pop().unwrap();
        self.position.remove(&slot.key);
        if !self.heap.is_empty() {
            self.position.insert(self.heap[0].key.clone(), 0);
            self.sift_down(0);
        }
        Some((slot.key, slot.priority, slot.value))
    }

    /// Removes a key from anywhere in the queue, returning its value if it
    /// was present. O(log n).
    pub fn erase(&mut self, key: &K) -> Option<V> {
        let idx = *self.position.get(key)?;
        let last = self.heap.len() - 1;
        self.heap.swap(idx, last);
        let removed = self.heap.pop().unwrap();
        self.position.remove(&removed.key);
        if idx < self.heap.len() {
            self.position.insert(self.heap[idx].key.clone(), idx);
            self.sift(idx);
        }
        Some(removed.value)
    }

    pub fn peek(&self) -> Option<(&K, &P, &V)> {
        self.heap.first().map(|s| (&s.key, &s.priority, &s.value))
    }

    /// Iterates every entry currently in the queue, in heap (not priority)
    /// order. Used by the DITAGS repair discipline to scan the open set
    /// without popping it (§4.7 "Invalidation strategy").
    pub fn iter(&self) -> impl Iterator<Item = (&K, &P, &V)> {
        self.heap.iter().map(|s| (&s.key, &s.priority, &s.value))
    }

    /// Recomputes every entry's priority in place and restores the heap
    /// invariant in one pass, rather than erasing and re-pushing each key.
    /// Used when a problem change invalidates a whole bucket's heuristic
    /// (§4.7 "re-push nodes onto open ... or drops them (open nodes whose h
    /// can only get worse stay but reprioritize)").
    pub fn reprioritize_all<F: FnMut(&K, &V) -> P>(&mut self, mut f: F) {
        for slot in self.heap.iter_mut() {
            slot.priority = f(&slot.key, &slot.value);
        }
        for i in (0..self.heap.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    fn sift(&mut self, idx: usize) {
        let moved_up = self.sift_up(idx);
        if !moved_up {
            self.sift_down(idx);
        }
    }

    fn sift_up(&mut self, mut idx: usize) -> bool {
        let mut moved = false;
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.heap[idx].priority < self.heap[parent].priority {
                self.swap(idx, parent);
                idx = parent;
                moved = true;
            } else {
                break;
            }
        }
        moved
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut smallest = idx;
            if left < self.heap.len() && self.heap[left].priority < self.heap[smallest].priority {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right].priority < self.heap[smallest].priority
            {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.swap(idx, smallest);
            idx = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position.insert(self.heap[a].key.clone(), a);
        self.position.insert(self.heap[b].key.clone(), b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut q = MutablePriorityQueue::new();
        q.push("a", 5, ());
        q.push("b", 1, ());
        q.push("c", 3, ());
        assert_eq!(q.pop().map(|(k, _, _)| k), Some("b"));
        assert_eq!(q.pop().map(|(k, _, _)| k), Some("c"));
        assert_eq!(q.pop().map(|(k, _, _)| k), Some("a"));
        assert!(q.pop().is_none());
    }

    #[test]
    fn erase_removes_without_disturbing_order() {
        let mut q = MutablePriorityQueue::new();
        for (k, p) in [("a", 5), ("b", 1), ("c", 3), ("d", 4), ("e", 2)] {
            q.push(k, p, ());
        }
        assert_eq!(q.erase(&"c"), Some(()));
        assert!(!q.contains(&"c"));
        let mut popped = vec![];
        while let Some((k, _, _)) = q.pop() {
            popped.push(k);
        }
        assert_eq!(popped, vec!["b", "e", "d", "a"]);
    }

    #[test]
    fn reprioritizing_an_existing_key_updates_order() {
        let mut q = MutablePriorityQueue::new();
        q.push("a", 5, ());
        q.push("b", 1, ());
        q.push("a", 0, ());
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().map(|(k, _, _)| k), Some("a"));
    }
}

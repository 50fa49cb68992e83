//! Bounded least-recently-used map.
//!
//! Entries live in a `Vec` arena and are chained into a doubly linked list by
//! index (head = most recently used, tail = least recently used). A `HashMap`
//! from key to arena slot gives O(1) lookup, promotion and eviction.

use std::collections::HashMap;
use std::hash::Hash;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    head: usize,
    tail: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU capacity must be at least 1");
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inserts or overwrites `key` and makes it the most recently used entry.
    /// Returns `true` when the key was already present.
    pub fn set(&mut self, key: K, value: V) -> bool {
        if let Some(&idx) = self.map.get(&key) {
            self.nodes[idx].value = value;
            self.move_to_front(idx);
            return true;
        }

        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };

        let idx = if self.map.len() >= self.capacity {
            // Reuse the tail's slot for the new entry
            let idx = self.tail;
            self.unlink(idx);
            let evicted = std::mem::replace(&mut self.nodes[idx], node);
            self.map.remove(&evicted.key);
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        };

        self.link_front(idx);
        self.map.insert(key, idx);
        false
    }

    /// Returns the value for `key` and promotes it to most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        Some(&self.nodes[idx].value)
    }

    /// Looks up `key` without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|&idx| &self.nodes[idx].value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            cache: self,
            cursor: self.head,
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        if prev == NIL {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;

        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

pub struct Keys<'a, K, V> {
    cache: &'a LruCache<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.cache.nodes[self.cursor];
        self.cursor = node.next;
        Some(&node.key)
    }
}

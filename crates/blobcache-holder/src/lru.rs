//! Generic LRU pool over an index-linked arena.
//!
//! Nodes live in a dense `Vec` and link to each other by slot index, so the
//! recency list needs no heap-allocated links and freed slots are recycled
//! through a free list. One `RwLock` guards both the key map and the ordering,
//! keeping a value and its recency position consistent under concurrency.
//!
//! The pool is a pure container: it tracks recency and hands back evicted
//! entries, while side effects of eviction belong to the caller.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

const NIL: usize = usize::MAX;

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

struct PoolInner<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    index: HashMap<K, usize>,
    head: usize,
    tail: usize,
    free: Vec<usize>,
}

impl<K: Clone + Eq + Hash, V> PoolInner<K, V> {
    fn node(&self, slot: usize) -> &Node<K, V> {
        self.slots[slot].as_ref().expect("occupied slot")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, V> {
        self.slots[slot].as_mut().expect("occupied slot")
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };
        match prev {
            NIL => self.head = next,
            p => self.node_mut(p).next = next,
        }
        match next {
            NIL => self.tail = prev,
            n => self.node_mut(n).prev = prev,
        }
    }

    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(slot);
            node.prev = NIL;
            node.next = old_head;
        }
        match old_head {
            NIL => self.tail = slot,
            h => self.node_mut(h).prev = slot,
        }
        self.head = slot;
    }

    fn allocate(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) -> Node<K, V> {
        self.detach(slot);
        let node = self.slots[slot].take().expect("occupied slot");
        self.index.remove(&node.key);
        self.free.push(slot);
        node
    }
}

/// A keyed LRU container. `get` and `put` promote to most-recent.
pub struct LruPool<K, V> {
    inner: RwLock<PoolInner<K, V>>,
}

impl<K: Clone + Eq + Hash, V: Clone> LruPool<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PoolInner {
                slots: Vec::new(),
                index: HashMap::new(),
                head: NIL,
                tail: NIL,
                free: Vec::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .read()
            .expect("lock poisoned")
            .index
            .contains_key(key)
    }

    /// Look up and promote. Returns a clone of the value.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let slot = *inner.index.get(key)?;
        inner.detach(slot);
        inner.push_front(slot);
        Some(inner.node(slot).value.clone())
    }

    /// Insert or replace at most-recent position. Returns the displaced value
    /// when the key was already present.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if let Some(&slot) = inner.index.get(&key) {
            inner.detach(slot);
            inner.push_front(slot);
            let old = std::mem::replace(&mut inner.node_mut(slot).value, value);
            return Some(old);
        }
        let slot = inner.allocate(Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        });
        inner.push_front(slot);
        inner.index.insert(key, slot);
        None
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let slot = *inner.index.get(key)?;
        Some(inner.release(slot).value)
    }

    /// Remove and return the least-recently-used entry.
    pub fn pop_tail(&self) -> Option<(K, V)> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let tail = inner.tail;
        if tail == NIL {
            return None;
        }
        let node = inner.release(tail);
        Some((node.key, node.value))
    }

    /// Key of the least-recently-used entry, without removing it.
    pub fn tail_key(&self) -> Option<K> {
        let inner = self.inner.read().expect("lock poisoned");
        match inner.tail {
            NIL => None,
            slot => Some(inner.node(slot).key.clone()),
        }
    }

    /// Snapshot of the keys, most recent first.
    pub fn keys(&self) -> Vec<K> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut keys = Vec::with_capacity(inner.index.len());
        let mut slot = inner.head;
        while slot != NIL {
            let node = inner.node(slot);
            keys.push(node.key.clone());
            slot = node.next;
        }
        keys
    }
}

impl<K: Clone + Eq + Hash, V: Clone> Default for LruPool<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

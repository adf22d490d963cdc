//! Case-folded prefix trie with per-node payload accumulation.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

struct Node<T> {
    children: HashMap<char, Node<T>>,
    /// Payloads of every key passing through this node, in insertion order.
    payloads: Vec<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            payloads: Vec::new(),
        }
    }
}

/// Prefix trie mapping case-folded keys to payloads.
///
/// Every node on a key's path stores the key's payload, so a lookup is one
/// walk down the prefix and the answer is already sitting at the final node.
/// Memory is traded for lookup speed, which suits identifier-length keys.
pub struct Trie<T> {
    root: Node<T>,
    /// Every (key, payload) pair accepted so far; makes re-inserts no-ops
    /// without scanning node payload lists.
    seen: HashSet<(String, T)>,
}

impl<T> Default for Trie<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> Trie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a payload under a key. Keys are folded to lowercase, so later
    /// lookups are case-insensitive. Inserting the same (key, payload) pair
    /// again changes nothing.
    pub fn insert(&mut self, key: &str, payload: T) {
        let folded = key.to_lowercase();
        if !self.seen.insert((folded.clone(), payload.clone())) {
            return;
        }
        let mut node = &mut self.root;
        node.payloads.push(payload.clone());
        for ch in folded.chars() {
            node = node.children.entry(ch).or_default();
            node.payloads.push(payload.clone());
        }
    }

    /// All payloads whose key starts with `prefix`, in insertion order.
    /// The empty prefix returns every payload. Cost is one node per prefix
    /// character; the result slice needs no further work.
    pub fn search_prefix(&self, prefix: &str) -> &[T] {
        let folded = prefix.to_lowercase();
        let mut node = &self.root;
        for ch in folded.chars() {
            match node.children.get(&ch) {
                Some(next) => node = next,
                None => return &[],
            }
        }
        &node.payloads
    }

    /// Number of distinct (key, payload) pairs inserted.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

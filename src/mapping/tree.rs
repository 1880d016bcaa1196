// Ancestry-keyed mapping tree

use super::Translate;
use crate::entry::Entry;
use std::collections::HashMap;

/// A value stored in an [`EntryTree`]
pub trait TreeValue {
    /// A value that carries nothing. Storing one clears the entry.
    fn is_vacant(&self) -> bool {
        false
    }
}

/// One node of an [`EntryTree`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTreeNode<T> {
    entry: Entry,
    value: Option<T>,
    children: HashMap<Entry, EntryTreeNode<T>>,
}

impl<T> EntryTreeNode<T> {
    fn new(entry: Entry) -> Self {
        Self {
            entry,
            value: None,
            children: HashMap::new(),
        }
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn child(&self, entry: &Entry) -> Option<&EntryTreeNode<T>> {
        self.children.get(entry)
    }

    pub fn children(&self) -> impl Iterator<Item = &EntryTreeNode<T>> {
        self.children.values()
    }

    pub fn child_entries(&self) -> impl Iterator<Item = &Entry> {
        self.children.keys()
    }

    /// No value and no children
    pub fn is_dead(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// This node and every descendant, pre-order
    pub fn nodes_recursively(&self) -> Vec<&EntryTreeNode<T>> {
        let mut nodes = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.values());
        }
        nodes
    }
}

/// Tree of values keyed by [`Entry::ancestry`].
///
/// Inserting a member materializes its enclosing classes as empty nodes;
/// clearing a value prunes every node left without a value or children.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTree<T> {
    root: HashMap<Entry, EntryTreeNode<T>>,
}

impl<T> Default for EntryTree<T> {
    fn default() -> Self {
        Self {
            root: HashMap::new(),
        }
    }
}

impl<T: Clone + TreeValue> EntryTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `entry`. `None` or a vacant value clears the entry.
    pub fn insert(&mut self, entry: &Entry, value: Option<T>) {
        let Some(value) = value.filter(|value| !value.is_vacant()) else {
            self.remove(entry);
            return;
        };

        let ancestry = entry.ancestry();
        let Some((first, rest)) = ancestry.split_first() else {
            return;
        };

        let mut node = self
            .root
            .entry(first.clone())
            .or_insert_with(|| EntryTreeNode::new(first.clone()));
        for segment in rest {
            node = node
                .children
                .entry(segment.clone())
                .or_insert_with(|| EntryTreeNode::new(segment.clone()));
        }
        node.value = Some(value);
    }

    /// Clear the value at `entry` and prune the nodes left dead along its
    /// path, stopping at the first ancestor still in use
    pub fn remove(&mut self, entry: &Entry) -> Option<T> {
        let ancestry = entry.ancestry();
        let removed = self.node_mut(&ancestry)?.value.take();

        for depth in (1..=ancestry.len()).rev() {
            let key = &ancestry[depth - 1];
            let Some(siblings) = self.children_mut(&ancestry[..depth - 1]) else {
                break;
            };
            if !siblings.get(key).map_or(false, EntryTreeNode::is_dead) {
                break;
            }
            siblings.remove(key);
        }
        removed
    }

    pub fn get(&self, entry: &Entry) -> Option<&T> {
        self.find_node(entry)?.value.as_ref()
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.get(entry).is_some()
    }

    pub fn find_node(&self, entry: &Entry) -> Option<&EntryTreeNode<T>> {
        let ancestry = entry.ancestry();
        let (first, rest) = ancestry.split_first()?;
        let mut node = self.root.get(first)?;
        for segment in rest {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, path: &[Entry]) -> Option<&mut EntryTreeNode<T>> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get_mut(first)?;
        for segment in rest {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// The child map below `path`; the root map for an empty path
    fn children_mut(&mut self, path: &[Entry]) -> Option<&mut HashMap<Entry, EntryTreeNode<T>>> {
        if path.is_empty() {
            return Some(&mut self.root);
        }
        self.node_mut(path).map(|node| &mut node.children)
    }

    /// Entries stored directly below `entry`
    pub fn children(&self, entry: &Entry) -> Vec<Entry> {
        self.find_node(entry)
            .map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries sharing a parent node with `entry`, excluding `entry`
    pub fn siblings(&self, entry: &Entry) -> Vec<Entry> {
        let ancestry = entry.ancestry();
        let level = match ancestry.len() {
            0 | 1 => Some(&self.root),
            len => self.find_node(&ancestry[len - 2]).map(|parent| &parent.children),
        };
        level
            .map(|nodes| nodes.keys().filter(|key| *key != entry).cloned().collect())
            .unwrap_or_default()
    }

    /// Top-level nodes
    pub fn roots(&self) -> impl Iterator<Item = &EntryTreeNode<T>> {
        self.root.values()
    }

    pub fn root_entries(&self) -> Vec<Entry> {
        self.root.keys().cloned().collect()
    }

    /// Every node, including empty intermediate ones
    pub fn all_nodes(&self) -> Vec<&EntryTreeNode<T>> {
        self.root
            .values()
            .flat_map(EntryTreeNode::nodes_recursively)
            .collect()
    }

    pub fn all_entries(&self) -> Vec<Entry> {
        self.all_nodes().into_iter().map(|node| node.entry.clone()).collect()
    }

    /// Entries that carry a value, with the value
    pub fn iter_values(&self) -> impl Iterator<Item = (&Entry, &T)> {
        self.all_nodes()
            .into_iter()
            .filter_map(|node| node.value.as_ref().map(|value| (&node.entry, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of entries holding a value
    pub fn len(&self) -> usize {
        self.iter_values().count()
    }

    /// A new tree with every key passed through `translator`; values are
    /// copied unchanged
    pub fn translate(&self, translator: &dyn Translate) -> EntryTree<T> {
        let mut translated = EntryTree::new();
        for (entry, value) in self.iter_values() {
            translated.insert(&translator.translate(entry), Some(value.clone()));
        }
        translated
    }

    /// Copy every value of `other` into this tree, replacing existing ones
    pub fn merge(&mut self, other: &EntryTree<T>) {
        for (entry, value) in other.iter_values() {
            self.insert(entry, Some(value.clone()));
        }
    }
}

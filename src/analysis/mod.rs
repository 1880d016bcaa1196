//! Relationship queries over a [`JarIndex`]
//!
//! Inheritance and implementation trees for classes and methods, and the
//! related-implementations closure used when a virtual method is renamed or
//! searched for callers.

mod related;
mod trees;

pub use trees::{
    ClassImplementationsNode, ClassInheritanceNode, MethodImplementationsNode,
    MethodInheritanceNode,
};

use crate::entry::{ClassEntry, MethodEntry};
use crate::index::JarIndex;
use std::collections::{BTreeSet, HashSet};

/// Structural queries answered from an index
#[derive(Debug, Clone, Copy)]
pub struct Relations<'a> {
    index: &'a JarIndex,
}

impl<'a> Relations<'a> {
    pub fn new(index: &'a JarIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a JarIndex {
        self.index
    }

    /// The highest declaration of `method` still present in the jar,
    /// searching superclasses and, at each level, implemented interfaces.
    /// Falls back to `method` itself.
    pub fn find_base_method(&self, method: &MethodEntry) -> MethodEntry {
        let hierarchy = self.index.hierarchy();
        let mut base = method.clone();

        let mut levels = vec![method.parent.clone()];
        levels.extend(hierarchy.ancestry(&method.parent));

        for level in &levels {
            let candidate = method.with_owner(level.clone());
            if self.index.contains_obf_method(&candidate) {
                base = candidate;
            }
            for interface in hierarchy.own_interfaces(level) {
                let candidate = method.with_owner(interface);
                if self.index.contains_obf_method(&candidate) {
                    base = candidate;
                }
            }
        }
        base
    }

    /// Classes in the jar implementing an interface, directly, through
    /// sub-interfaces or through subclassing. Sorted by name.
    pub fn implementing_classes(&self, interface: &ClassEntry) -> Vec<ClassEntry> {
        let hierarchy = self.index.hierarchy();
        let mut found = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![interface.clone()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if current != *interface
                && self.index.contains_obf_class(&current)
                && !hierarchy.is_interface(&current)
            {
                found.insert(current.clone());
            }
            stack.extend(hierarchy.implementers(&current).iter().cloned());
            stack.extend(hierarchy.subclasses(&current).iter().cloned());
        }
        found.into_iter().collect()
    }
}

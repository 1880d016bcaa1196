//! The jar index
//!
//! A [`JarIndex`] is built once per jar by [`JarIndexer`] and is read-only
//! afterwards. It answers containment questions (is this symbol part of the
//! jar or an external library), lists declared members, and exposes the
//! reference graph built from method bodies.

mod bridge;
mod builder;
pub mod hierarchy;
pub mod references;

pub use builder::JarIndexer;
pub use hierarchy::HierarchyIndex;
pub use references::ReferenceGraph;

use crate::classfile::ClassNode;
use crate::entry::{
    AccessFlags, ClassEntry, Entry, EntryReference, FieldDefEntry, FieldEntry, MethodDefEntry,
    MethodEntry, ReferenceKind,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Index construction and query errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Class cannot be its own interface: {class}")]
    SelfInterface { class: ClassEntry },

    #[error("Method is not part of the index: {0}")]
    UnknownMethod(MethodEntry),
}

/// Counts describing an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub classes: usize,
    pub fields: usize,
    pub methods: usize,
    pub references: usize,
    pub synthetic_methods: usize,
    pub bridge_methods: usize,
    pub inner_classes: usize,
}

/// Structural model and reference graph of one jar
#[derive(Debug, Clone, Default)]
pub struct JarIndex {
    /// Every class found in the jar
    pub(crate) classes: BTreeSet<ClassEntry>,

    /// Superclass/interface graph and declared members
    pub(crate) hierarchy: HierarchyIndex,

    /// Access flags of every declared class, field and method
    pub(crate) access: HashMap<Entry, AccessFlags>,

    /// Declared fields per class, in class file order
    pub(crate) fields: HashMap<ClassEntry, Vec<FieldDefEntry>>,

    /// Declared methods per class, in class file order
    pub(crate) methods: HashMap<ClassEntry, Vec<MethodDefEntry>>,

    /// Non-constructor methods per class
    pub(crate) method_implementations: HashMap<ClassEntry, Vec<MethodEntry>>,

    /// Calls, field accesses and instantiations made from method bodies
    pub(crate) references: ReferenceGraph,

    /// Outer class -> nested classes
    pub(crate) inner_classes_by_outer: HashMap<ClassEntry, Vec<ClassEntry>>,

    /// Nested class -> first outer class seen for it
    pub(crate) outer_classes_by_inner: HashMap<ClassEntry, ClassEntry>,

    /// Bridge method -> the method it forwards to
    pub(crate) bridged_methods: HashMap<MethodEntry, MethodEntry>,

    /// Forwarded-to method -> its bridge
    pub(crate) bridges_by_target: HashMap<MethodEntry, MethodEntry>,

    /// Methods flagged synthetic
    pub(crate) synthetic_methods: HashSet<MethodEntry>,
}

impl JarIndex {
    /// Index a set of classes with default options
    pub fn build(classes: &[ClassNode], track_inner_classes: bool) -> Result<Self, IndexError> {
        JarIndexer::new()
            .track_inner_classes(track_inner_classes)
            .build(classes)
    }

    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    pub fn references(&self) -> &ReferenceGraph {
        &self.references
    }

    /// All classes in the jar, sorted by name
    pub fn class_entries(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.iter()
    }

    pub fn contains_obf_class(&self, class: &ClassEntry) -> bool {
        self.classes.contains(class)
    }

    pub fn contains_obf_field(&self, field: &FieldEntry) -> bool {
        self.access.contains_key(&Entry::Field(field.clone()))
    }

    pub fn contains_obf_method(&self, method: &MethodEntry) -> bool {
        self.access.contains_key(&Entry::Method(method.clone()))
    }

    /// Is the symbol declared in this jar (as opposed to a library)?
    pub fn contains_obf_entry(&self, entry: &Entry) -> bool {
        match entry {
            Entry::Class(class) => self.contains_obf_class(class),
            Entry::Field(field) => self.contains_obf_field(field),
            Entry::Method(method) => self.contains_obf_method(method),
            Entry::LocalVariable(local) => self.contains_obf_method(&local.parent),
        }
    }

    pub fn access_flags(&self, entry: &Entry) -> Option<AccessFlags> {
        self.access.get(entry).copied()
    }

    pub fn is_interface(&self, class: &ClassEntry) -> bool {
        self.hierarchy.is_interface(class)
    }

    pub fn fields_of(&self, class: &ClassEntry) -> &[FieldDefEntry] {
        self.fields.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn methods_of(&self, class: &ClassEntry) -> &[MethodDefEntry] {
        self.methods.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-constructor methods declared by a class
    pub fn method_implementations(&self, class: &ClassEntry) -> &[MethodEntry] {
        self.method_implementations
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Methods reading or writing a field
    pub fn field_references(&self, field: &FieldEntry) -> Vec<EntryReference> {
        self.references
            .references_to(&Entry::Field(field.clone()), |kind| kind.is_field_access())
    }

    /// Methods calling a method directly
    pub fn methods_referencing(&self, method: &MethodEntry) -> Vec<EntryReference> {
        self.references
            .references_to(&Entry::Method(method.clone()), |kind| kind == ReferenceKind::Call)
    }

    /// Every call, field access and instantiation made by a method
    pub fn references_from(&self, caller: &MethodEntry) -> Vec<EntryReference> {
        self.references
            .references_from(&Entry::Method(caller.clone()), |_| true)
    }

    /// Distinct methods called by a method
    pub fn methods_called_by(&self, caller: &MethodEntry) -> Vec<MethodEntry> {
        self.references
            .references_from(&Entry::Method(caller.clone()), |kind| kind == ReferenceKind::Call)
            .into_iter()
            .filter_map(|reference| reference.entry.as_method().cloned())
            .collect()
    }

    /// Methods constructing instances of a class
    pub fn constructors_referencing(&self, class: &ClassEntry) -> Vec<EntryReference> {
        self.references.references_to(&Entry::Class(class.clone()), |kind| {
            kind == ReferenceKind::Instantiation
        })
    }

    pub fn inner_classes(&self, outer: &ClassEntry) -> &[ClassEntry] {
        self.inner_classes_by_outer
            .get(outer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn outer_class(&self, inner: &ClassEntry) -> Option<&ClassEntry> {
        self.outer_classes_by_inner.get(inner)
    }

    /// Chain of recorded outer classes from the outermost down to `class`
    pub fn obf_class_chain(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        let mut chain = vec![class.clone()];
        let mut current = class;
        while let Some(outer) = self.outer_class(current) {
            if chain.contains(outer) {
                break;
            }
            chain.push(outer.clone());
            current = outer;
        }
        chain.reverse();
        chain
    }

    /// The method a bridge forwards to
    pub fn bridged_method(&self, bridge: &MethodEntry) -> Option<&MethodEntry> {
        self.bridged_methods.get(bridge)
    }

    /// The bridge forwarding to a method
    pub fn bridge_of(&self, target: &MethodEntry) -> Option<&MethodEntry> {
        self.bridges_by_target.get(target)
    }

    pub fn is_synthetic(&self, method: &MethodEntry) -> bool {
        self.synthetic_methods.contains(method)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            classes: self.classes.len(),
            fields: self.fields.values().map(Vec::len).sum(),
            methods: self.methods.values().map(Vec::len).sum(),
            references: self.references.reference_count(),
            synthetic_methods: self.synthetic_methods.len(),
            bridge_methods: self.bridged_methods.len(),
            inner_classes: self.outer_classes_by_inner.len(),
        }
    }
}

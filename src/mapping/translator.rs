// Applying mappings to entries

use super::{EntryMapping, EntryTree};
use crate::entry::{
    ClassEntry, Entry, EntryReference, FieldEntry, LocalVariableEntry, MethodDescriptor,
    MethodEntry, TypeDescriptor,
};
use crate::index::JarIndex;
use std::sync::Arc;

/// Converts entries from one naming to another
pub trait Translate {
    fn translate(&self, entry: &Entry) -> Entry;

    /// Translate a reference, keeping the referenced entry and the context
    /// it is used from consistent
    fn translate_reference(&self, reference: &EntryReference) -> EntryReference {
        EntryReference {
            entry: self.translate(&reference.entry),
            context: reference.context.as_ref().map(|context| self.translate(context)),
        }
    }
}

impl<F> Translate for F
where
    F: Fn(&Entry) -> Entry,
{
    fn translate(&self, entry: &Entry) -> Entry {
        self(entry)
    }
}

/// Translates entries through a mapping tree.
///
/// With an index attached, a member referenced through a subclass picks up
/// the mapping stored on the class that actually declares it.
#[derive(Debug, Clone)]
pub struct MappingTranslator {
    mappings: Arc<EntryTree<EntryMapping>>,
    index: Option<Arc<JarIndex>>,
}

impl MappingTranslator {
    pub fn new(mappings: Arc<EntryTree<EntryMapping>>) -> Self {
        Self {
            mappings,
            index: None,
        }
    }

    pub fn with_index(mut self, index: Arc<JarIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn mappings(&self) -> &EntryTree<EntryMapping> {
        &self.mappings
    }

    fn target_name(&self, entry: &Entry) -> Option<&str> {
        self.mappings.get(entry)?.target_name.as_deref()
    }

    /// The mapping key for a member: the declaring class when known
    fn resolve(&self, entry: Entry) -> Entry {
        let Some(index) = &self.index else {
            return entry;
        };
        let Some(owner) = index.hierarchy().resolve_entry_owner(&entry) else {
            return entry;
        };
        match entry {
            Entry::Field(field) => Entry::Field(field.with_owner(owner)),
            Entry::Method(method) => Entry::Method(method.with_owner(owner)),
            other => other,
        }
    }

    pub fn translate_class(&self, class: &ClassEntry) -> ClassEntry {
        let target = self.target_name(&Entry::Class(class.clone()));
        match class.outer_class() {
            None => ClassEntry::new(target.unwrap_or(class.full_name())),
            Some(outer) => {
                let outer = self.translate_class(&outer);
                ClassEntry::nested(&outer, target.unwrap_or(class.name()))
            }
        }
    }

    fn translate_class_name(&self, name: &str) -> String {
        self.translate_class(&ClassEntry::new(name))
            .full_name()
            .to_string()
    }

    pub fn translate_type(&self, desc: &TypeDescriptor) -> TypeDescriptor {
        desc.remap(|name| self.translate_class_name(name))
    }

    pub fn translate_method_desc(&self, desc: &MethodDescriptor) -> MethodDescriptor {
        desc.remap(|name| self.translate_class_name(name))
    }

    pub fn translate_field(&self, field: &FieldEntry) -> FieldEntry {
        let key = self.resolve(Entry::Field(field.clone()));
        let name = self.target_name(&key).unwrap_or(&field.name);
        FieldEntry::new(
            self.translate_class(&field.parent),
            name,
            self.translate_type(&field.desc),
        )
    }

    pub fn translate_method(&self, method: &MethodEntry) -> MethodEntry {
        let name = if method.is_constructor() {
            method.name.as_str()
        } else {
            let key = self.resolve(Entry::Method(method.clone()));
            self.target_name(&key).unwrap_or(&method.name)
        };
        MethodEntry::new(
            self.translate_class(&method.parent),
            name,
            self.translate_method_desc(&method.desc),
        )
    }

    pub fn translate_local(&self, local: &LocalVariableEntry) -> LocalVariableEntry {
        let name = self
            .target_name(&Entry::LocalVariable(local.clone()))
            .unwrap_or(&local.name);
        LocalVariableEntry::new(
            self.translate_method(&local.parent),
            local.index,
            name,
            local.is_argument,
        )
    }
}

impl Translate for MappingTranslator {
    fn translate(&self, entry: &Entry) -> Entry {
        match entry {
            Entry::Class(class) => Entry::Class(self.translate_class(class)),
            Entry::Field(field) => Entry::Field(self.translate_field(field)),
            Entry::Method(method) => Entry::Method(self.translate_method(method)),
            Entry::LocalVariable(local) => Entry::LocalVariable(self.translate_local(local)),
        }
    }
}

/// Build the reverse tree: keyed by translated entries, mapping back to the
/// names found in the jar
pub fn invert(mappings: &EntryTree<EntryMapping>) -> EntryTree<EntryMapping> {
    let forward = MappingTranslator::new(Arc::new(mappings.clone()));
    let mut inverted = EntryTree::new();

    for (entry, mapping) in mappings.iter_values() {
        let reverse = EntryMapping {
            target_name: Some(entry.name().to_string()),
            access: mapping.access,
            javadoc: mapping.javadoc.clone(),
        };
        inverted.insert(&forward.translate(entry), Some(reverse));
    }
    inverted
}

//! Symbol identities
//!
//! Every class, field, method and local variable is named by an [`Entry`].
//! Entries are plain values: two entries built separately for the same
//! symbol compare equal and hash alike. The [`Entry::ancestry`] of an entry
//! runs from its outermost enclosing class down to itself and is the key
//! used by the mapping tree.

mod access;
mod descriptor;
pub mod reference;

pub use access::AccessFlags;
pub use descriptor::{MethodDescriptor, TypeDescriptor};
pub use reference::{EntryReference, ReferenceKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Separator between an outer class name and a nested class name
pub const INNER_SEPARATOR: char = '$';

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// A class identified by its full internal name (`pkg/Outer$Inner`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassEntry {
    name: String,
}

impl ClassEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Build a nested class entry from its outer class and inner name
    pub fn nested(outer: &ClassEntry, inner_name: &str) -> Self {
        Self::new(format!("{}{}{}", outer.name, INNER_SEPARATOR, inner_name))
    }

    pub fn full_name(&self) -> &str {
        &self.name
    }

    /// Position of the separator splitting outer and inner names
    fn inner_split(&self) -> Option<usize> {
        let idx = self.name.rfind(INNER_SEPARATOR)?;
        let before = self.name[..idx].chars().last()?;
        if before == '/' || idx + 1 >= self.name.len() {
            return None;
        }
        Some(idx)
    }

    /// The name a mapping stores for this class: the inner name for nested
    /// classes, the full name otherwise
    pub fn name(&self) -> &str {
        match self.inner_split() {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Name without package and without outer classes
    pub fn simple_name(&self) -> &str {
        let name = self.name();
        name.rsplit('/').next().unwrap_or(name)
    }

    /// Package of the outermost class, if any
    pub fn package_name(&self) -> Option<&str> {
        let outermost = match self.name.find(INNER_SEPARATOR) {
            Some(_) => self.outermost_name(),
            None => &self.name,
        };
        outermost.rfind('/').map(|idx| &outermost[..idx])
    }

    fn outermost_name(&self) -> &str {
        let mut end = self.name.len();
        let mut current = self.clone();
        while let Some(idx) = current.inner_split() {
            end = idx;
            current = ClassEntry::new(&self.name[..idx]);
        }
        &self.name[..end]
    }

    pub fn is_inner(&self) -> bool {
        self.inner_split().is_some()
    }

    /// The directly enclosing class, derived from the name
    pub fn outer_class(&self) -> Option<ClassEntry> {
        self.inner_split().map(|idx| ClassEntry::new(&self.name[..idx]))
    }

    pub fn outermost_class(&self) -> ClassEntry {
        ClassEntry::new(self.outermost_name())
    }

    /// Chain from the outermost class down to this class
    pub fn ancestry(&self) -> Vec<ClassEntry> {
        let mut chain = vec![self.clone()];
        let mut current = self.outer_class();
        while let Some(outer) = current {
            current = outer.outer_class();
            chain.push(outer);
        }
        chain.reverse();
        chain
    }

    pub fn is_in_package(&self, package: &str) -> bool {
        self.package_name() == Some(package)
    }
}

impl fmt::Display for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A field reference: owner, name and type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldEntry {
    pub parent: ClassEntry,
    pub name: String,
    pub desc: TypeDescriptor,
}

impl FieldEntry {
    pub fn new(parent: ClassEntry, name: impl Into<String>, desc: TypeDescriptor) -> Self {
        Self {
            parent,
            name: name.into(),
            desc,
        }
    }

    pub fn with_owner(&self, owner: ClassEntry) -> Self {
        Self::new(owner, self.name.clone(), self.desc.clone())
    }
}

impl fmt::Display for FieldEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.parent, self.name, self.desc)
    }
}

/// A method reference: owner, name and descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodEntry {
    pub parent: ClassEntry,
    pub name: String,
    pub desc: MethodDescriptor,
}

impl MethodEntry {
    pub fn new(parent: ClassEntry, name: impl Into<String>, desc: MethodDescriptor) -> Self {
        Self {
            parent,
            name: name.into(),
            desc,
        }
    }

    pub fn with_owner(&self, owner: ClassEntry) -> Self {
        Self::new(owner, self.name.clone(), self.desc.clone())
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME || self.name == STATIC_INITIALIZER_NAME
    }
}

impl fmt::Display for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.parent, self.name, self.desc)
    }
}

/// A local variable slot of a method. Identity is the method plus slot
/// index; the name is carried along but does not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariableEntry {
    pub parent: MethodEntry,
    pub index: u16,
    pub name: String,
    pub is_argument: bool,
}

impl LocalVariableEntry {
    pub fn new(parent: MethodEntry, index: u16, name: impl Into<String>, is_argument: bool) -> Self {
        Self {
            parent,
            index,
            name: name.into(),
            is_argument,
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.parent.clone(), self.index, name, self.is_argument)
    }
}

impl PartialEq for LocalVariableEntry {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent && self.index == other.index
    }
}

impl Eq for LocalVariableEntry {}

impl Hash for LocalVariableEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parent.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for LocalVariableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.parent, self.index)
    }
}

/// A declared field, as found while indexing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldDefEntry {
    pub entry: FieldEntry,
    pub access: AccessFlags,
}

impl FieldDefEntry {
    pub(crate) fn new(entry: FieldEntry, access: AccessFlags) -> Self {
        Self { entry, access }
    }
}

/// A declared method, as found while indexing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodDefEntry {
    pub entry: MethodEntry,
    pub access: AccessFlags,
}

impl MethodDefEntry {
    pub(crate) fn new(entry: MethodEntry, access: AccessFlags) -> Self {
        Self { entry, access }
    }
}

/// Any symbol that can carry a mapping
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entry {
    Class(ClassEntry),
    Field(FieldEntry),
    Method(MethodEntry),
    LocalVariable(LocalVariableEntry),
}

impl Entry {
    /// Name as stored in a mapping (inner name for nested classes)
    pub fn name(&self) -> &str {
        match self {
            Entry::Class(c) => c.name(),
            Entry::Field(f) => &f.name,
            Entry::Method(m) => &m.name,
            Entry::LocalVariable(v) => &v.name,
        }
    }

    /// The nearest class at or above this entry
    pub fn containing_class(&self) -> &ClassEntry {
        match self {
            Entry::Class(c) => c,
            Entry::Field(f) => &f.parent,
            Entry::Method(m) => &m.parent,
            Entry::LocalVariable(v) => &v.parent.parent,
        }
    }

    /// The directly enclosing entry
    pub fn parent(&self) -> Option<Entry> {
        match self {
            Entry::Class(c) => c.outer_class().map(Entry::Class),
            Entry::Field(f) => Some(Entry::Class(f.parent.clone())),
            Entry::Method(m) => Some(Entry::Class(m.parent.clone())),
            Entry::LocalVariable(v) => Some(Entry::Method(v.parent.clone())),
        }
    }

    /// Chain from the outermost class down to this entry
    pub fn ancestry(&self) -> Vec<Entry> {
        let mut chain: Vec<Entry> = self
            .containing_class()
            .ancestry()
            .into_iter()
            .map(Entry::Class)
            .collect();
        match self {
            Entry::Class(_) => {}
            Entry::Field(_) | Entry::Method(_) => chain.push(self.clone()),
            Entry::LocalVariable(v) => {
                chain.push(Entry::Method(v.parent.clone()));
                chain.push(self.clone());
            }
        }
        chain
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Entry::Class(_) => "class",
            Entry::Field(_) => "field",
            Entry::Method(_) => "method",
            Entry::LocalVariable(_) => "local variable",
        }
    }

    pub fn as_class(&self) -> Option<&ClassEntry> {
        match self {
            Entry::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodEntry> {
        match self {
            Entry::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldEntry> {
        match self {
            Entry::Field(f) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Class(c) => c.fmt(f),
            Entry::Field(field) => field.fmt(f),
            Entry::Method(m) => m.fmt(f),
            Entry::LocalVariable(v) => v.fmt(f),
        }
    }
}

impl From<ClassEntry> for Entry {
    fn from(entry: ClassEntry) -> Self {
        Entry::Class(entry)
    }
}

impl From<FieldEntry> for Entry {
    fn from(entry: FieldEntry) -> Self {
        Entry::Field(entry)
    }
}

impl From<MethodEntry> for Entry {
    fn from(entry: MethodEntry) -> Self {
        Entry::Method(entry)
    }
}

impl From<LocalVariableEntry> for Entry {
    fn from(entry: LocalVariableEntry) -> Self {
        Entry::LocalVariable(entry)
    }
}

//! Mappings: renames, documentation and access overrides keyed by entry
//!
//! Mappings are stored in an [`EntryTree`] keyed by each entry's ancestry.
//! A [`MappingTranslator`] applies a tree (optionally resolved through a
//! [`JarIndex`](crate::index::JarIndex)) to entries and references, and a
//! [`Remapper`] is the single-writer session used to edit mappings while
//! readers keep working from snapshots.

pub mod codec;
mod remapper;
mod translator;
pub mod tree;

pub use codec::{MappingError, MappingFormat};
pub use remapper::{RemapError, Remapper};
pub use translator::{invert, MappingTranslator, Translate};
pub use tree::{EntryTree, EntryTreeNode, TreeValue};

use crate::entry::AccessFlags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility override applied on top of the access flags in the jar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessModifier {
    #[default]
    Unchanged,
    Public,
    Protected,
    Private,
    Package,
}

impl AccessModifier {
    /// Apply the override to a set of flags
    pub fn apply(&self, access: AccessFlags) -> AccessFlags {
        match self {
            AccessModifier::Unchanged => access,
            AccessModifier::Public => access.with_visibility(AccessFlags::PUBLIC),
            AccessModifier::Protected => access.with_visibility(AccessFlags::PROTECTED),
            AccessModifier::Private => access.with_visibility(AccessFlags::PRIVATE),
            AccessModifier::Package => access.with_visibility(AccessFlags::empty()),
        }
    }

    /// Keyword used in `ACC:` tokens
    pub fn keyword(&self) -> &'static str {
        match self {
            AccessModifier::Unchanged => "UNCHANGED",
            AccessModifier::Public => "PUBLIC",
            AccessModifier::Protected => "PROTECTED",
            AccessModifier::Private => "PRIVATE",
            AccessModifier::Package => "PACKAGE",
        }
    }
}

impl FromStr for AccessModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNCHANGED" => Ok(AccessModifier::Unchanged),
            "PUBLIC" => Ok(AccessModifier::Public),
            "PROTECTED" => Ok(AccessModifier::Protected),
            "PRIVATE" => Ok(AccessModifier::Private),
            "PACKAGE" => Ok(AccessModifier::Package),
            other => Err(format!("unknown access modifier '{}'", other)),
        }
    }
}

impl fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a mapping says about one entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMapping {
    /// Replacement name; for nested classes this is the inner name only
    pub target_name: Option<String>,

    #[serde(default)]
    pub access: AccessModifier,

    #[serde(default)]
    pub javadoc: Option<String>,
}

impl EntryMapping {
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: Some(target_name.into()),
            ..Self::default()
        }
    }

    /// A mapping that renames nothing, overrides nothing and documents
    /// nothing. Storing one is the same as clearing the entry.
    pub fn is_empty(&self) -> bool {
        self.target_name.is_none()
            && self.access == AccessModifier::Unchanged
            && self.javadoc.is_none()
    }

    pub fn with_name(mut self, target_name: Option<String>) -> Self {
        self.target_name = target_name;
        self
    }

    pub fn with_access(mut self, access: AccessModifier) -> Self {
        self.access = access;
        self
    }

    pub fn with_javadoc(mut self, javadoc: Option<String>) -> Self {
        self.javadoc = javadoc;
        self
    }

    /// `Some(self)` unless the mapping is empty
    pub fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl TreeValue for EntryMapping {
    fn is_vacant(&self) -> bool {
        self.is_empty()
    }
}

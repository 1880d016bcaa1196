// References between entries

use super::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of reference found in a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// Invoking a method (including constructors)
    Call,

    /// Reading a field (getfield/getstatic)
    Read,

    /// Writing a field (putfield/putstatic)
    Write,

    /// Constructing an instance of a class
    Instantiation,
}

impl ReferenceKind {
    pub fn is_read(&self) -> bool {
        matches!(self, ReferenceKind::Read)
    }

    pub fn is_write(&self) -> bool {
        matches!(self, ReferenceKind::Write)
    }

    pub fn is_field_access(&self) -> bool {
        self.is_read() || self.is_write()
    }
}

/// A referenced entry paired with the entry it is used from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryReference {
    /// The entry being referenced
    pub entry: Entry,
    /// The method the reference occurs in, if known
    pub context: Option<Entry>,
}

impl EntryReference {
    pub fn new(entry: impl Into<Entry>, context: Option<Entry>) -> Self {
        Self {
            entry: entry.into(),
            context,
        }
    }
}

impl fmt::Display for EntryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} called from {}", self.entry, context),
            None => write!(f, "{}", self.entry),
        }
    }
}

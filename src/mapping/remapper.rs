// Single-writer mapping session

use super::{invert, AccessModifier, EntryMapping, EntryTree, MappingTranslator};
use crate::analysis::Relations;
use crate::entry::{ClassEntry, Entry, MethodEntry};
use crate::index::{IndexError, JarIndex};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
    #[error("Entry cannot be renamed: {0}")]
    NotRenamable(Entry),

    #[error("Illegal name '{name}': names may not contain whitespace")]
    IllegalName { name: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Edits the mappings of one indexed jar.
///
/// Every edit runs under the write lock and on a private copy of the tree
/// when snapshots are outstanding, so readers holding a [`snapshot`] see
/// either the state before an edit or the state after it.
///
/// [`snapshot`]: Remapper::snapshot
#[derive(Debug)]
pub struct Remapper {
    index: Arc<JarIndex>,
    mappings: RwLock<Arc<EntryTree<EntryMapping>>>,
}

impl Remapper {
    pub fn new(index: Arc<JarIndex>) -> Self {
        Self::with_mappings(index, EntryTree::new())
    }

    pub fn with_mappings(index: Arc<JarIndex>, mappings: EntryTree<EntryMapping>) -> Self {
        Self {
            index,
            mappings: RwLock::new(Arc::new(mappings)),
        }
    }

    pub fn index(&self) -> &Arc<JarIndex> {
        &self.index
    }

    /// The current mappings; later edits do not affect the returned tree
    pub fn snapshot(&self) -> Arc<EntryTree<EntryMapping>> {
        let guard = self.mappings.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Install a new tree wholesale, e.g. after a successful read
    pub fn replace_mappings(&self, mappings: EntryTree<EntryMapping>) {
        let mut guard = self.mappings.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(mappings);
        info!("Installed {} mappings", guard.len());
    }

    fn edit<R>(&self, f: impl FnOnce(&mut EntryTree<EntryMapping>) -> R) -> R {
        let mut guard = self.mappings.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut *guard))
    }

    /// Translates jar names to mapped names
    pub fn deobfuscating_translator(&self) -> MappingTranslator {
        MappingTranslator::new(self.snapshot()).with_index(Arc::clone(&self.index))
    }

    /// Translates mapped names back to jar names
    pub fn obfuscating_translator(&self) -> MappingTranslator {
        MappingTranslator::new(Arc::new(invert(&self.snapshot())))
    }

    /// Move a member reference to the class declaring it
    fn resolve(&self, entry: &Entry) -> Entry {
        let Some(owner) = self.index.hierarchy().resolve_entry_owner(entry) else {
            return entry.clone();
        };
        match entry {
            Entry::Field(field) => Entry::Field(field.with_owner(owner)),
            Entry::Method(method) => Entry::Method(method.with_owner(owner)),
            other => other.clone(),
        }
    }

    /// Declared in this jar and not a constructor
    pub fn is_renamable(&self, entry: &Entry) -> bool {
        let entry = self.resolve(entry);
        if let Entry::Method(method) = &entry {
            if method.is_constructor() {
                return false;
            }
        }
        self.index.contains_obf_entry(&entry)
    }

    fn checked_key(&self, entry: &Entry) -> Result<Entry, RemapError> {
        if !self.is_renamable(entry) {
            return Err(RemapError::NotRenamable(entry.clone()));
        }
        Ok(self.resolve(entry))
    }

    /// Rename one entry. An empty name, or the entry's own name, clears the
    /// rename while keeping any documentation or access override.
    pub fn rename(&self, entry: &Entry, name: &str) -> Result<(), RemapError> {
        let key = self.checked_key(entry)?;
        let target = target_for(&key, name)?;
        debug!("Renaming {} to {:?}", key, target);
        self.edit(|tree| set_name(tree, &key, target));
        Ok(())
    }

    /// Rename every related implementation of a virtual method at once.
    /// Returns how many methods were renamed.
    pub fn rename_closure(&self, method: &MethodEntry, name: &str) -> Result<usize, RemapError> {
        let entry = Entry::Method(method.clone());
        let Entry::Method(declared) = self.checked_key(&entry)? else {
            return Err(RemapError::NotRenamable(entry));
        };

        let related = Relations::new(&self.index).related_implementations(&declared)?;
        let mut keys: Vec<Entry> = related.into_iter().map(Entry::Method).collect();
        keys.sort_by_cached_key(|key| key.to_string());

        let targets = keys
            .iter()
            .map(|key| target_for(key, name))
            .collect::<Result<Vec<_>, _>>()?;

        self.edit(|tree| {
            for (key, target) in keys.iter().zip(targets) {
                set_name(tree, key, target);
            }
        });
        info!("Renamed {} related methods of {}", keys.len(), method);
        Ok(keys.len())
    }

    /// Move every top-level class currently translated into package `old`
    /// (or one of its subpackages) under `new`. Nested classes follow their
    /// outer class. Returns how many classes moved.
    pub fn rename_package(&self, old: &str, new: &str) -> Result<usize, RemapError> {
        if new.chars().any(char::is_whitespace) {
            return Err(RemapError::IllegalName {
                name: new.to_string(),
            });
        }

        let translator = MappingTranslator::new(self.snapshot());
        let moves: Vec<(ClassEntry, String)> = self
            .index
            .class_entries()
            .filter(|class| !class.is_inner())
            .filter_map(|class| {
                let current = translator.translate_class(class);
                let name = current.full_name();
                let rest = if old.is_empty() {
                    (!name.contains('/')).then_some(name)?
                } else {
                    name.strip_prefix(old)?.strip_prefix('/')?
                };
                let moved = if new.is_empty() {
                    rest.to_string()
                } else {
                    format!("{}/{}", new, rest)
                };
                Some((class.clone(), moved))
            })
            .collect();

        self.edit(|tree| {
            for (class, moved) in &moves {
                let key = Entry::Class(class.clone());
                let target = (moved != class.full_name()).then(|| moved.clone());
                set_name(tree, &key, target);
            }
        });
        info!("Moved {} classes from '{}' to '{}'", moves.len(), old, new);
        Ok(moves.len())
    }

    pub fn set_javadoc(&self, entry: &Entry, javadoc: Option<String>) -> Result<(), RemapError> {
        let key = self.declared_key(entry)?;
        let javadoc = javadoc.filter(|doc| !doc.trim().is_empty());
        self.edit(|tree| {
            let mapping = tree.get(&key).cloned().unwrap_or_default().with_javadoc(javadoc);
            tree.insert(&key, mapping.non_empty());
        });
        Ok(())
    }

    pub fn set_access(&self, entry: &Entry, access: AccessModifier) -> Result<(), RemapError> {
        let key = self.declared_key(entry)?;
        self.edit(|tree| {
            let mapping = tree.get(&key).cloned().unwrap_or_default().with_access(access);
            tree.insert(&key, mapping.non_empty());
        });
        Ok(())
    }

    /// Drop everything mapped on an entry
    pub fn remove_mapping(&self, entry: &Entry) -> Option<EntryMapping> {
        let key = self.resolve(entry);
        self.edit(|tree| tree.remove(&key))
    }

    /// Like [`checked_key`](Self::checked_key) but constructors may carry
    /// documentation and access overrides
    fn declared_key(&self, entry: &Entry) -> Result<Entry, RemapError> {
        let key = self.resolve(entry);
        if !self.index.contains_obf_entry(&key) {
            return Err(RemapError::NotRenamable(entry.clone()));
        }
        Ok(key)
    }
}

/// The target name to store for `key`, or `None` to clear it
fn target_for(key: &Entry, name: &str) -> Result<Option<String>, RemapError> {
    let name = name.trim();
    if name.chars().any(char::is_whitespace) {
        return Err(RemapError::IllegalName {
            name: name.to_string(),
        });
    }

    // Nested classes store their inner name only
    let name = match key {
        Entry::Class(class) if class.is_inner() => name.rsplit(|c| c == '$' || c == '/').next().unwrap_or(name),
        _ => name,
    };

    if name.is_empty() || name == key.name() {
        return Ok(None);
    }
    Ok(Some(name.to_string()))
}

fn set_name(tree: &mut EntryTree<EntryMapping>, key: &Entry, target: Option<String>) {
    let mapping = tree.get(key).cloned().unwrap_or_default().with_name(target);
    tree.insert(key, mapping.non_empty());
}

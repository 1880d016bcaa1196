// Superclass and interface graph

use crate::entry::{AccessFlags, ClassEntry, Entry};
use std::collections::{HashMap, HashSet, VecDeque};

/// Superclass/interface relationships of the indexed classes, plus the set
/// of declared members used to find where a referenced member really lives.
///
/// Superclasses and interfaces outside the jar are recorded as named but
/// have no entries of their own.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    /// Class -> direct superclass
    superclasses: HashMap<ClassEntry, ClassEntry>,

    /// Class -> directly implemented (or extended, for interfaces) interfaces
    interfaces: HashMap<ClassEntry, Vec<ClassEntry>>,

    /// Class -> direct subclasses
    subclasses: HashMap<ClassEntry, Vec<ClassEntry>>,

    /// Interface -> classes and interfaces that list it directly
    implementers: HashMap<ClassEntry, Vec<ClassEntry>>,

    /// Access flags of indexed classes
    class_access: HashMap<ClassEntry, AccessFlags>,

    /// Every declared field and method
    members: HashSet<Entry>,
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_class(
        &mut self,
        class: &ClassEntry,
        access: AccessFlags,
        superclass: Option<&ClassEntry>,
        interfaces: &[ClassEntry],
    ) {
        self.class_access.insert(class.clone(), access);

        if let Some(superclass) = superclass {
            self.superclasses.insert(class.clone(), superclass.clone());
            self.subclasses
                .entry(superclass.clone())
                .or_default()
                .push(class.clone());
        }

        for interface in interfaces {
            push_unique(self.interfaces.entry(class.clone()).or_default(), interface);
            push_unique(self.implementers.entry(interface.clone()).or_default(), class);
        }
    }

    pub(crate) fn add_member(&mut self, member: Entry) {
        self.members.insert(member);
    }

    pub fn contains(&self, class: &ClassEntry) -> bool {
        self.class_access.contains_key(class)
    }

    pub fn is_interface(&self, class: &ClassEntry) -> bool {
        self.class_access
            .get(class)
            .map(|access| access.is_interface())
            .unwrap_or(false)
    }

    pub fn superclass(&self, class: &ClassEntry) -> Option<&ClassEntry> {
        self.superclasses.get(class)
    }

    pub fn interfaces(&self, class: &ClassEntry) -> &[ClassEntry] {
        self.interfaces.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subclasses(&self, class: &ClassEntry) -> &[ClassEntry] {
        self.subclasses.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn implementers(&self, interface: &ClassEntry) -> &[ClassEntry] {
        self.implementers.get(interface).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Superclass chain, nearest first. External superclasses appear once
    /// (their own parents are unknown).
    pub fn ancestry(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(class.clone());

        let mut current = self.superclasses.get(class);
        while let Some(superclass) = current {
            if !seen.insert(superclass.clone()) {
                break;
            }
            chain.push(superclass.clone());
            current = self.superclasses.get(superclass);
        }
        chain
    }

    /// Every interface reachable from the class, its superclasses and
    /// their super-interfaces, in breadth-first order
    pub fn all_interfaces(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        let mut start = self.interfaces(class).to_vec();
        for level in self.ancestry(class) {
            start.extend(self.interfaces(&level).iter().cloned());
        }
        self.interface_closure(start)
    }

    /// Interfaces listed by the class itself plus their super-interfaces
    pub fn own_interfaces(&self, class: &ClassEntry) -> Vec<ClassEntry> {
        self.interface_closure(self.interfaces(class).to_vec())
    }

    fn interface_closure(&self, start: Vec<ClassEntry>) -> Vec<ClassEntry> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<ClassEntry> = start.into();

        while let Some(interface) = queue.pop_front() {
            if !seen.insert(interface.clone()) {
                continue;
            }
            queue.extend(self.interfaces(&interface).iter().cloned());
            result.push(interface);
        }
        result
    }

    /// Does `member` exist exactly as named (owner included)?
    pub fn declares(&self, member: &Entry) -> bool {
        self.members.contains(member)
    }

    /// Find the class that actually declares a referenced member: the named
    /// owner, else the nearest superclass, else an implemented interface.
    /// Returns `None` when no indexed class declares it.
    pub fn resolve_entry_owner(&self, member: &Entry) -> Option<ClassEntry> {
        let owner = match member {
            Entry::Class(class) => return Some(class.clone()),
            Entry::LocalVariable(local) => return Some(local.parent.parent.clone()),
            Entry::Field(field) => &field.parent,
            Entry::Method(method) => &method.parent,
        };

        if self.declares(member) {
            return Some(owner.clone());
        }

        let mut candidates = self.ancestry(owner);
        candidates.extend(self.all_interfaces(owner));

        let relocate = |candidate: &ClassEntry| match member {
            Entry::Field(field) => Entry::Field(field.with_owner(candidate.clone())),
            Entry::Method(method) => Entry::Method(method.with_owner(candidate.clone())),
            other => other.clone(),
        };

        candidates.into_iter().find(|candidate| self.declares(&relocate(candidate)))
    }
}

fn push_unique(list: &mut Vec<ClassEntry>, class: &ClassEntry) {
    if !list.contains(class) {
        list.push(class.clone());
    }
}

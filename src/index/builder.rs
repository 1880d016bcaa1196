// Four-phase jar indexer
//
// Phase 1 collects the known classes. Phase 2 scans class headers and
// member declarations, phase 3 scans method bodies; both run per class into
// private buffers that are merged in class order. Phase 4 detects bridge
// methods once every class has been scanned.

use super::{bridge, HierarchyIndex, IndexError, JarIndex};
use crate::classfile::{ClassNode, FieldOp, Instruction};
use crate::entry::{
    AccessFlags, ClassEntry, Entry, FieldDefEntry, FieldEntry, MethodDefEntry, MethodDescriptor,
    MethodEntry, ReferenceKind, TypeDescriptor,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Result of scanning one class header and its declarations
struct ClassScan {
    class: ClassEntry,
    access: AccessFlags,
    superclass: Option<ClassEntry>,
    interfaces: Vec<ClassEntry>,
    fields: Vec<FieldDefEntry>,
    methods: Vec<MethodDefEntry>,
    inner_pairs: Vec<(ClassEntry, ClassEntry)>,
}

/// A reference found in a method body, owner already resolved
struct RawReference {
    from: Entry,
    to: Entry,
    kind: ReferenceKind,
}

/// Builds a [`JarIndex`] from parsed classes
#[derive(Debug, Clone)]
pub struct JarIndexer {
    track_inner_classes: bool,
    parallel: bool,
}

impl JarIndexer {
    pub fn new() -> Self {
        Self {
            track_inner_classes: true,
            parallel: true,
        }
    }

    pub fn from_config(config: &crate::config::IndexConfig) -> Self {
        Self {
            track_inner_classes: config.inner_classes,
            parallel: config.parallel,
        }
    }

    /// Record outer/inner class pairs from the InnerClasses attribute
    pub fn track_inner_classes(mut self, track: bool) -> Self {
        self.track_inner_classes = track;
        self
    }

    /// Scan classes on the rayon thread pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn map_classes<'a, T, F>(&self, classes: &'a [&'a ClassNode], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&'a ClassNode) -> T + Sync + Send,
    {
        if self.parallel {
            classes.par_iter().map(|class| f(*class)).collect()
        } else {
            classes.iter().map(|class| f(*class)).collect()
        }
    }

    /// Run all phases and return the finished index
    pub fn build(&self, classes: &[ClassNode]) -> Result<JarIndex, IndexError> {
        let mut index = JarIndex::default();

        // Phase 1: known classes. The first class file for a name wins.
        let mut units: Vec<&ClassNode> = Vec::with_capacity(classes.len());
        for node in classes {
            if index.classes.insert(ClassEntry::new(node.name.as_str())) {
                units.push(node);
            } else {
                warn!("Duplicate class file ignored: {}", node.name);
            }
        }
        units.sort_by(|a, b| a.name.cmp(&b.name));
        info!("Indexing {} classes...", units.len());

        // Phase 2: declarations
        let scans = self
            .map_classes(&units, scan_declarations)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        for scan in scans {
            self.merge_declarations(&mut index, scan);
        }
        debug!("Indexed {} declared entries", index.access.len());

        // Phase 3: method bodies, resolved against the finished hierarchy
        let hierarchy = &index.hierarchy;
        let buffers = self.map_classes(&units, |node| scan_references(node, hierarchy));
        for reference in buffers.into_iter().flatten() {
            index
                .references
                .add_reference(&reference.from, &reference.to, reference.kind);
        }
        info!("Indexed {} references", index.references.reference_count());

        // Phase 4: bridges, over the complete method universe
        for (bridge, target) in bridge::detect_bridges(&index) {
            debug!("Bridge {} -> {}", bridge, target);
            index.bridges_by_target.insert(target.clone(), bridge.clone());
            index.bridged_methods.insert(bridge, target);
        }
        info!("Found {} bridge methods", index.bridged_methods.len());

        Ok(index)
    }

    fn merge_declarations(&self, index: &mut JarIndex, scan: ClassScan) {
        let ClassScan {
            class,
            access,
            superclass,
            interfaces,
            fields,
            methods,
            inner_pairs,
        } = scan;

        index.access.insert(Entry::Class(class.clone()), access);
        index
            .hierarchy
            .add_class(&class, access, superclass.as_ref(), &interfaces);

        for field in &fields {
            let entry = Entry::Field(field.entry.clone());
            index.access.insert(entry.clone(), field.access);
            index.hierarchy.add_member(entry);
        }

        for method in &methods {
            let entry = Entry::Method(method.entry.clone());
            index.access.insert(entry.clone(), method.access);
            index.hierarchy.add_member(entry);

            if method.access.is_synthetic() {
                index.synthetic_methods.insert(method.entry.clone());
            }
            if !method.entry.is_constructor() {
                index
                    .method_implementations
                    .entry(class.clone())
                    .or_default()
                    .push(method.entry.clone());
            }
        }

        index.fields.insert(class.clone(), fields);
        index.methods.insert(class, methods);

        if self.track_inner_classes {
            for (outer, inner) in inner_pairs {
                if !index.classes.contains(&inner) {
                    continue;
                }
                let nested = index.inner_classes_by_outer.entry(outer.clone()).or_default();
                if !nested.contains(&inner) {
                    nested.push(inner.clone());
                }
                index.outer_classes_by_inner.entry(inner).or_insert(outer);
            }
        }
    }
}

impl Default for JarIndexer {
    fn default() -> Self {
        Self::new()
    }
}

fn scan_declarations(node: &ClassNode) -> Result<ClassScan, IndexError> {
    let class = ClassEntry::new(node.name.as_str());

    let mut interfaces = Vec::with_capacity(node.interfaces.len());
    for name in &node.interfaces {
        if *name == node.name {
            return Err(IndexError::SelfInterface { class });
        }
        interfaces.push(ClassEntry::new(name.as_str()));
    }

    let fields = node
        .fields
        .iter()
        .map(|field| {
            FieldDefEntry::new(
                FieldEntry::new(
                    class.clone(),
                    field.name.as_str(),
                    TypeDescriptor::new(field.desc.as_str()),
                ),
                field.access,
            )
        })
        .collect();

    let methods = node
        .methods
        .iter()
        .map(|method| {
            MethodDefEntry::new(
                MethodEntry::new(
                    class.clone(),
                    method.name.as_str(),
                    MethodDescriptor::new(method.desc.as_str()),
                ),
                method.access,
            )
        })
        .collect();

    let inner_pairs = node
        .inner_classes
        .iter()
        .filter_map(|row| {
            let outer = row.outer.as_deref()?;
            Some((ClassEntry::new(outer), ClassEntry::new(row.inner.as_str())))
        })
        .collect();

    Ok(ClassScan {
        class: class.clone(),
        access: node.access,
        superclass: node.super_name.as_deref().map(ClassEntry::new),
        interfaces,
        fields,
        methods,
        inner_pairs,
    })
}

fn scan_references(node: &ClassNode, hierarchy: &HierarchyIndex) -> Vec<RawReference> {
    let class = ClassEntry::new(node.name.as_str());
    let mut found = Vec::new();

    for method in &node.methods {
        let caller = Entry::Method(MethodEntry::new(
            class.clone(),
            method.name.as_str(),
            MethodDescriptor::new(method.desc.as_str()),
        ));

        for instruction in &method.instructions {
            let (target, kind) = match instruction {
                Instruction::Field { op, owner, name, desc } => {
                    let field = FieldEntry::new(
                        ClassEntry::new(owner.as_str()),
                        name.as_str(),
                        TypeDescriptor::new(desc.as_str()),
                    );
                    let kind = match op {
                        FieldOp::Get => ReferenceKind::Read,
                        FieldOp::Put => ReferenceKind::Write,
                    };
                    (resolve(Entry::Field(field), hierarchy), kind)
                }
                Instruction::Invoke { owner, name, desc, .. } => {
                    let callee = MethodEntry::new(
                        ClassEntry::new(owner.as_str()),
                        name.as_str(),
                        MethodDescriptor::new(desc.as_str()),
                    );
                    (resolve(Entry::Method(callee), hierarchy), ReferenceKind::Call)
                }
            };

            if let Entry::Method(callee) = &target {
                if callee.name == crate::entry::CONSTRUCTOR_NAME {
                    found.push(RawReference {
                        from: caller.clone(),
                        to: Entry::Class(callee.parent.clone()),
                        kind: ReferenceKind::Instantiation,
                    });
                }
            }
            found.push(RawReference {
                from: caller.clone(),
                to: target,
                kind,
            });
        }
    }
    found
}

/// Move a member reference onto its declaring class. Unresolvable owners
/// (external or missing) keep the literally named owner.
fn resolve(member: Entry, hierarchy: &HierarchyIndex) -> Entry {
    let Some(owner) = hierarchy.resolve_entry_owner(&member) else {
        return member;
    };
    match member {
        Entry::Field(field) if field.parent != owner => Entry::Field(field.with_owner(owner)),
        Entry::Method(method) if method.parent != owner => Entry::Method(method.with_owner(owner)),
        other => other,
    }
}

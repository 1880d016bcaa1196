// Inheritance and implementation trees

use super::Relations;
use crate::entry::{ClassEntry, MethodEntry};
use serde::Serialize;
use std::collections::HashSet;

/// A class and its known subclasses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInheritanceNode {
    pub class: ClassEntry,
    pub children: Vec<ClassInheritanceNode>,
}

impl ClassInheritanceNode {
    /// Find the node for `class` anywhere in this subtree
    pub fn find(&self, class: &ClassEntry) -> Option<&ClassInheritanceNode> {
        if self.class == *class {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(class))
    }

    /// Number of nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ClassInheritanceNode::count).sum::<usize>()
    }
}

/// An interface and the classes implementing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassImplementationsNode {
    pub class: ClassEntry,
    pub children: Vec<ClassImplementationsNode>,
}

/// A method in one class of an override tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInheritanceNode {
    pub method: MethodEntry,
    /// The class declares the method itself rather than inheriting it
    pub implemented: bool,
    pub children: Vec<MethodInheritanceNode>,
}

impl MethodInheritanceNode {
    pub fn find(&self, method: &MethodEntry) -> Option<&MethodInheritanceNode> {
        if self.method == *method {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(method))
    }

    /// Every method in this subtree, pre-order
    pub fn methods(&self) -> Vec<&MethodEntry> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(&node.method);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// An interface method and its implementations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodImplementationsNode {
    pub method: MethodEntry,
    pub children: Vec<MethodImplementationsNode>,
}

impl<'a> Relations<'a> {
    /// Inheritance tree rooted at the most distant ancestor of `class` that
    /// is still in the jar
    pub fn class_inheritance(&self, class: &ClassEntry) -> ClassInheritanceNode {
        let mut root = class.clone();
        for ancestor in self.index.hierarchy().ancestry(class) {
            if self.index.contains_obf_class(&ancestor) {
                root = ancestor;
            }
        }
        let mut visited = HashSet::new();
        self.class_subtree(root, &mut visited)
    }

    fn class_subtree(&self, class: ClassEntry, visited: &mut HashSet<ClassEntry>) -> ClassInheritanceNode {
        visited.insert(class.clone());
        let mut subclasses = self.index.hierarchy().subclasses(&class).to_vec();
        subclasses.sort();

        let mut children = Vec::with_capacity(subclasses.len());
        for sub in subclasses {
            if !visited.contains(&sub) {
                children.push(self.class_subtree(sub, visited));
            }
        }
        ClassInheritanceNode { class, children }
    }

    /// Implementing classes of an interface; `None` for non-interfaces
    pub fn class_implementations(&self, interface: &ClassEntry) -> Option<ClassImplementationsNode> {
        if !self.index.is_interface(interface) {
            return None;
        }
        let children = self
            .implementing_classes(interface)
            .into_iter()
            .map(|class| ClassImplementationsNode {
                class,
                children: Vec::new(),
            })
            .collect();
        Some(ClassImplementationsNode {
            class: interface.clone(),
            children,
        })
    }

    /// Override tree of a method, rooted at its base declaration
    pub fn method_inheritance(&self, method: &MethodEntry) -> MethodInheritanceNode {
        let base = self.find_base_method(method);
        let mut visited = HashSet::new();
        self.method_subtree(base, &mut visited)
    }

    fn method_subtree(
        &self,
        method: MethodEntry,
        visited: &mut HashSet<ClassEntry>,
    ) -> MethodInheritanceNode {
        let hierarchy = self.index.hierarchy();
        visited.insert(method.parent.clone());

        let mut below: Vec<ClassEntry> = hierarchy
            .subclasses(&method.parent)
            .iter()
            .chain(hierarchy.implementers(&method.parent))
            .filter(|class| !visited.contains(*class))
            .cloned()
            .collect();
        below.sort();
        below.dedup();

        let mut children = Vec::with_capacity(below.len());
        for class in below {
            if visited.contains(&class) {
                continue;
            }
            children.push(self.method_subtree(method.with_owner(class), visited));
        }

        MethodInheritanceNode {
            implemented: self.index.contains_obf_method(&method),
            method,
            children,
        }
    }

    /// Interface declarations of `method` (from its class, or the method
    /// itself when declared on an interface) with their implementations
    pub fn method_implementations(&self, method: &MethodEntry) -> Vec<MethodImplementationsNode> {
        let interfaces = if self.index.is_interface(&method.parent) {
            vec![method.parent.clone()]
        } else {
            self.index.hierarchy().all_interfaces(&method.parent)
        };

        interfaces
            .into_iter()
            .map(|interface| method.with_owner(interface))
            .filter(|declared| self.index.contains_obf_method(declared))
            .map(|declared| {
                let children = self
                    .implementing_classes(&declared.parent)
                    .into_iter()
                    .map(|class| declared.with_owner(class))
                    .filter(|implementation| self.index.contains_obf_method(implementation))
                    .map(|implementation| MethodImplementationsNode {
                        method: implementation,
                        children: Vec::new(),
                    })
                    .collect();
                MethodImplementationsNode {
                    method: declared,
                    children,
                }
            })
            .collect()
    }
}

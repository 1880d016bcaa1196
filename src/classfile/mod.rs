//! Structural model of JVM class files
//!
//! A [`ClassNode`] is the raw, obfuscated view of one class: its header,
//! declared members and the member references made from method bodies.
//! Nodes come from [`reader::parse_class`] or, in tests, are built by hand.

pub mod reader;
mod source;

pub use reader::{parse_class, ClassFileError};
pub use source::ClassSource;

use crate::entry::AccessFlags;

/// How a field instruction touches its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    Get,
    Put,
}

/// Invocation opcode family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// A member reference made from a method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Field {
        op: FieldOp,
        owner: String,
        name: String,
        desc: String,
    },
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        desc: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub access: AccessFlags,
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNode {
    pub access: AccessFlags,
    pub name: String,
    pub desc: String,
    pub instructions: Vec<Instruction>,
}

impl MethodNode {
    pub fn new(access: AccessFlags, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            desc: desc.into(),
            instructions: Vec::new(),
        }
    }

    pub fn invoke(
        mut self,
        kind: InvokeKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        self.instructions.push(Instruction::Invoke {
            kind,
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        });
        self
    }

    pub fn field(
        mut self,
        op: FieldOp,
        owner: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        self.instructions.push(Instruction::Field {
            op,
            owner: owner.into(),
            name: name.into(),
            desc: desc.into(),
        });
        self
    }
}

/// One row of the InnerClasses attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassNode {
    pub inner: String,
    pub outer: Option<String>,
    pub inner_name: Option<String>,
    pub access: AccessFlags,
}

/// A parsed class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub name: String,
    pub access: AccessFlags,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
    pub inner_classes: Vec<InnerClassNode>,
}

impl ClassNode {
    /// A public class extending `java/lang/Object` with no members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_field(
        mut self,
        access: AccessFlags,
        name: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldNode {
            access,
            name: name.into(),
            desc: desc.into(),
        });
        self
    }

    pub fn with_method(mut self, method: MethodNode) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_inner_class(mut self, inner: impl Into<String>, outer: Option<&str>) -> Self {
        let inner = inner.into();
        let inner_name = inner.rsplit('$').next().map(str::to_string);
        self.inner_classes.push(InnerClassNode {
            inner,
            outer: outer.map(str::to_string),
            inner_name,
            access: AccessFlags::empty(),
        });
        self
    }
}

// Class file reader: header, members, member references made from method
// bodies and the InnerClasses attribute.

use super::{
    ClassNode, FieldNode, FieldOp, InnerClassNode, Instruction, InvokeKind, MethodNode,
};
use crate::entry::AccessFlags;
use jclassfile::attributes::{Attribute, InnerClassRecord};
use jclassfile::class_file;
use jclassfile::constant_pool::ConstantPool;
use jdescriptor::{MethodDescriptor, TypeDescriptor};
use std::str::FromStr;
use thiserror::Error;

mod opcodes {
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const LDC2_W: u8 = 0x14;
    pub const GOTO: u8 = 0xa7;
    pub const JSR: u8 = 0xa8;
    pub const GOTO_W: u8 = 0xc8;
    pub const JSR_W: u8 = 0xc9;
}

/// Class file parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("Malformed class file: {0}")]
    Malformed(String),

    #[error("Bytecode truncated at offset {0}")]
    Truncated(usize),

    #[error("Constant pool index {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },

    #[error("Invalid descriptor `{0}`")]
    BadDescriptor(String),

    #[error("Unsupported opcode {opcode:#04x} at offset {offset}")]
    BadOpcode { opcode: u8, offset: usize },
}

type Result<T> = std::result::Result<T, ClassFileError>;

fn utf8(pool: &[ConstantPool], index: u16) -> Result<&str> {
    match pool.get(index as usize) {
        Some(ConstantPool::Utf8 { value }) => Ok(value),
        _ => Err(ClassFileError::BadConstant { index, expected: "utf8" }),
    }
}

fn class_name(pool: &[ConstantPool], index: u16) -> Result<&str> {
    match pool.get(index as usize) {
        Some(ConstantPool::Class { name_index }) => utf8(pool, *name_index),
        _ => Err(ClassFileError::BadConstant { index, expected: "class" }),
    }
}

fn optional_class_name(pool: &[ConstantPool], index: u16) -> Result<Option<String>> {
    if index == 0 {
        return Ok(None);
    }
    class_name(pool, index).map(|name| Some(name.to_string()))
}

/// Resolve a Fieldref/Methodref/InterfaceMethodref to (owner, name, desc)
fn member_ref(pool: &[ConstantPool], index: u16) -> Result<(String, String, String)> {
    let (class_index, name_and_type_index) = match pool.get(index as usize) {
        Some(ConstantPool::Fieldref {
            class_index,
            name_and_type_index,
        })
        | Some(ConstantPool::Methodref {
            class_index,
            name_and_type_index,
        })
        | Some(ConstantPool::InterfaceMethodref {
            class_index,
            name_and_type_index,
        }) => (*class_index, *name_and_type_index),
        _ => return Err(ClassFileError::BadConstant { index, expected: "member ref" }),
    };
    let (name_index, descriptor_index) = match pool.get(name_and_type_index as usize) {
        Some(ConstantPool::NameAndType {
            name_index,
            descriptor_index,
        }) => (*name_index, *descriptor_index),
        _ => {
            return Err(ClassFileError::BadConstant {
                index: name_and_type_index,
                expected: "name and type",
            })
        }
    };
    Ok((
        class_name(pool, class_index)?.to_string(),
        utf8(pool, name_index)?.to_string(),
        utf8(pool, descriptor_index)?.to_string(),
    ))
}

fn field_descriptor(pool: &[ConstantPool], index: u16) -> Result<String> {
    let desc = utf8(pool, index)?;
    TypeDescriptor::from_str(desc).map_err(|_| ClassFileError::BadDescriptor(desc.to_string()))?;
    Ok(desc.to_string())
}

fn method_descriptor(pool: &[ConstantPool], index: u16) -> Result<String> {
    let desc = utf8(pool, index)?;
    MethodDescriptor::from_str(desc)
        .map_err(|_| ClassFileError::BadDescriptor(desc.to_string()))?;
    Ok(desc.to_string())
}

/// Parse a class file into its structural model
pub fn parse_class(data: &[u8]) -> Result<ClassNode> {
    let class_file =
        class_file::parse(data).map_err(|e| ClassFileError::Malformed(format!("{e}")))?;
    let pool = class_file.constant_pool();

    let name = class_name(pool, class_file.this_class())?.to_string();
    let super_name = optional_class_name(pool, class_file.super_class())?;
    let mut interfaces = Vec::with_capacity(class_file.interfaces().len());
    for interface in class_file.interfaces() {
        interfaces.push(class_name(pool, *interface)?.to_string());
    }

    let mut fields = Vec::with_capacity(class_file.fields().len());
    for field in class_file.fields() {
        fields.push(FieldNode {
            access: AccessFlags::new(field.access_flags().bits()),
            name: utf8(pool, field.name_index())?.to_string(),
            desc: field_descriptor(pool, field.descriptor_index())?,
        });
    }

    let mut methods = Vec::with_capacity(class_file.methods().len());
    for method in class_file.methods() {
        let mut node = MethodNode::new(
            AccessFlags::new(method.access_flags().bits()),
            utf8(pool, method.name_index())?,
            method_descriptor(pool, method.descriptor_index())?,
        );
        let code = method.attributes().iter().find_map(|attribute| match attribute {
            Attribute::Code { code, .. } => Some(code),
            _ => None,
        });
        if let Some(code) = code {
            node.instructions = parse_bytecode(code, pool)?;
        }
        methods.push(node);
    }

    let mut inner_classes = Vec::new();
    for attribute in class_file.attributes() {
        if let Attribute::InnerClasses { classes } = attribute {
            inner_classes = parse_inner_classes(classes, pool)?;
        }
    }

    Ok(ClassNode {
        name,
        access: AccessFlags::new(class_file.access_flags().bits()),
        super_name,
        interfaces,
        fields,
        methods,
        inner_classes,
    })
}

fn parse_bytecode(code: &[u8], pool: &[ConstantPool]) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut offset = 0usize;
    while offset < code.len() {
        let opcode = code[offset];
        let length = opcode_length(code, offset)?;
        if offset + length > code.len() {
            return Err(ClassFileError::Truncated(offset));
        }
        match opcode {
            opcodes::GETSTATIC | opcodes::PUTSTATIC | opcodes::GETFIELD | opcodes::PUTFIELD => {
                let (owner, name, desc) = member_ref(pool, read_u16(code, offset + 1)?)?;
                let op = match opcode {
                    opcodes::GETSTATIC | opcodes::GETFIELD => FieldOp::Get,
                    _ => FieldOp::Put,
                };
                instructions.push(Instruction::Field { op, owner, name, desc });
            }
            opcodes::INVOKEVIRTUAL
            | opcodes::INVOKESPECIAL
            | opcodes::INVOKESTATIC
            | opcodes::INVOKEINTERFACE => {
                let (owner, name, desc) = member_ref(pool, read_u16(code, offset + 1)?)?;
                let kind = match opcode {
                    opcodes::INVOKEVIRTUAL => InvokeKind::Virtual,
                    opcodes::INVOKESPECIAL => InvokeKind::Special,
                    opcodes::INVOKESTATIC => InvokeKind::Static,
                    _ => InvokeKind::Interface,
                };
                instructions.push(Instruction::Invoke { kind, owner, name, desc });
            }
            _ => {}
        }
        offset += length;
    }
    Ok(instructions)
}

fn parse_inner_classes(
    records: &[InnerClassRecord],
    pool: &[ConstantPool],
) -> Result<Vec<InnerClassNode>> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let name_index = record.inner_name_index();
        let inner_name = if name_index == 0 {
            None
        } else {
            Some(utf8(pool, name_index)?.to_string())
        };
        rows.push(InnerClassNode {
            inner: class_name(pool, record.inner_class_info_index())?.to_string(),
            outer: optional_class_name(pool, record.outer_class_info_index())?,
            inner_name,
            access: AccessFlags::new(record.inner_class_access_flags().bits()),
        });
    }
    Ok(rows)
}

/// Length in bytes of the instruction starting at `offset`
pub(crate) fn opcode_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = code[offset];
    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        opcodes::LDC => 2,
        opcodes::LDC_W | opcodes::LDC2_W => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        0x84 => 3,
        0x85..=0x98 => 1,
        0x99..=0xa6 => 3,
        opcodes::GOTO | opcodes::JSR => 3,
        0xa9 => 2,
        0xaa => tableswitch_length(code, offset)?,
        0xab => lookupswitch_length(code, offset)?,
        0xac..=0xb1 => 1,
        0xb2..=0xb5 => 3,
        opcodes::INVOKEVIRTUAL | opcodes::INVOKESPECIAL | opcodes::INVOKESTATIC => 3,
        opcodes::INVOKEINTERFACE | opcodes::INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        0xc4 => wide_length(code, offset)?,
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        opcodes::GOTO_W | opcodes::JSR_W => 5,
        0xca | 0xfe | 0xff => 1,
        _ => return Err(ClassFileError::BadOpcode { opcode, offset }),
    };
    Ok(length)
}

fn tableswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let low = read_i32(code, base + 4)?;
    let high = read_i32(code, base + 8)?;
    let count = high
        .checked_sub(low)
        .and_then(|v| v.checked_add(1))
        .filter(|count| *count >= 0)
        .ok_or(ClassFileError::BadOpcode { opcode: 0xaa, offset })?;
    Ok(1 + padding + 12 + (count as usize) * 4)
}

fn lookupswitch_length(code: &[u8], offset: usize) -> Result<usize> {
    let padding = padding(offset);
    let base = offset + 1 + padding;
    let npairs = read_i32(code, base + 4)?;
    if npairs < 0 {
        return Err(ClassFileError::BadOpcode { opcode: 0xab, offset });
    }
    Ok(1 + padding + 8 + (npairs as usize) * 8)
}

fn wide_length(code: &[u8], offset: usize) -> Result<usize> {
    let opcode = code
        .get(offset + 1)
        .copied()
        .ok_or(ClassFileError::Truncated(offset))?;
    if opcode == 0x84 {
        Ok(6)
    } else {
        Ok(4)
    }
}

fn padding(offset: usize) -> usize {
    (4 - ((offset + 1) % 4)) % 4
}

fn read_u16(code: &[u8], offset: usize) -> Result<u16> {
    let slice = code
        .get(offset..offset + 2)
        .ok_or(ClassFileError::Truncated(offset))?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_i32(code: &[u8], offset: usize) -> Result<i32> {
    let slice = code
        .get(offset..offset + 4)
        .ok_or(ClassFileError::Truncated(offset))?;
    Ok(i32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

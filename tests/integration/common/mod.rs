//! Test support: assembles real class files and packs them into jars.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

pub const GETFIELD: u8 = 0xb4;
pub const PUTFIELD: u8 = 0xb5;
pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;

/// One member-referencing instruction
#[derive(Debug, Clone)]
pub struct Op {
    pub opcode: u8,
    pub owner: String,
    pub name: String,
    pub desc: String,
}

pub fn op(opcode: u8, owner: &str, name: &str, desc: &str) -> Op {
    Op {
        opcode,
        owner: owner.to_string(),
        name: name.to_string(),
        desc: desc.to_string(),
    }
}

#[derive(Debug, Clone)]
struct MethodSpec {
    access: u16,
    name: String,
    desc: String,
    code: Vec<Op>,
}

#[derive(Debug, Clone)]
struct InnerSpec {
    inner: String,
    outer: Option<String>,
    name: Option<String>,
}

/// Builder for a single class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    name: String,
    access: u16,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(u16, String, String)>,
    methods: Vec<MethodSpec>,
    inner_classes: Vec<InnerSpec>,
}

impl ClassFile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: ACC_PUBLIC | ACC_SUPER,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn field(mut self, access: u16, name: &str, desc: &str) -> Self {
        self.fields.push((access, name.to_string(), desc.to_string()));
        self
    }

    pub fn method(mut self, access: u16, name: &str, desc: &str, code: Vec<Op>) -> Self {
        self.methods.push(MethodSpec {
            access,
            name: name.to_string(),
            desc: desc.to_string(),
            code,
        });
        self
    }

    pub fn inner_class(mut self, inner: &str, outer: Option<&str>) -> Self {
        self.inner_classes.push(InnerSpec {
            inner: inner.to_string(),
            outer: outer.map(str::to_string),
            name: inner.rsplit('$').next().map(str::to_string),
        });
        self
    }

    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name)
    }

    /// Assemble the class file bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = Pool::default();

        let this_class = pool.class(&self.name);
        let super_class = self.super_name.as_deref().map_or(0, |s| pool.class(s));
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let mut body = Vec::new();
        put_u16(&mut body, self.access);
        put_u16(&mut body, this_class);
        put_u16(&mut body, super_class);
        put_u16(&mut body, interfaces.len() as u16);
        for index in interfaces {
            put_u16(&mut body, index);
        }

        put_u16(&mut body, self.fields.len() as u16);
        for (access, name, desc) in &self.fields {
            put_u16(&mut body, *access);
            put_u16(&mut body, pool.utf8(name));
            put_u16(&mut body, pool.utf8(desc));
            put_u16(&mut body, 0);
        }

        put_u16(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            put_u16(&mut body, method.access);
            put_u16(&mut body, pool.utf8(&method.name));
            put_u16(&mut body, pool.utf8(&method.desc));

            if method.access & ACC_ABSTRACT != 0 {
                put_u16(&mut body, 0);
                continue;
            }

            let mut code = Vec::new();
            for op in &method.code {
                let tag = if op.opcode == GETFIELD || op.opcode == PUTFIELD {
                    9
                } else if op.opcode == INVOKEINTERFACE {
                    11
                } else {
                    10
                };
                let index = pool.member_ref(tag, &op.owner, &op.name, &op.desc);
                code.push(op.opcode);
                put_u16(&mut code, index);
                if op.opcode == INVOKEINTERFACE {
                    code.extend_from_slice(&[1, 0]);
                }
            }
            code.push(0xb1); // return

            let mut attribute = Vec::new();
            put_u16(&mut attribute, 8); // max_stack
            put_u16(&mut attribute, 8); // max_locals
            put_u32(&mut attribute, code.len() as u32);
            attribute.extend_from_slice(&code);
            put_u16(&mut attribute, 0); // exception table
            put_u16(&mut attribute, 0); // attributes

            put_u16(&mut body, 1);
            put_u16(&mut body, pool.utf8("Code"));
            put_u32(&mut body, attribute.len() as u32);
            body.extend_from_slice(&attribute);
        }

        if self.inner_classes.is_empty() {
            put_u16(&mut body, 0);
        } else {
            let mut attribute = Vec::new();
            put_u16(&mut attribute, self.inner_classes.len() as u16);
            for row in &self.inner_classes {
                put_u16(&mut attribute, pool.class(&row.inner));
                put_u16(&mut attribute, row.outer.as_deref().map_or(0, |o| pool.class(o)));
                put_u16(&mut attribute, row.name.as_deref().map_or(0, |n| pool.utf8(n)));
                put_u16(&mut attribute, ACC_PUBLIC | ACC_STATIC);
            }
            put_u16(&mut body, 1);
            put_u16(&mut body, pool.utf8("InnerClasses"));
            put_u32(&mut body, attribute.len() as u32);
            body.extend_from_slice(&attribute);
        }

        let mut out = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 52];
        put_u16(&mut out, pool.count + 1);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    seen: HashMap<(u8, String), u16>,
}

impl Pool {
    fn add(&mut self, key: (u8, String), encoded: Vec<u8>) -> u16 {
        if let Some(index) = self.seen.get(&key) {
            return *index;
        }
        self.bytes.extend_from_slice(&encoded);
        self.count += 1;
        self.seen.insert(key, self.count);
        self.count
    }

    /// Utf8 constants hold modified UTF-8
    fn utf8(&mut self, value: &str) -> u16 {
        let bytes = cesu8::to_java_cesu8(value);
        let mut encoded = vec![1];
        put_u16(&mut encoded, bytes.len() as u16);
        encoded.extend_from_slice(&bytes);
        self.add((1, value.to_string()), encoded)
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        let mut encoded = vec![7];
        put_u16(&mut encoded, name_index);
        self.add((7, name.to_string()), encoded)
    }

    fn name_and_type(&mut self, name: &str, desc: &str) -> u16 {
        let name_index = self.utf8(name);
        let desc_index = self.utf8(desc);
        let mut encoded = vec![12];
        put_u16(&mut encoded, name_index);
        put_u16(&mut encoded, desc_index);
        self.add((12, format!("{} {}", name, desc)), encoded)
    }

    fn member_ref(&mut self, tag: u8, owner: &str, name: &str, desc: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, desc);
        let mut encoded = vec![tag];
        put_u16(&mut encoded, class_index);
        put_u16(&mut encoded, nat_index);
        self.add((tag, format!("{}.{}{}", owner, name, desc)), encoded)
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Write `classes` into a jar at `dir/name`, plus a manifest and any
/// `extra` raw entries
pub fn write_jar(dir: &Path, name: &str, classes: &[ClassFile], extra: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("create jar");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
    zip.write_all(b"Manifest-Version: 1.0\n").unwrap();

    for class in classes {
        zip.start_file(class.entry_name(), options).unwrap();
        zip.write_all(&class.to_bytes()).unwrap();
    }
    for (entry, bytes) in extra {
        zip.start_file(*entry, options).unwrap();
        zip.write_all(bytes).unwrap();
    }

    zip.finish().unwrap();
    path
}

/// A small obfuscated program exercising every kind of relationship:
///
/// - `a` is an interface with `a.a()Ljava/lang/Object;`
/// - `b` implements `a`, returning `Ljava/lang/String;` with a bridge
/// - `c` extends `b` and overrides `a()Ljava/lang/String;`
/// - `d` calls `b.a` and constructs `c`; `d$e` is nested in `d`
pub fn sample_classes() -> Vec<ClassFile> {
    vec![
        ClassFile::interface("a").method(
            ACC_PUBLIC | ACC_ABSTRACT,
            "a",
            "()Ljava/lang/Object;",
            vec![],
        ),
        ClassFile::new("b")
            .implements("a")
            .field(ACC_PRIVATE, "a", "I")
            .method(
                ACC_PUBLIC,
                "<init>",
                "()V",
                vec![op(INVOKESPECIAL, "java/lang/Object", "<init>", "()V")],
            )
            .method(
                ACC_PUBLIC,
                "a",
                "()Ljava/lang/String;",
                vec![op(GETFIELD, "b", "a", "I")],
            )
            .method(
                ACC_PUBLIC | ACC_SYNTHETIC | ACC_BRIDGE,
                "a",
                "()Ljava/lang/Object;",
                vec![op(INVOKEVIRTUAL, "b", "a", "()Ljava/lang/String;")],
            ),
        ClassFile::new("c")
            .extends("b")
            .method(
                ACC_PUBLIC,
                "<init>",
                "()V",
                vec![op(INVOKESPECIAL, "b", "<init>", "()V")],
            )
            .method(ACC_PUBLIC, "a", "()Ljava/lang/String;", vec![]),
        ClassFile::new("d")
            .inner_class("d$e", Some("d"))
            .method(
                ACC_PUBLIC | ACC_STATIC,
                "a",
                "(Lb;)V",
                vec![
                    op(INVOKESPECIAL, "c", "<init>", "()V"),
                    op(INVOKEVIRTUAL, "b", "a", "()Ljava/lang/String;"),
                ],
            )
            .method(
                ACC_PUBLIC | ACC_STATIC,
                "b",
                "(Lc;)V",
                vec![op(INVOKEVIRTUAL, "c", "a", "()Ljava/lang/String;")],
            ),
        ClassFile::new("d$e").inner_class("d$e", Some("d")),
    ]
}

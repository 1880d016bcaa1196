// Tiny v1 mappings
//
// Format (tab separated):
// ```
// v1	official	named
// CLASS	a	pkg/Outer
// CLASS	a$b	pkg/Outer$Inner
// FIELD	a	I	c	count
// METHOD	a	(I)V	d	run
// MTH-ARG	a	(I)V	d	1	times
// ```
//
// Class rows carry full names on both sides. Files with more than two
// namespaces are read from the first namespace to the last.

use super::MappingError;
use crate::entry::{
    ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodDescriptor, MethodEntry,
    TypeDescriptor,
};
use crate::mapping::{EntryMapping, EntryTree, MappingTranslator};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

pub const VERSION: &str = "v1";

/// Parse tiny v1 text
pub fn parse_content(content: &str) -> Result<EntryTree<EntryMapping>, MappingError> {
    let mut lines = content.lines().enumerate();

    let namespaces = match lines.next() {
        Some((_, header)) => {
            let columns: Vec<&str> = header.split('\t').collect();
            if columns.first() != Some(&VERSION) || columns.len() < 3 {
                return Err(MappingError::parse(1, header, "expected a v1 header with two namespaces"));
            }
            columns.len() - 1
        }
        None => return Ok(EntryTree::new()),
    };

    let mut tree = EntryTree::new();
    for (idx, line) in lines {
        let line_number = idx + 1;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').collect();
        let parsed = match columns[0] {
            "CLASS" => parse_class(&columns[1..], namespaces),
            "FIELD" => parse_member(&columns[1..], namespaces, false),
            "METHOD" => parse_member(&columns[1..], namespaces, true),
            "MTH-ARG" => parse_arg(&columns[1..], namespaces),
            other => {
                warn!("Skipping unknown tiny row {} at line {}", other, line_number);
                continue;
            }
        };
        let (entry, target) =
            parsed.map_err(|message| MappingError::parse(line_number, line, message))?;

        if let Some(existing) = tree.get(&entry).and_then(|m: &EntryMapping| m.target_name.clone()) {
            if existing != target {
                return Err(MappingError::Conflict {
                    entry,
                    existing,
                    incoming: target,
                });
            }
            continue;
        }
        if target != entry.name() {
            tree.insert(&entry, Some(EntryMapping::new(target)));
        }
    }
    Ok(tree)
}

type ParsedRow = Result<(Entry, String), String>;

/// Check the column count of a row and return its last column, the name in
/// the target namespace
fn target_column<'a>(columns: &[&'a str], expected: usize) -> Result<&'a str, String> {
    if columns.len() != expected {
        return Err(format!(
            "expected {} columns, found {}",
            expected + 1,
            columns.len() + 1
        ));
    }
    match columns.last() {
        Some(target) if !target.is_empty() => Ok(*target),
        _ => Err("empty target name".to_string()),
    }
}

fn parse_class(columns: &[&str], namespaces: usize) -> ParsedRow {
    let target = target_column(columns, namespaces)?;
    let class = ClassEntry::new(columns[0]);
    // The tree stores the inner name only for nested classes
    let target = if class.is_inner() {
        ClassEntry::new(target).name().to_string()
    } else {
        target.to_string()
    };
    Ok((Entry::Class(class), target))
}

fn parse_member(columns: &[&str], namespaces: usize, method: bool) -> ParsedRow {
    // owner, descriptor, then one name per namespace
    let target = target_column(columns, 2 + namespaces)?;
    let owner = ClassEntry::new(columns[0]);
    let entry = if method {
        Entry::Method(MethodEntry::new(owner, columns[2], MethodDescriptor::new(columns[1])))
    } else {
        Entry::Field(FieldEntry::new(owner, columns[2], TypeDescriptor::new(columns[1])))
    };
    Ok((entry, target.to_string()))
}

fn parse_arg(columns: &[&str], namespaces: usize) -> ParsedRow {
    // owner, descriptor, method, index, then one name per namespace past the first
    let target = target_column(columns, 3 + namespaces)?;
    let index: u16 = columns[3]
        .parse()
        .map_err(|_| format!("invalid argument index '{}'", columns[3]))?;
    let method = MethodEntry::new(
        ClassEntry::new(columns[0]),
        columns[2],
        MethodDescriptor::new(columns[1]),
    );
    let local = LocalVariableEntry::new(method, index, "", true);
    Ok((Entry::LocalVariable(local), target.to_string()))
}

/// Render a tree as tiny v1. Javadoc and access overrides are dropped.
pub fn to_string(tree: &EntryTree<EntryMapping>, obf_namespace: &str, deobf_namespace: &str) -> String {
    let translator = MappingTranslator::new(Arc::new(tree.clone()));

    // Sorted and written once each
    let mut rows = BTreeSet::new();
    for (entry, mapping) in tree.iter_values() {
        let Some(target) = mapping.target_name.as_deref() else {
            continue;
        };
        if target == entry.name() {
            continue;
        }

        let columns = match entry {
            Entry::Class(class) => vec![
                "CLASS".to_string(),
                class.full_name().to_string(),
                translator.translate_class(class).full_name().to_string(),
            ],
            Entry::Field(field) => vec![
                "FIELD".to_string(),
                field.parent.full_name().to_string(),
                field.desc.to_string(),
                field.name.clone(),
                target.to_string(),
            ],
            Entry::Method(method) => vec![
                "METHOD".to_string(),
                method.parent.full_name().to_string(),
                method.desc.to_string(),
                method.name.clone(),
                target.to_string(),
            ],
            Entry::LocalVariable(local) => vec![
                "MTH-ARG".to_string(),
                local.parent.parent.full_name().to_string(),
                local.parent.desc.to_string(),
                local.parent.name.clone(),
                local.index.to_string(),
                target.to_string(),
            ],
        };
        rows.insert(columns.join("\t"));
    }

    let mut out = format!("{}\t{}\t{}\n", VERSION, obf_namespace, deobf_namespace);
    for row in rows {
        out.push_str(&row);
        out.push('\n');
    }
    out
}

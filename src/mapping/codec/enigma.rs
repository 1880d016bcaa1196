// Enigma mapping text
//
// Format:
// ```
// CLASS a pkg/Outer
// 	COMMENT Documentation for Outer
// 	FIELD b count I
// 	METHOD c (I)V run ACC:PUBLIC
// 		ARG 1 times
// 	CLASS d Inner
// ```
//
// One tab per nesting level. Nested CLASS lines name the inner class only.

use super::MappingError;
use crate::entry::{
    ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodDescriptor, MethodEntry,
    TypeDescriptor, INNER_SEPARATOR,
};
use crate::mapping::{AccessModifier, EntryMapping, EntryTree, EntryTreeNode};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File extension of the directory variant
pub const EXTENSION: &str = "mapping";

const ACCESS_PREFIX: &str = "ACC:";

/// Parse Enigma mapping text
pub fn parse_content(content: &str) -> Result<EntryTree<EntryMapping>, MappingError> {
    let mut tree = EntryTree::new();
    parse_into(&mut tree, content)?;
    Ok(tree)
}

/// Parse Enigma text, adding to `tree`
pub fn parse_into(tree: &mut EntryTree<EntryMapping>, content: &str) -> Result<(), MappingError> {
    let mut stack: Vec<Entry> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_number = idx + 1;
        let indent = raw.chars().take_while(|c| *c == '\t').count();
        let keyword = raw
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        // Javadoc text is taken verbatim, `#` included
        if keyword == "COMMENT" {
            stack.truncate(indent);
            let Some(owner) = stack.last() else {
                return Err(MappingError::parse(line_number, raw, "COMMENT without an entry"));
            };
            let rest = &raw.trim_start()["COMMENT".len()..];
            let text = rest.strip_prefix(' ').unwrap_or(rest).trim_end();
            append_javadoc(tree, owner, text);
            continue;
        }

        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        if line.trim().is_empty() {
            continue;
        }
        stack.truncate(indent);
        let content = line.trim();

        let (tokens, access) = split_access(content)
            .map_err(|message| MappingError::parse(line_number, raw, message))?;
        let parent = stack.last();

        let parsed = match keyword.as_str() {
            "CLASS" => parse_class(&tokens, indent, parent),
            "FIELD" => parse_field(&tokens, parent),
            "METHOD" => parse_method(&tokens, parent),
            "ARG" => parse_arg(&tokens, parent),
            _ => {
                warn!("Skipping unknown mapping line {}: {}", line_number, content);
                continue;
            }
        };
        let (entry, target) =
            parsed.map_err(|message| MappingError::parse(line_number, raw, message))?;

        let mapping = tree
            .get(&entry)
            .cloned()
            .unwrap_or_default()
            .with_name(target)
            .with_access(access);
        tree.insert(&entry, mapping.non_empty());
        stack.push(entry);
    }
    Ok(())
}

fn append_javadoc(tree: &mut EntryTree<EntryMapping>, entry: &Entry, text: &str) {
    let mut mapping = tree.get(entry).cloned().unwrap_or_default();
    mapping.javadoc = Some(match mapping.javadoc.take() {
        Some(existing) => format!("{}\n{}", existing, text),
        None => text.to_string(),
    });
    tree.insert(entry, Some(mapping));
}

/// Split off `ACC:` tokens, returning the remaining tokens after the keyword
fn split_access(content: &str) -> Result<(Vec<&str>, AccessModifier), String> {
    let mut access = AccessModifier::Unchanged;
    let mut tokens = Vec::new();
    for token in content.split_whitespace().skip(1) {
        match token.strip_prefix(ACCESS_PREFIX) {
            Some(modifier) => access = modifier.parse()?,
            None => tokens.push(token),
        }
    }
    Ok((tokens, access))
}

type ParsedLine = Result<(Entry, Option<String>), String>;

fn parse_class(tokens: &[&str], indent: usize, parent: Option<&Entry>) -> ParsedLine {
    let (obf, target) = match tokens {
        [obf] => (*obf, None),
        [obf, target] => (*obf, Some(*target)),
        _ => return Err("malformed CLASS line".to_string()),
    };

    if indent == 0 {
        return Ok((Entry::Class(ClassEntry::new(obf)), target.map(String::from)));
    }

    let Some(Entry::Class(outer)) = parent else {
        return Err("unexpected CLASS entry here".to_string());
    };
    let class = if obf.contains(INNER_SEPARATOR) || obf.contains('/') {
        ClassEntry::new(obf)
    } else {
        ClassEntry::nested(outer, obf)
    };
    // Nested classes store their inner name only
    let target = target.map(|t| {
        t.rsplit(|c| c == INNER_SEPARATOR || c == '/')
            .next()
            .unwrap_or(t)
            .to_string()
    });
    Ok((Entry::Class(class), target))
}

fn parse_field(tokens: &[&str], parent: Option<&Entry>) -> ParsedLine {
    let Some(Entry::Class(owner)) = parent else {
        return Err("unexpected FIELD entry here".to_string());
    };
    let (obf, target, desc) = match tokens {
        [obf, desc] => (*obf, None, *desc),
        [obf, target, desc] => (*obf, Some(*target), *desc),
        _ => return Err("malformed FIELD line".to_string()),
    };
    let field = FieldEntry::new(owner.clone(), obf, TypeDescriptor::new(desc));
    Ok((Entry::Field(field), target.map(String::from)))
}

fn parse_method(tokens: &[&str], parent: Option<&Entry>) -> ParsedLine {
    let Some(Entry::Class(owner)) = parent else {
        return Err("unexpected METHOD entry here".to_string());
    };
    let (obf, target, desc) = match tokens {
        [obf, desc] if is_desc(desc) => (*obf, None, *desc),
        [obf, desc, target] if is_desc(desc) => (*obf, Some(*target), *desc),
        [obf, target, desc] if is_desc(desc) => (*obf, Some(*target), *desc),
        _ => return Err("malformed METHOD line".to_string()),
    };
    let method = MethodEntry::new(owner.clone(), obf, MethodDescriptor::new(desc));
    Ok((Entry::Method(method), target.map(String::from)))
}

fn is_desc(token: &str) -> bool {
    token.starts_with('(')
}

fn parse_arg(tokens: &[&str], parent: Option<&Entry>) -> ParsedLine {
    let Some(Entry::Method(method)) = parent else {
        return Err("unexpected ARG entry here".to_string());
    };
    let [index, target] = tokens else {
        return Err("malformed ARG line".to_string());
    };
    let index: u16 = index
        .parse()
        .map_err(|_| format!("invalid argument index '{}'", index))?;
    let local = LocalVariableEntry::new(method.clone(), index, "", true);
    Ok((Entry::LocalVariable(local), Some(target.to_string())))
}

/// Render a whole tree as one Enigma file
pub fn to_string(tree: &EntryTree<EntryMapping>) -> String {
    let mut roots: Vec<&EntryTreeNode<EntryMapping>> = tree.roots().collect();
    sort_nodes(&mut roots);

    let mut out = String::new();
    for root in roots {
        write_node(&mut out, root, 0);
    }
    out
}

fn sort_nodes(nodes: &mut [&EntryTreeNode<EntryMapping>]) {
    nodes.sort_by(|a, b| order_key(a.entry()).cmp(&order_key(b.entry())));
}

/// Fields, then methods, then nested classes; locals by slot
fn order_key(entry: &Entry) -> (u8, String, String, u16) {
    match entry {
        Entry::Field(f) => (0, f.name.clone(), f.desc.to_string(), 0),
        Entry::Method(m) => (1, m.name.clone(), m.desc.to_string(), 0),
        Entry::Class(c) => (2, c.full_name().to_string(), String::new(), 0),
        Entry::LocalVariable(v) => (3, String::new(), String::new(), v.index),
    }
}

fn write_node(out: &mut String, node: &EntryTreeNode<EntryMapping>, depth: usize) {
    let mapping = node.value();
    let target = mapping.and_then(|m| m.target_name.as_deref());

    let mut parts: Vec<String> = match node.entry() {
        Entry::Class(class) => {
            let obf = if depth == 0 { class.full_name() } else { class.name() };
            let mut parts = vec!["CLASS".to_string(), obf.to_string()];
            parts.extend(target.map(String::from));
            parts
        }
        Entry::Field(field) => {
            let mut parts = vec!["FIELD".to_string(), field.name.clone()];
            parts.extend(target.map(String::from));
            parts.push(field.desc.to_string());
            parts
        }
        Entry::Method(method) => {
            let mut parts = vec![
                "METHOD".to_string(),
                method.name.clone(),
                method.desc.to_string(),
            ];
            parts.extend(target.map(String::from));
            parts
        }
        Entry::LocalVariable(local) => {
            // An argument without a name has nothing to write
            let Some(target) = target else {
                return;
            };
            vec!["ARG".to_string(), local.index.to_string(), target.to_string()]
        }
    };

    if let Some(access) = mapping.map(|m| m.access) {
        if access != AccessModifier::Unchanged && !matches!(node.entry(), Entry::LocalVariable(_)) {
            parts.push(format!("{}{}", ACCESS_PREFIX, access));
        }
    }

    let indent = "\t".repeat(depth);
    out.push_str(&indent);
    out.push_str(&parts.join(" "));
    out.push('\n');

    if let Some(javadoc) = mapping.and_then(|m| m.javadoc.as_deref()) {
        for line in javadoc.lines() {
            out.push_str(&indent);
            out.push('\t');
            out.push_str(format!("COMMENT {}", line).trim_end());
            out.push('\n');
        }
    }

    let mut children: Vec<&EntryTreeNode<EntryMapping>> = node.children().collect();
    sort_nodes(&mut children);
    for child in children {
        write_node(out, child, depth + 1);
    }
}

/// Read every `*.mapping` file below `dir`, in sorted path order, into one
/// tree. Later files win when two files map the same entry differently.
pub fn read_directory(dir: &Path) -> Result<EntryTree<EntryMapping>, MappingError> {
    let mut tree = EntryTree::new();

    for path in mapping_files(dir)? {
        let content = fs::read_to_string(&path)?;
        let file_tree = parse_content(&content)?;
        for (entry, mapping) in file_tree.iter_values() {
            if let Some(existing) = tree.get(entry) {
                if existing != mapping {
                    warn!(
                        "Conflicting mappings for {} in {}; keeping the later one",
                        entry,
                        path.display()
                    );
                }
            }
        }
        tree.merge(&file_tree);
        debug!("Read {}", path.display());
    }
    Ok(tree)
}

fn mapping_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Write one `<class path>.mapping` file per top-level class, removing
/// mapping files of classes that no longer have mappings
pub fn write_directory(tree: &EntryTree<EntryMapping>, dir: &Path) -> Result<(), MappingError> {
    fs::create_dir_all(dir)?;

    let mut written = HashSet::new();
    let mut roots: Vec<&EntryTreeNode<EntryMapping>> = tree.roots().collect();
    sort_nodes(&mut roots);

    for root in roots {
        let Entry::Class(class) = root.entry() else {
            continue;
        };
        let path = dir.join(format!("{}.{}", class.full_name(), EXTENSION));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = String::new();
        write_node(&mut out, root, 0);
        fs::write(&path, out)?;
        written.insert(path);
    }

    for stale in mapping_files(dir)? {
        if !written.contains(&stale) {
            debug!("Removing stale {}", stale.display());
            fs::remove_file(&stale)?;
        }
    }
    Ok(())
}

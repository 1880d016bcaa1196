// SRG output
//
// ```
// CL: a pkg/Outer
// FD: a/b pkg/Outer/count
// MD: a/c (La;)V pkg/Outer/run (Lpkg/Outer;)V
// ```
//
// Arguments, javadoc and access overrides have no SRG form.

use crate::entry::Entry;
use crate::mapping::{EntryMapping, EntryTree, MappingTranslator, Translate};
use std::sync::Arc;

pub fn to_string(tree: &EntryTree<EntryMapping>) -> String {
    let translator = MappingTranslator::new(Arc::new(tree.clone()));

    let mut classes = Vec::new();
    let mut fields = Vec::new();
    let mut methods = Vec::new();

    for node in tree.all_nodes() {
        let entry = node.entry();
        let translated = translator.translate(entry);
        if translated == *entry {
            continue;
        }

        match (entry, translated) {
            (Entry::Class(obf), Entry::Class(deobf)) => {
                classes.push(format!("CL: {} {}", obf, deobf));
            }
            (Entry::Field(obf), Entry::Field(deobf)) => {
                fields.push(format!(
                    "FD: {}/{} {}/{}",
                    obf.parent, obf.name, deobf.parent, deobf.name
                ));
            }
            (Entry::Method(obf), Entry::Method(deobf)) => {
                methods.push(format!(
                    "MD: {}/{} {} {}/{} {}",
                    obf.parent, obf.name, obf.desc, deobf.parent, deobf.name, deobf.desc
                ));
            }
            _ => {}
        }
    }

    classes.sort();
    fields.sort();
    methods.sort();

    let mut out = String::new();
    for line in classes.iter().chain(&fields).chain(&methods) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

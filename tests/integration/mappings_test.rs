//! Integration tests for the mapping tree, translation, codecs and the
//! remapping session

mod common;

use common::{sample_classes, write_jar};
use jarmap::entry::{
    ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodDescriptor, MethodEntry,
    TypeDescriptor,
};
use jarmap::mapping::codec::{enigma, tiny};
use jarmap::mapping::{invert, AccessModifier, RemapError};
use jarmap::{
    ClassSource, EntryMapping, EntryTree, JarIndex, MappingError, MappingFormat,
    MappingTranslator, Remapper, Translate,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn class(name: &str) -> ClassEntry {
    ClassEntry::new(name)
}

fn method(owner: &str, name: &str, desc: &str) -> MethodEntry {
    MethodEntry::new(class(owner), name, MethodDescriptor::new(desc))
}

fn target(tree: &EntryTree<EntryMapping>, entry: &Entry) -> Option<String> {
    tree.get(entry).and_then(|m| m.target_name.clone())
}

/// A fully mapped tree over classes, nested classes, members and arguments
fn sample_mappings() -> EntryTree<EntryMapping> {
    let run = method("a", "c", "(La$b;I)V");
    let mut tree = EntryTree::new();
    tree.insert(
        &Entry::Class(class("a")),
        Some(EntryMapping::new("pkg/Outer").with_javadoc(Some("The outer class".into()))),
    );
    tree.insert(&Entry::Class(class("a$b")), Some(EntryMapping::new("Inner")));
    tree.insert(
        &Entry::Field(FieldEntry::new(class("a"), "d", TypeDescriptor::new("La$b;"))),
        Some(EntryMapping::new("inner").with_access(AccessModifier::Public)),
    );
    tree.insert(&Entry::Method(run.clone()), Some(EntryMapping::new("run")));
    tree.insert(
        &Entry::LocalVariable(LocalVariableEntry::new(run, 2, "", true)),
        Some(EntryMapping::new("times")),
    );
    tree.insert(
        &Entry::Method(method("a$b", "e", "()La;")),
        Some(EntryMapping::new("outer")),
    );
    tree
}

fn sample_index() -> Arc<JarIndex> {
    let dir = TempDir::new().unwrap();
    let jar = write_jar(dir.path(), "sample.jar", &sample_classes(), &[]);
    let nodes = ClassSource::new(&jar).load().unwrap();
    Arc::new(JarIndex::build(&nodes, true).unwrap())
}

// ============================================================================
// Mapping tree
// ============================================================================

#[test]
fn test_insert_get_remove_prunes() {
    let field = Entry::Field(FieldEntry::new(class("a$b$c"), "f", TypeDescriptor::new("I")));
    let mut tree = EntryTree::new();
    tree.insert(&field, Some(EntryMapping::new("value")));

    assert_eq!(target(&tree, &field).as_deref(), Some("value"));
    // Enclosing classes exist as empty nodes
    assert!(tree.find_node(&Entry::Class(class("a$b"))).is_some());
    assert_eq!(tree.len(), 1);

    assert!(tree.remove(&field).is_some());
    assert!(tree.get(&field).is_none());
    assert!(tree.find_node(&Entry::Class(class("a"))).is_none());
    assert!(tree.is_empty());
}

#[test]
fn test_empty_mapping_clears_entry() {
    let mut tree = sample_mappings();
    let nested = Entry::Class(class("a$b"));

    tree.insert(&nested, Some(EntryMapping::default()));
    assert!(tree.get(&nested).is_none());
    assert_eq!(tree.len(), 5);

    let mut fresh = EntryTree::new();
    fresh.insert(&Entry::Class(class("q")), Some(EntryMapping::default()));
    assert!(fresh.is_empty());
}

#[test]
fn test_remove_keeps_used_ancestors() {
    let mut tree = sample_mappings();
    let nested_method = Entry::Method(method("a$b", "e", "()La;"));

    tree.remove(&nested_method);
    assert!(tree.get(&nested_method).is_none());
    assert_eq!(target(&tree, &Entry::Class(class("a$b"))).as_deref(), Some("Inner"));
    assert_eq!(tree.len(), 5);
}

// ============================================================================
// Translation
// ============================================================================

#[test]
fn test_translate_and_invert_round_trip() {
    let mappings = sample_mappings();
    let forward = MappingTranslator::new(Arc::new(mappings.clone()));
    let backward = MappingTranslator::new(Arc::new(invert(&mappings)));

    let deobfuscated = mappings.translate(&forward);
    assert!(deobfuscated.contains(&Entry::Class(class("pkg/Outer$Inner"))));
    assert!(deobfuscated.contains(&Entry::Method(method(
        "pkg/Outer",
        "run",
        "(Lpkg/Outer$Inner;I)V"
    ))));

    let restored = deobfuscated.translate(&backward);
    let mut original: Vec<String> = mappings.all_entries().iter().map(|e| e.to_string()).collect();
    let mut round_trip: Vec<String> = restored.all_entries().iter().map(|e| e.to_string()).collect();
    original.sort();
    round_trip.sort();
    assert_eq!(original, round_trip);
}

#[test]
fn test_translator_resolves_inherited_members() {
    let index = sample_index();
    let mut mappings = EntryTree::new();
    mappings.insert(
        &Entry::Field(FieldEntry::new(class("b"), "a", TypeDescriptor::new("I"))),
        Some(EntryMapping::new("count")),
    );

    let plain = MappingTranslator::new(Arc::new(mappings.clone()));
    let resolving = MappingTranslator::new(Arc::new(mappings)).with_index(index);

    // `c` inherits the field from `b`
    let through_c = Entry::Field(FieldEntry::new(class("c"), "a", TypeDescriptor::new("I")));
    assert_eq!(plain.translate(&through_c).name(), "a");

    let translated = resolving.translate(&through_c);
    assert_eq!(translated.name(), "count");
    assert_eq!(translated.containing_class(), &class("c"));
}

// ============================================================================
// Codecs
// ============================================================================

#[test]
fn test_tiny_round_trip() {
    let mappings = sample_mappings();
    let text = tiny::to_string(&mappings, "official", "named");
    let read = tiny::parse_content(&text).unwrap();

    for (entry, mapping) in mappings.iter_values() {
        assert_eq!(
            target(&read, entry),
            mapping.target_name.clone(),
            "lost mapping for {}",
            entry
        );
    }
    // Tiny has no place for javadoc or access overrides
    let outer = read.get(&Entry::Class(class("a"))).unwrap();
    assert_eq!(outer.javadoc, None);
    assert_eq!(outer.access, AccessModifier::Unchanged);
}

#[test]
fn test_enigma_round_trip_keeps_everything() {
    let mappings = sample_mappings();
    let read = enigma::parse_content(&enigma::to_string(&mappings)).unwrap();

    for (entry, mapping) in mappings.iter_values() {
        assert_eq!(read.get(entry), Some(mapping), "mismatch for {}", entry);
    }
    assert_eq!(read.len(), mappings.len());
}

#[test]
fn test_enigma_indentation_scoping() {
    let tree = enigma::parse_content("CLASS a A\n\tFIELD b B Ljava/lang/String;\nCLASS c C\n").unwrap();

    let field_on_a = Entry::Field(FieldEntry::new(class("a"), "b", TypeDescriptor::new("Ljava/lang/String;")));
    let field_on_c = Entry::Field(FieldEntry::new(class("c"), "b", TypeDescriptor::new("Ljava/lang/String;")));
    assert_eq!(target(&tree, &field_on_a).as_deref(), Some("B"));
    assert!(tree.get(&field_on_c).is_none());

    let mut roots: Vec<String> = tree.root_entries().iter().map(|e| e.to_string()).collect();
    roots.sort();
    assert_eq!(roots, vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn test_enigma_error_reports_line() {
    let err = enigma::parse_content("CLASS a A\n\tFIELD b\n").unwrap_err();
    assert_eq!(err.line(), Some(2));
    assert!(err.to_string().contains("Line 2"));
}

#[test]
fn test_enigma_directory_round_trip() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("mappings");
    let mut mappings = sample_mappings();
    mappings.insert(&Entry::Class(class("z/q")), Some(EntryMapping::new("z/Other")));

    MappingFormat::EnigmaDirectory
        .write(&mappings, &out, &Default::default())
        .unwrap();
    assert!(out.join("a.mapping").is_file());
    assert!(out.join("z/q.mapping").is_file());

    let read = MappingFormat::EnigmaDirectory.read(&out).unwrap();
    assert_eq!(read, mappings);

    // Classes dropped from the tree lose their file on the next write
    mappings.remove(&Entry::Class(class("z/q")));
    MappingFormat::EnigmaDirectory
        .write(&mappings, &out, &Default::default())
        .unwrap();
    assert!(!out.join("z/q.mapping").exists());
}

#[test]
fn test_enigma_directory_merge() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.mapping"), "CLASS a First\n").unwrap();
    fs::create_dir_all(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg/b.mapping"), "CLASS pkg/b Second\n\tFIELD c count I\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let tree = enigma::read_directory(dir.path()).unwrap();
    assert_eq!(target(&tree, &Entry::Class(class("a"))).as_deref(), Some("First"));
    assert_eq!(
        target(&tree, &Entry::Field(FieldEntry::new(class("pkg/b"), "c", TypeDescriptor::new("I")))).as_deref(),
        Some("count")
    );
}

#[test]
fn test_format_read_failure_keeps_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.tiny");
    fs::write(&path, "v1\tofficial\tnamed\nCLASS\ta\tA\nFIELD\ta\n").unwrap();

    let err = MappingFormat::Tiny.read(&path).unwrap_err();
    assert!(matches!(err, MappingError::Parse { line: 3, .. }));
}

#[test]
fn test_convert_enigma_to_srg() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.mapping");
    let output = dir.path().join("out.srg");
    fs::write(&input, "CLASS a pkg/Outer\n\tMETHOD b run ()V\n").unwrap();

    let format = MappingFormat::detect(&input).unwrap();
    assert_eq!(format, MappingFormat::EnigmaFile);
    let tree = format.read(&input).unwrap();
    MappingFormat::Srg.write(&tree, &output, &Default::default()).unwrap();

    let srg = fs::read_to_string(&output).unwrap();
    assert_eq!(srg, "CL: a pkg/Outer\nMD: a/b ()V pkg/Outer/run ()V\n");
}

// ============================================================================
// Remapping session
// ============================================================================

#[test]
fn test_remapper_snapshot_isolation() {
    let remapper = Remapper::new(sample_index());
    let before = remapper.snapshot();

    remapper.rename(&Entry::Class(class("b")), "pkg/Base").unwrap();
    let after = remapper.snapshot();

    assert!(before.is_empty());
    assert_eq!(target(&after, &Entry::Class(class("b"))).as_deref(), Some("pkg/Base"));
}

#[test]
fn test_remapper_rejects_external_entries() {
    let remapper = Remapper::new(sample_index());

    let external = Entry::Class(class("java/lang/Object"));
    assert!(!remapper.is_renamable(&external));
    assert!(matches!(
        remapper.rename(&external, "Root"),
        Err(RemapError::NotRenamable(_))
    ));

    let constructor = Entry::Method(method("b", "<init>", "()V"));
    assert!(!remapper.is_renamable(&constructor));
}

#[test]
fn test_remapper_closure_rename() {
    let remapper = Remapper::new(sample_index());
    let renamed = remapper
        .rename_closure(&method("c", "a", "()Ljava/lang/String;"), "getName")
        .unwrap();
    assert_eq!(renamed, 4);

    let translator = remapper.deobfuscating_translator();
    for owner in ["a", "b"] {
        let bridge = Entry::Method(method(owner, "a", "()Ljava/lang/Object;"));
        assert_eq!(translator.translate(&bridge).name(), "getName");
    }
    let override_on_c = Entry::Method(method("c", "a", "()Ljava/lang/String;"));
    assert_eq!(translator.translate(&override_on_c).name(), "getName");
}

#[test]
fn test_remapper_obfuscating_translator() {
    let remapper = Remapper::new(sample_index());
    remapper.rename(&Entry::Class(class("d")), "pkg/Main").unwrap();

    let obfuscating = remapper.obfuscating_translator();
    assert_eq!(obfuscating.translate_class(&class("pkg/Main")), class("d"));
    assert_eq!(obfuscating.translate_class(&class("pkg/Main$e")), class("d$e"));
}

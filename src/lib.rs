//! jarmap - Jar indexing and name mappings for deobfuscating JVM bytecode
//!
//! This library builds a structural index of an obfuscated jar and keeps a
//! tree of human-chosen names for its classes, fields, methods and
//! arguments.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! 1. **Class Loading** - Read class files from a jar or directory
//! 2. **Indexing** - Build the hierarchy, reference graph and bridge map
//! 3. **Relationship Queries** - Inheritance trees, override closures, callers
//! 4. **Mapping** - Store, rename and translate entries through a mapping tree
//! 5. **Codecs** - Read and write Enigma, tiny and SRG mapping files
//! 6. **Decompile Scheduling** - Hand classes to an external decompiler

pub mod analysis;
pub mod classfile;
pub mod config;
pub mod decompile;
pub mod entry;
pub mod index;
pub mod mapping;

pub use analysis::Relations;
pub use classfile::{ClassNode, ClassSource};
pub use config::Config;
pub use decompile::{CancelToken, DecompileQueue, SourceProvider};
pub use entry::{ClassEntry, Entry, FieldEntry, LocalVariableEntry, MethodEntry};
pub use index::{IndexError, JarIndex, JarIndexer};
pub use mapping::{
    EntryMapping, EntryTree, MappingError, MappingFormat, MappingTranslator, Remapper, Translate,
};

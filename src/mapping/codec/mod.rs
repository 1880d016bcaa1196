//! Reading and writing mapping files
//!
//! Supported formats:
//! - Enigma text, as a single file or as a directory with one file per
//!   top-level class
//! - Tiny v1 (tab separated; no javadoc or access overrides)
//! - SRG (write only; classes, fields and methods)

pub mod enigma;
pub mod srg;
pub mod tiny;

use super::{EntryMapping, EntryTree};
use crate::config::MappingConfig;
use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Line {line}: {message}: {text}")]
    Parse {
        line: usize,
        text: String,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0} mappings can only be written")]
    UnsupportedRead(MappingFormat),

    #[error("Conflicting mappings for {entry}: '{existing}' and '{incoming}'")]
    Conflict {
        entry: Entry,
        existing: String,
        incoming: String,
    },
}

impl MappingError {
    pub(crate) fn parse(line: usize, text: &str, message: impl Into<String>) -> Self {
        MappingError::Parse {
            line,
            text: text.to_string(),
            message: message.into(),
        }
    }

    /// Source line of a parse error
    pub fn line(&self) -> Option<usize> {
        match self {
            MappingError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// A mapping file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingFormat {
    #[default]
    #[serde(alias = "enigma")]
    EnigmaFile,
    EnigmaDirectory,
    Tiny,
    Srg,
}

impl MappingFormat {
    /// Guess the format of an existing path: directories are Enigma
    /// directories, a `v1` header means tiny, `.srg` means SRG
    pub fn detect(path: &Path) -> io::Result<Self> {
        if path.is_dir() {
            return Ok(MappingFormat::EnigmaDirectory);
        }
        if path.extension().and_then(|ext| ext.to_str()) == Some("srg") {
            return Ok(MappingFormat::Srg);
        }

        let mut first = String::new();
        BufReader::new(fs::File::open(path)?).read_line(&mut first)?;
        if first.starts_with(tiny::VERSION) && first[tiny::VERSION.len()..].starts_with('\t') {
            return Ok(MappingFormat::Tiny);
        }
        Ok(MappingFormat::EnigmaFile)
    }

    pub fn supports_read(&self) -> bool {
        !matches!(self, MappingFormat::Srg)
    }

    /// Read a whole mapping set. Nothing is returned unless every line
    /// parsed.
    pub fn read(&self, path: &Path) -> Result<EntryTree<EntryMapping>, MappingError> {
        let mappings = match self {
            MappingFormat::EnigmaFile => enigma::parse_content(&fs::read_to_string(path)?)?,
            MappingFormat::EnigmaDirectory => enigma::read_directory(path)?,
            MappingFormat::Tiny => tiny::parse_content(&fs::read_to_string(path)?)?,
            MappingFormat::Srg => return Err(MappingError::UnsupportedRead(*self)),
        };
        info!(
            "Read {} mappings from {} ({})",
            mappings.len(),
            path.display(),
            self
        );
        Ok(mappings)
    }

    pub fn write(
        &self,
        mappings: &EntryTree<EntryMapping>,
        path: &Path,
        config: &MappingConfig,
    ) -> Result<(), MappingError> {
        match self {
            MappingFormat::EnigmaFile => fs::write(path, enigma::to_string(mappings))?,
            MappingFormat::EnigmaDirectory => enigma::write_directory(mappings, path)?,
            MappingFormat::Tiny => {
                let (obf, deobf) = &config.tiny_namespaces;
                fs::write(path, tiny::to_string(mappings, obf, deobf))?
            }
            MappingFormat::Srg => fs::write(path, srg::to_string(mappings))?,
        }
        info!("Wrote {} mappings to {} ({})", mappings.len(), path.display(), self);
        Ok(())
    }
}

impl fmt::Display for MappingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MappingFormat::EnigmaFile => "enigma-file",
            MappingFormat::EnigmaDirectory => "enigma-directory",
            MappingFormat::Tiny => "tiny",
            MappingFormat::Srg => "srg",
        };
        f.write_str(name)
    }
}

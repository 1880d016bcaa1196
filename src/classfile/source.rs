// Loading class files from jars and directories

use super::{parse_class, ClassNode};
use crate::config::Config;
use miette::{IntoDiagnostic, Result, WrapErr};
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// A jar file or a directory of class files
#[derive(Debug, Clone)]
pub struct ClassSource {
    path: PathBuf,
    exclude: Vec<String>,
    parallel: bool,
}

impl ClassSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exclude: Vec::new(),
            parallel: true,
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            path: path.into(),
            exclude: config.exclude.clone(),
            parallel: config.index.parallel,
        }
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse every class in the source, sorted by class name.
    /// Classes that fail to parse are logged and skipped.
    pub fn load(&self) -> Result<Vec<ClassNode>> {
        let raw = if self.path.is_dir() {
            self.read_directory()?
        } else {
            self.read_jar()?
        };

        let parse = |(entry_name, bytes): &(String, Vec<u8>)| match parse_class(bytes) {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("Skipping {}: {}", entry_name, e);
                None
            }
        };

        let mut classes: Vec<ClassNode> = if self.parallel {
            info!("Parsing {} class files in parallel...", raw.len());
            raw.par_iter().filter_map(parse).collect()
        } else {
            info!("Parsing {} class files...", raw.len());
            raw.iter().filter_map(parse).collect()
        };

        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    fn is_excluded(&self, entry_name: &str) -> bool {
        self.exclude
            .iter()
            .any(|pattern| crate::config::glob_match(pattern, entry_name))
    }

    fn read_jar(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let file = File::open(&self.path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to open jar: {}", self.path.display()))?;
        let mut archive = ZipArchive::new(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read jar: {}", self.path.display()))?;

        let mut raw = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).into_diagnostic()?;
            let name = entry.name().to_string();
            if !name.ends_with(".class") || self.is_excluded(&name) {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read jar entry: {}", name))?;
            raw.push((name, bytes));
        }

        debug!("Read {} class entries from {}", raw.len(), self.path.display());
        Ok(raw)
    }

    fn read_directory(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut raw = Vec::new();
        for entry in WalkDir::new(&self.path).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "class") {
                continue;
            }
            let relative = path
                .strip_prefix(&self.path)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if self.is_excluded(&relative) {
                continue;
            }
            let bytes = std::fs::read(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read class file: {}", path.display()))?;
            raw.push((relative, bytes));
        }
        Ok(raw)
    }
}

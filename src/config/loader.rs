// Configuration loader

use crate::mapping::codec::MappingFormat;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for indexing and mapping I/O
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Jar entry patterns to skip while loading classes
    pub exclude: Vec<String>,

    /// Indexing configuration
    pub index: IndexConfig,

    /// Mapping file configuration
    pub mappings: MappingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Record outer/inner class relationships
    pub inner_classes: bool,

    /// Scan classes on the rayon thread pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Format used when none is given explicitly
    pub format: MappingFormat,

    /// Namespace names written to the tiny header (obfuscated, deobfuscated)
    pub tiny_namespaces: (String, String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: vec![
                "META-INF/**".to_string(),
                "**/module-info.class".to_string(),
            ],
            index: IndexConfig::default(),
            mappings: MappingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            inner_classes: true,
            parallel: true,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            format: MappingFormat::EnigmaFile,
            tiny_namespaces: ("official".to_string(), "named".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(root: &Path) -> Result<Self> {
        let default_names = [
            ".jarmap.yml",
            ".jarmap.yaml",
            ".jarmap.toml",
            "jarmap.yml",
            "jarmap.yaml",
            "jarmap.toml",
        ];

        for name in &default_names {
            let path = root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Check if a jar entry should be skipped
    pub fn should_exclude(&self, entry_name: &str) -> bool {
        self.exclude.iter().any(|pattern| glob_match(pattern, entry_name))
    }
}

/// Simple glob matching for patterns like "META-INF/**" or "*Test.class"
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern.starts_with('*') && !pattern.contains('/') {
        return text.ends_with(&pattern[1..]);
    }

    if pattern.ends_with('*') && !pattern.contains('/') {
        return text.starts_with(&pattern[..pattern.len() - 1]);
    }

    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if prefix.is_empty() && suffix.is_empty() {
                return true;
            }

            if prefix.is_empty() {
                return text == suffix || text.ends_with(&format!("/{}", suffix));
            }

            if suffix.is_empty() {
                return text.starts_with(&format!("{}/", prefix));
            }

            return text.starts_with(&format!("{}/", prefix))
                && (text.ends_with(&format!("/{}", suffix)));
        }
    }

    text == pattern
}

mod loader;

pub use loader::{glob_match, Config, IndexConfig, MappingConfig};

//! Registry configuration.

use crate::error::RegistryError;
use monkeyreg_storage::{KvStoreConfig, DEFAULT_DB_PATH};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which storage backend a registry uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// A local JSON file.
    #[default]
    File,
    /// A remote key-value table.
    Kv,
}

impl BackendKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BackendKind::File => "file",
            BackendKind::Kv => "kv",
        }
    }
}

impl FromStr for BackendKind {
    type Err = RegistryError;

    /// Accepts `json`/`file` and `kv`/`ddb`/`dynamodb`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" => Ok(BackendKind::File),
            "kv" | "ddb" | "dynamodb" => Ok(BackendKind::Kv),
            other => Err(RegistryError::invalid_config(format!(
                "unknown backend {other:?}, expected file or kv"
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for opening a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Backend to use.
    pub backend: BackendKind,
    /// Path of the JSON file, for the file backend.
    pub db_path: PathBuf,
    /// Table settings, for the key-value backend.
    pub kv: KvStoreConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            kv: KvStoreConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend.
    #[must_use]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the JSON file path.
    #[must_use]
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Sets the table settings.
    #[must_use]
    pub fn kv(mut self, kv: KvStoreConfig) -> Self {
        self.kv = kv;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.db_path, PathBuf::from("data/monkeys.json"));
        assert_eq!(config.kv.table_name, "monkey-registry");
    }

    #[test]
    fn builder() {
        let config = RegistryConfig::new()
            .backend(BackendKind::Kv)
            .db_path("/tmp/elsewhere.json")
            .kv(KvStoreConfig::new().table_name("monkeys-test"));

        assert_eq!(config.backend, BackendKind::Kv);
        assert_eq!(config.db_path, PathBuf::from("/tmp/elsewhere.json"));
        assert_eq!(config.kv.table_name, "monkeys-test");
    }

    #[test]
    fn backend_names() {
        for name in ["json", "file", "JSON"] {
            assert_eq!(name.parse::<BackendKind>().unwrap(), BackendKind::File);
        }
        for name in ["kv", "ddb", "DynamoDB"] {
            assert_eq!(name.parse::<BackendKind>().unwrap(), BackendKind::Kv);
        }
        assert!("sqlite".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Kv.to_string(), "kv");
    }
}

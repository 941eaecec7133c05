//! Test fixtures and registry helpers.
//!
//! Provides registries over each backend with automatic cleanup.

use monkeyreg_core::{NewRecord, Registry};
use monkeyreg_storage::{FileStore, InMemoryKvClient, Item, KvStore, KvStoreConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A registry over a JSON file in a temporary directory.
pub struct TestFileRegistry {
    /// The registry instance.
    pub registry: Registry<FileStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestFileRegistry {
    /// Creates a registry over a fresh file.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path().join("monkeys.json"))
            .expect("Failed to open file store");
        Self {
            registry: Registry::new(store),
            _temp_dir: temp_dir,
        }
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        self.registry.store().path()
    }

    /// Reopens the same file with a new store.
    pub fn reopen(&self) -> Registry<FileStore> {
        Registry::new(FileStore::open(self.path()).expect("Failed to reopen file store"))
    }
}

impl Default for TestFileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFileRegistry {
    type Target = Registry<FileStore>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

/// A registry over an in-memory key-value table.
pub struct TestKvRegistry {
    /// The registry instance.
    pub registry: Registry<KvStore<Arc<InMemoryKvClient>>>,
    /// The shared client, for inspecting raw items or cutting the connection.
    pub client: Arc<InMemoryKvClient>,
}

impl TestKvRegistry {
    /// Creates a registry over an empty table with the default page size.
    pub fn new() -> Self {
        Self::with_client(InMemoryKvClient::new())
    }

    /// Creates a registry whose scans read `page_size` items per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self::with_client(InMemoryKvClient::new().with_page_size(page_size))
    }

    fn with_client(client: InMemoryKvClient) -> Self {
        let config = KvStoreConfig::default();
        client.create_table(&config.table_name);
        let client = Arc::new(client);
        Self {
            registry: Registry::new(KvStore::new(Arc::clone(&client), config)),
            client,
        }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.registry.store().config().table_name
    }
}

impl Default for TestKvRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestKvRegistry {
    type Target = Registry<KvStore<Arc<InMemoryKvClient>>>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

/// Runs a test against a registry over a temporary file.
pub fn with_file_registry<F, R>(f: F) -> R
where
    F: FnOnce(&Registry<FileStore>) -> R,
{
    let test = TestFileRegistry::new();
    f(&test.registry)
}

/// Runs a test against a registry over an in-memory table.
pub fn with_kv_registry<F, R>(f: F) -> R
where
    F: FnOnce(&Registry<KvStore<Arc<InMemoryKvClient>>>) -> R,
{
    let test = TestKvRegistry::new();
    f(&test.registry)
}

/// Returns the id of a stored mapping.
pub fn id_of(item: &Item) -> String {
    monkeyreg_storage::item_id(item)
        .expect("Stored item should have an id")
        .to_string()
}

/// Returns a temporary path for a JSON file, with its directory guard.
pub fn temp_json_path(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use monkeyreg_core::Category;
    use monkeyreg_storage::RecordStore;

    /// Fills a registry with `count` valid records spread over every
    /// category, returning their ids.
    pub fn populate<S: RecordStore>(registry: &Registry<S>, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let category = Category::ALL[i % Category::ALL.len()];
                let age = (i as i64) % i64::from(category.max_age() + 1);
                let item = registry
                    .create(NewRecord::new(format!("monkey-{i:03}"), category.as_str(), age))
                    .expect("Failed to create record");
                id_of(&item)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_registry_persists() {
        let test = TestFileRegistry::new();
        let ids = scenarios::populate(&test.registry, 3);

        let reopened = test.reopen();
        assert_eq!(reopened.list(None).unwrap().len(), 3);
        assert!(reopened.get(&ids[0]).unwrap().is_some());
    }

    #[test]
    fn test_kv_registry_shares_client() {
        let test = TestKvRegistry::new();
        scenarios::populate(&test.registry, 4);
        assert_eq!(test.client.item_count(test.table()), 4);
    }

    #[test]
    fn test_with_helpers() {
        let count = with_file_registry(|r| {
            scenarios::populate(r, 2);
            r.list(None).unwrap().len()
        });
        assert_eq!(count, 2);

        let count = with_kv_registry(|r| {
            scenarios::populate(r, 5);
            r.list(None).unwrap().len()
        });
        assert_eq!(count, 5);
    }
}

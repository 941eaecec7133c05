//! JSON file store.

use crate::error::{StorageError, StorageResult};
use crate::item::{
    item_id, matches_natural_key, matches_search, merge_non_null, search_needle, Item, ListFilter,
};
use crate::store::RecordStore;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default location of the registry file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "data/monkeys.json";

/// A store backed by one JSON file holding an array of items.
///
/// Every operation reads and parses the whole file; every mutation
/// serializes and rewrites it. Nothing is cached between calls, so each
/// call sees the file's current contents.
///
/// # Leniency
///
/// A missing, empty or unparseable file reads as an empty collection.
/// The next successful mutation replaces corrupt content.
///
/// # Concurrency
///
/// There is no file locking. Two processes mutating the same file race
/// and the last writer wins. Individual rewrites go through a temporary
/// file and a rename, so readers never observe a half-written file.
///
/// # Example
///
/// ```no_run
/// use monkeyreg_storage::{FileStore, RecordStore};
///
/// let store = FileStore::open("data/monkeys.json").unwrap();
/// let everything = store.list(None).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories and an
    /// empty `[]` file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories or the initial file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.ensure_parent()?;
        if !store.path.exists() {
            fs::write(&store.path, "[]")?;
        }
        Ok(store)
    }

    /// Opens the store at [`DEFAULT_DB_PATH`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn open_default() -> StorageResult<Self> {
        Self::open(DEFAULT_DB_PATH)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load_all(&self) -> StorageResult<Vec<Item>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Item>>(&text) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "registry file is corrupt, reading as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Writes the whole collection: temp file, sync, rename.
    fn save_all(&self, items: &[Item]) -> StorageResult<()> {
        self.ensure_parent()?;
        let data = serde_json::to_vec_pretty(items)?;

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        debug!(path = ?self.path, count = items.len(), "rewrote registry file");
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn create(&self, item: Item) -> StorageResult<Item> {
        let mut items = self.load_all()?;
        let id = item_id(&item).unwrap_or_default().to_string();

        if items.iter().any(|it| item_id(it) == Some(id.as_str())) {
            return Err(StorageError::duplicate_id(id));
        }

        items.push(item.clone());
        self.save_all(&items)?;
        Ok(item)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Item>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|it| item_id(it) == Some(id)))
    }

    fn update(&self, id: &str, fields: Item) -> StorageResult<Option<Item>> {
        let mut items = self.load_all()?;
        let Some(stored) = items.iter_mut().find(|it| item_id(it) == Some(id)) else {
            return Ok(None);
        };

        merge_non_null(stored, fields);
        let merged = stored.clone();
        self.save_all(&items)?;
        Ok(Some(merged))
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut items = self.load_all()?;
        let before = items.len();
        items.retain(|it| item_id(it) != Some(id));

        if items.len() == before {
            return Ok(false);
        }
        self.save_all(&items)?;
        Ok(true)
    }

    fn list(&self, filter: Option<&ListFilter>) -> StorageResult<Vec<Item>> {
        let items = self.load_all()?;
        match filter {
            Some(filter) if !filter.is_empty() => {
                Ok(items.into_iter().filter(|it| filter.matches(it)).collect())
            }
            _ => Ok(items),
        }
    }

    fn search(&self, query: &str) -> StorageResult<Vec<Item>> {
        let Some(needle) = search_needle(query) else {
            return Ok(Vec::new());
        };
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|it| matches_search(it, &needle))
            .collect())
    }

    fn find_by_natural_key(&self, name: &str, category: &str) -> StorageResult<Option<Item>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|it| matches_natural_key(it, name, category)))
    }
}

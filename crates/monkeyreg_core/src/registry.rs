//! The registry service.

use crate::config::{BackendKind, RegistryConfig};
use crate::error::{RegistryError, RegistryResult};
use crate::record::{NewRecord, Record, RecordPatch};
use monkeyreg_storage::{item_id, FileStore, Item, KvClient, KvStore, ListFilter, RecordStore};
use tracing::{debug, info};

/// A registry over a backend chosen at runtime.
pub type DynRegistry = Registry<Box<dyn RecordStore>>;

/// Validated, uniqueness-checked access to a record store.
///
/// Every write goes through [`Record`] validation and the
/// `(name, category)` uniqueness check before the store sees it. Reads
/// pass straight through.
///
/// The uniqueness check and the write that follows are two separate store
/// calls, so concurrent writers may both pass the check. Serialize writers
/// if that matters.
///
/// # Example
///
/// ```rust
/// use monkeyreg_core::{NewRecord, Registry};
/// use monkeyreg_storage::{InMemoryKvClient, KvStore, KvStoreConfig};
///
/// let config = KvStoreConfig::default();
/// let client = InMemoryKvClient::new().with_table(&config.table_name);
/// let registry = Registry::new(KvStore::new(client, config));
///
/// let luna = registry.create(NewRecord::new("Luna", "Marmoset", 3)).unwrap();
/// assert_eq!(luna["category"], "marmoset");
///
/// let clash = registry.create(NewRecord::new("Luna", "marmoset", 5));
/// assert!(clash.unwrap_err().is_duplicate());
/// ```
pub struct Registry<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> Registry<S> {
    /// Creates a registry over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the registry and returns the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Validates and stores a new record.
    ///
    /// Returns the canonical mapping of the stored record.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] if a field is invalid
    /// - [`RegistryError::DuplicateName`] if the name is taken within the
    ///   category
    /// - [`RegistryError::Storage`] if the backend fails
    pub fn create(&self, new: NewRecord) -> RegistryResult<Item> {
        let record = Record::new(new)?;
        self.ensure_unique(&record)?;
        let stored = self.store.create(record.to_item())?;
        info!(id = record.id(), category = %record.category(), "created record");
        Ok(stored)
    }

    /// Like [`Registry::create`], reading the fields from a raw mapping.
    ///
    /// # Errors
    ///
    /// As [`Registry::create`], plus missing or mistyped fields.
    pub fn create_from_item(&self, raw: &Item) -> RegistryResult<Item> {
        self.create(NewRecord::from_item(raw)?)
    }

    /// Stores a record read back from an export, keeping its identity.
    ///
    /// A present `id`, `created_at` and `updated_at` are stored as given;
    /// missing ones are filled in as for a new record. The other fields
    /// are validated as in [`Registry::create`].
    ///
    /// # Errors
    ///
    /// As [`Registry::create`], plus
    /// [`StorageError::DuplicateId`](monkeyreg_storage::StorageError::DuplicateId)
    /// (inside [`RegistryError::Storage`]) if the id is already stored.
    pub fn restore(&self, raw: &Item) -> RegistryResult<Item> {
        let record = Record::from_item(raw)?;
        self.ensure_unique(&record)?;
        let stored = self.store.create(record.to_item())?;
        info!(id = record.id(), category = %record.category(), "restored record");
        Ok(stored)
    }

    /// Returns the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the backend fails.
    pub fn get(&self, id: &str) -> RegistryResult<Option<Item>> {
        Ok(self.store.get(id)?)
    }

    /// Applies a partial update to an existing record.
    ///
    /// Returns `None` if no record has this id. The patched record is
    /// validated as a whole and checked for uniqueness, ignoring itself.
    ///
    /// # Errors
    ///
    /// As [`Registry::create`]. A stored record that no longer validates
    /// also yields [`RegistryError::Validation`].
    pub fn update(&self, id: &str, patch: &RecordPatch) -> RegistryResult<Option<Item>> {
        let Some(current) = self.store.get(id)? else {
            debug!(id, "update of unknown record");
            return Ok(None);
        };

        let mut record = Record::from_item(&current)?;
        record.apply(patch)?;
        self.ensure_unique(&record)?;

        let updated = self.store.update(id, record.to_item())?;
        if updated.is_some() {
            info!(id, "updated record");
        }
        Ok(updated)
    }

    /// Like [`Registry::update`], reading the patch from a raw mapping.
    ///
    /// # Errors
    ///
    /// As [`Registry::update`], plus mistyped fields.
    pub fn update_from_item(&self, id: &str, raw: &Item) -> RegistryResult<Option<Item>> {
        self.update(id, &RecordPatch::from_item(raw)?)
    }

    /// Deletes a record. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the backend fails.
    pub fn delete(&self, id: &str) -> RegistryResult<bool> {
        let removed = self.store.delete(id)?;
        if removed {
            info!(id, "deleted record");
        }
        Ok(removed)
    }

    /// Lists records, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the backend fails.
    pub fn list(&self, filter: Option<&ListFilter>) -> RegistryResult<Vec<Item>> {
        Ok(self.store.list(filter)?)
    }

    /// Returns records whose name or category contains `query`, ignoring
    /// case. A blank query matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Storage`] if the backend fails.
    pub fn search(&self, query: &str) -> RegistryResult<Vec<Item>> {
        Ok(self.store.search(query)?)
    }

    fn ensure_unique(&self, record: &Record) -> RegistryResult<()> {
        let (name, category) = record.natural_key();
        match self.store.find_by_natural_key(name, category)? {
            Some(existing) if item_id(&existing) != Some(record.id()) => {
                debug!(
                    name,
                    category,
                    existing = item_id(&existing).unwrap_or_default(),
                    "name already taken"
                );
                Err(RegistryError::duplicate_name(name, category))
            }
            _ => Ok(()),
        }
    }
}

impl DynRegistry {
    /// Opens the backend selected by `config`.
    ///
    /// The key-value backend uses `kv_client` when given. Without one it
    /// connects to DynamoDB in the configured region if the `dynamodb`
    /// feature is enabled. The file backend ignores the client.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidConfig`] if the key-value backend is
    ///   selected without a client and without the `dynamodb` feature
    /// - [`RegistryError::Storage`] if the file cannot be prepared or the
    ///   client cannot be started
    pub fn from_config(
        config: &RegistryConfig,
        kv_client: Option<Box<dyn KvClient>>,
    ) -> RegistryResult<Self> {
        let store: Box<dyn RecordStore> = match config.backend {
            BackendKind::File => Box::new(FileStore::open(&config.db_path)?),
            BackendKind::Kv => {
                let client = match kv_client {
                    Some(client) => client,
                    None => default_kv_client(config)?,
                };
                Box::new(KvStore::new(client, config.kv.clone()))
            }
        };
        info!(backend = %config.backend, "opened registry");
        Ok(Self::new(store))
    }
}

#[cfg(feature = "dynamodb")]
fn default_kv_client(config: &RegistryConfig) -> RegistryResult<Box<dyn KvClient>> {
    let client = monkeyreg_storage::DynamoDbClient::connect(&config.kv.region)
        .map_err(monkeyreg_storage::StorageError::from)?;
    Ok(Box::new(client))
}

#[cfg(not(feature = "dynamodb"))]
fn default_kv_client(_config: &RegistryConfig) -> RegistryResult<Box<dyn KvClient>> {
    Err(RegistryError::invalid_config("kv backend selected but no client was given"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use monkeyreg_storage::{InMemoryKvClient, KvStoreConfig, StorageError};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn file_registry() -> (tempfile::TempDir, Registry<FileStore>) {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("monkeys.json")).unwrap();
        (dir, Registry::new(store))
    }

    fn id_of(item: &Item) -> String {
        item_id(item).unwrap().to_string()
    }

    #[test]
    fn create_returns_canonical_mapping() {
        let (_dir, registry) = file_registry();
        let item = registry
            .create(NewRecord::new(" Luna ", "Marmoset", 3))
            .unwrap();

        assert_eq!(item["name"], "Luna");
        assert_eq!(item["category"], "marmoset");
        assert_eq!(item["note"], "");
        assert_eq!(registry.get(&id_of(&item)).unwrap(), Some(item));
    }

    #[test]
    fn create_rejects_invalid_input() {
        let (_dir, registry) = file_registry();
        let err = registry
            .create(NewRecord::new("Luna", "marmoset", 23))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(registry.list(None).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_duplicate_name_in_category() {
        let (_dir, registry) = file_registry();
        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();

        let err = registry
            .create(NewRecord::new("Luna", "MARMOSET", 5))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateName { ref name, ref category }
                if name == "Luna" && category == "marmoset"
        ));

        // Same name in another category is fine.
        registry.create(NewRecord::new("Luna", "howler", 5)).unwrap();
        assert_eq!(registry.list(None).unwrap().len(), 2);
    }

    #[test]
    fn uniqueness_ignores_name_case() {
        let (_dir, registry) = file_registry();
        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();
        let err = registry
            .create(NewRecord::new("LUNA", "marmoset", 3))
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn update_applies_patch() {
        let (_dir, registry) = file_registry();
        let item = registry.create(NewRecord::new("Koko", "howler", 30)).unwrap();
        let id = id_of(&item);

        let updated = registry
            .update(&id, &RecordPatch::new().note("moved to east wing"))
            .unwrap()
            .unwrap();
        assert_eq!(updated["note"], "moved to east wing");
        assert_eq!(updated["created_at"], item["created_at"]);
        assert!(updated["updated_at"].as_str() >= item["updated_at"].as_str());
    }

    #[test]
    fn update_to_own_name_is_allowed() {
        let (_dir, registry) = file_registry();
        let item = registry.create(NewRecord::new("Koko", "howler", 30)).unwrap();
        let id = id_of(&item);

        let updated = registry
            .update(&id, &RecordPatch::new().name("KOKO").age(31))
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], "KOKO");
        assert_eq!(updated["age"], 31);
    }

    #[test]
    fn update_into_taken_name_fails() {
        let (_dir, registry) = file_registry();
        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();
        let other = registry.create(NewRecord::new("Luna", "howler", 30)).unwrap();
        let id = id_of(&other);

        let err = registry
            .update(&id, &RecordPatch::new().category("marmoset").age(4))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(registry.get(&id).unwrap(), Some(other));
    }

    #[test]
    fn update_revalidates_category_against_age() {
        let (_dir, registry) = file_registry();
        let item = registry.create(NewRecord::new("Koko", "howler", 30)).unwrap();

        let err = registry
            .update(&id_of(&item), &RecordPatch::new().category("marmoset"))
            .unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::InvalidAge { age: 30, max: 22, .. })
        ));
    }

    #[test]
    fn update_unknown_id_is_none() {
        let (_dir, registry) = file_registry();
        let result = registry
            .update("monkey_missing", &RecordPatch::new().age(1))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn raw_mapping_entry_points() {
        let (_dir, registry) = file_registry();
        let raw: Item = serde_json::from_str(r#"{"name": "Koko", "category": "howler", "age": 7}"#)
            .unwrap();
        let item = registry.create_from_item(&raw).unwrap();

        let patch: Item = serde_json::from_str(r#"{"age": 8, "note": null}"#).unwrap();
        let updated = registry
            .update_from_item(&id_of(&item), &patch)
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], 8);
        assert_eq!(updated["note"], "");
    }

    #[test]
    fn restore_keeps_identity_and_checks_conflicts() {
        let (_dir, registry) = file_registry();
        let raw: Item = serde_json::from_str(
            r#"{
                "id": "monkey_0000beef",
                "name": "Koko",
                "category": "Howler",
                "age": 7,
                "note": "",
                "last_check_time": null,
                "created_at": "2020-02-02T02:02:02Z",
                "updated_at": "2021-03-03T03:03:03Z"
            }"#,
        )
        .unwrap();

        let restored = registry.restore(&raw).unwrap();
        assert_eq!(restored["id"], "monkey_0000beef");
        assert_eq!(restored["category"], "howler");
        assert_eq!(restored["created_at"], "2020-02-02T02:02:02Z");
        assert_eq!(restored["updated_at"], "2021-03-03T03:03:03Z");
        assert_eq!(registry.get("monkey_0000beef").unwrap(), Some(restored));

        let err = registry.restore(&raw).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Storage(StorageError::DuplicateId { .. })
        ));

        let mut renamed = raw.clone();
        renamed.insert("id".into(), serde_json::json!("monkey_0000cafe"));
        assert!(matches!(
            registry.restore(&renamed),
            Err(RegistryError::DuplicateName { .. })
        ));
        assert_eq!(registry.list(None).unwrap().len(), 1);
    }

    #[test]
    fn delete_reports_removal() {
        let (_dir, registry) = file_registry();
        let item = registry.create(NewRecord::new("Koko", "howler", 7)).unwrap();
        let id = id_of(&item);

        assert!(registry.delete(&id).unwrap());
        assert!(!registry.delete(&id).unwrap());
        assert!(registry.get(&id).unwrap().is_none());
    }

    #[test]
    fn list_and_search_pass_through() {
        let (_dir, registry) = file_registry();
        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();
        registry.create(NewRecord::new("Koko", "howler", 30)).unwrap();

        let marmosets = registry
            .list(Some(&ListFilter::new().with_category("Marmoset")))
            .unwrap();
        assert_eq!(marmosets.len(), 1);
        assert_eq!(registry.search("HOW").unwrap().len(), 1);
        assert!(registry.search("  ").unwrap().is_empty());
    }

    #[test]
    fn storage_failures_surface() {
        let config = KvStoreConfig::default();
        let client = Arc::new(InMemoryKvClient::new().with_table(&config.table_name));
        let registry = Registry::new(KvStore::new(Arc::clone(&client), config));

        client.set_available(false);
        let err = registry
            .create(NewRecord::new("Luna", "marmoset", 3))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Storage(ref e) if e.is_unavailable()));
        assert!(matches!(
            registry.list(None),
            Err(RegistryError::Storage(StorageError::BackendUnavailable { .. }))
        ));
    }

    #[test]
    fn from_config_opens_file_backend() {
        let dir = tempdir().unwrap();
        let config = RegistryConfig::new().db_path(dir.path().join("nested/monkeys.json"));
        let registry = DynRegistry::from_config(&config, None).unwrap();

        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();
        assert!(dir.path().join("nested/monkeys.json").exists());
    }

    #[test]
    fn from_config_opens_kv_backend() {
        let config = RegistryConfig::new().backend(BackendKind::Kv);
        let client = InMemoryKvClient::new().with_table(&config.kv.table_name);
        let registry = DynRegistry::from_config(&config, Some(Box::new(client))).unwrap();

        registry.create(NewRecord::new("Luna", "marmoset", 3)).unwrap();
        assert_eq!(registry.list(None).unwrap().len(), 1);
    }

    #[test]
    #[cfg(not(feature = "dynamodb"))]
    fn from_config_requires_kv_client() {
        let config = RegistryConfig::new().backend(BackendKind::Kv);
        let result = DynRegistry::from_config(&config, None);
        assert!(matches!(result, Err(RegistryError::InvalidConfig { .. })));
    }
}

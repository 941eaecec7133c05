//! Record store over a remote key-value table.

use super::attribute::{from_kv_item, to_kv_item, AttributeValue, KvItem};
use super::client::{Condition, ItemKey, KvClient, KvError, WriteCondition};
use crate::error::{StorageError, StorageResult};
use crate::item::{
    fold, folded_field, item_id, merge_non_null, refreshed_updated_at, search_needle, Item,
    ListFilter, FIELD_CATEGORY, FIELD_CREATED_AT, FIELD_NAME, FIELD_UPDATED_AT,
};
use crate::store::RecordStore;
use serde_json::Value;
use tracing::debug;

/// Partition key attribute name.
pub const PARTITION_KEY_ATTR: &str = "PK";
/// Sort key attribute name.
pub const SORT_KEY_ATTR: &str = "SK";
/// Discriminator attribute naming the entity kind of an item.
pub const ENTITY_KIND_ATTR: &str = "entity";
/// Lowercased, trimmed copy of the name.
pub const NAME_LC_ATTR: &str = "name_lc";
/// Lowercased, trimmed copy of the category.
pub const CATEGORY_LC_ATTR: &str = "category_lc";

/// Attributes that exist only inside the table and are stripped on read.
pub const BACKEND_ONLY_ATTRS: [&str; 5] = [
    PARTITION_KEY_ATTR,
    SORT_KEY_ATTR,
    ENTITY_KIND_ATTR,
    NAME_LC_ATTR,
    CATEGORY_LC_ATTR,
];

/// Configuration for a [`KvStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvStoreConfig {
    /// Name of the physical table.
    pub table_name: String,
    /// Region the table lives in. Used by network clients.
    pub region: String,
    /// Prefix of both key components, followed by the record id.
    pub key_prefix: String,
    /// Value of the discriminator attribute for registry items.
    pub entity_kind: String,
}

impl Default for KvStoreConfig {
    fn default() -> Self {
        Self {
            table_name: "monkey-registry".to_string(),
            region: "eu-west-1".to_string(),
            key_prefix: "MONKEY#".to_string(),
            entity_kind: "MONKEY".to_string(),
        }
    }
}

impl KvStoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table name.
    #[must_use]
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Sets the entity kind discriminator.
    #[must_use]
    pub fn entity_kind(mut self, entity_kind: impl Into<String>) -> Self {
        self.entity_kind = entity_kind.into();
        self
    }
}

/// A [`RecordStore`] over a remote key-value table.
///
/// # Key design
///
/// Both key components are `key_prefix + id` (e.g. `MONKEY#monkey_1a2b3c4d`),
/// and every item carries an `entity` discriminator, so the table can host
/// unrelated entity kinds. Two helper attributes, `name_lc` and
/// `category_lc`, hold trimmed lowercase copies for case-insensitive
/// filtering. All five are stripped before items leave the store, so the
/// returned shape equals the [`crate::FileStore`] shape.
///
/// # Consistency
///
/// - `create` is a conditional write: a true atomic duplicate-id guard.
/// - `update` is read-modify-write. A concurrent external writer between
///   the read and the write is silently overwritten; a concurrent delete
///   is detected and reported as not found.
/// - `delete` is conditional on the item existing, so it reports absence
///   like the file store does.
///
/// # Queries
///
/// `list`, `search` and `find_by_natural_key` are full-table scans with
/// filters on the discriminator and helper attributes, following
/// pagination to the end. A secondary index on `(category_lc, name_lc)`
/// would speed these up at scale but is not needed for correctness.
pub struct KvStore<C: KvClient> {
    client: C,
    config: KvStoreConfig,
}

impl<C: KvClient> KvStore<C> {
    /// Creates a store over `client` with the given configuration.
    pub fn new(client: C, config: KvStoreConfig) -> Self {
        Self { client, config }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &KvStoreConfig {
        &self.config
    }

    /// Builds the composite key for a record id.
    #[must_use]
    pub fn key_for(&self, id: &str) -> ItemKey {
        let key = format!("{}{}", self.config.key_prefix, id);
        ItemKey::new(key.clone(), key)
    }

    fn table(&self) -> &str {
        &self.config.table_name
    }

    fn exists_condition() -> WriteCondition {
        WriteCondition::AttributeExists(PARTITION_KEY_ATTR.to_string())
    }

    fn entity_filter(&self) -> Condition {
        Condition::eq(ENTITY_KIND_ATTR, self.config.entity_kind.clone())
    }

    /// Adds keys, discriminator and helper attributes to a canonical item.
    fn to_stored(&self, item: &Item) -> StorageResult<KvItem> {
        let id = item_id(item)
            .ok_or_else(|| StorageError::malformed_item("item has no string id"))?;
        let key = self.key_for(id);

        let mut stored = to_kv_item(item)?;
        stored.insert(PARTITION_KEY_ATTR.into(), AttributeValue::S(key.partition_key));
        stored.insert(SORT_KEY_ATTR.into(), AttributeValue::S(key.sort_key));
        stored.insert(
            ENTITY_KIND_ATTR.into(),
            AttributeValue::s(self.config.entity_kind.clone()),
        );
        stored.insert(
            NAME_LC_ATTR.into(),
            AttributeValue::S(folded_field(item, FIELD_NAME)),
        );
        stored.insert(
            CATEGORY_LC_ATTR.into(),
            AttributeValue::S(folded_field(item, FIELD_CATEGORY)),
        );
        Ok(stored)
    }

    fn from_stored(stored: &KvItem) -> StorageResult<Item> {
        from_kv_item(stored, &BACKEND_ONLY_ATTRS)
    }

    /// Scans the whole table, following pagination.
    fn scan_all(&self, filter: &Condition) -> StorageResult<Vec<Item>> {
        let mut out = Vec::new();
        let mut start_key: Option<ItemKey> = None;
        let mut pages = 0usize;

        loop {
            let page = self.client.scan(self.table(), Some(filter), start_key.as_ref())?;
            pages += 1;
            for stored in &page.items {
                out.push(Self::from_stored(stored)?);
            }
            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        debug!(table = self.table(), pages, matched = out.len(), "scan complete");
        Ok(out)
    }
}

impl<C: KvClient> RecordStore for KvStore<C> {
    fn create(&self, item: Item) -> StorageResult<Item> {
        let stored = self.to_stored(&item)?;
        let guard = WriteCondition::AttributeNotExists(PARTITION_KEY_ATTR.to_string());

        match self.client.put_item(self.table(), stored.clone(), Some(&guard)) {
            Ok(()) => Self::from_stored(&stored),
            Err(KvError::ConditionFailed) => Err(StorageError::duplicate_id(
                item_id(&item).unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: &str) -> StorageResult<Option<Item>> {
        self.client
            .get_item(self.table(), &self.key_for(id))?
            .map(|stored| Self::from_stored(&stored))
            .transpose()
    }

    fn update(&self, id: &str, fields: Item) -> StorageResult<Option<Item>> {
        let Some(current) = self.get(id)? else {
            return Ok(None);
        };

        let mut merged = current;
        merge_non_null(&mut merged, fields);
        let updated_at =
            refreshed_updated_at(merged.get(FIELD_CREATED_AT).and_then(Value::as_str));
        merged.insert(FIELD_UPDATED_AT.into(), Value::String(updated_at));

        let stored = self.to_stored(&merged)?;
        match self
            .client
            .put_item(self.table(), stored.clone(), Some(&Self::exists_condition()))
        {
            Ok(()) => Self::from_stored(&stored).map(Some),
            // Deleted between the read and the write.
            Err(KvError::ConditionFailed) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        match self.client.delete_item(
            self.table(),
            &self.key_for(id),
            Some(&Self::exists_condition()),
        ) {
            Ok(()) => Ok(true),
            Err(KvError::ConditionFailed) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, filter: Option<&ListFilter>) -> StorageResult<Vec<Item>> {
        let mut condition = self.entity_filter();
        if let Some(filter) = filter {
            if let Some(category) = filter.category_needle() {
                condition = condition.and(Condition::eq(CATEGORY_LC_ATTR, category));
            }
            if let Some(name) = filter.name_needle() {
                condition = condition.and(Condition::contains(NAME_LC_ATTR, name));
            }
        }
        self.scan_all(&condition)
    }

    fn search(&self, query: &str) -> StorageResult<Vec<Item>> {
        let Some(needle) = search_needle(query) else {
            return Ok(Vec::new());
        };
        let condition = self.entity_filter().and(Condition::Or(vec![
            Condition::contains(NAME_LC_ATTR, needle.clone()),
            Condition::contains(CATEGORY_LC_ATTR, needle),
        ]));
        self.scan_all(&condition)
    }

    fn find_by_natural_key(&self, name: &str, category: &str) -> StorageResult<Option<Item>> {
        let condition = self
            .entity_filter()
            .and(Condition::eq(NAME_LC_ATTR, fold(name)))
            .and(Condition::eq(CATEGORY_LC_ATTR, fold(category)));
        Ok(self.scan_all(&condition)?.into_iter().next())
    }
}

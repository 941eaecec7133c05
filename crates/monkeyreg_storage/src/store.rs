//! Storage port definition.

use crate::error::StorageResult;
use crate::item::{Item, ListFilter};

/// The capability set every registry backend provides.
///
/// Stores operate on the canonical [`Item`] form and know nothing about
/// validation. Uniqueness of the `(name, category)` pair is enforced by the
/// layer above; stores only guard against duplicate ids.
///
/// # Invariants
///
/// - `create` never overwrites an existing id
/// - `update` merges only non-null fields and never creates an item
/// - `list` returns a stable order for an unchanged dataset
/// - items returned by every operation have the same shape on every backend
///
/// # Implementors
///
/// - [`crate::FileStore`] - a single JSON file rewritten on every mutation
/// - [`crate::KvStore`] - a remote key-value table reached through a [`crate::KvClient`]
pub trait RecordStore: Send + Sync {
    /// Stores a new item and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::DuplicateId`] if the id is already stored,
    /// or a backend error if the write fails.
    fn create(&self, item: Item) -> StorageResult<Item>;

    /// Fetches an item by id. Absence is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, id: &str) -> StorageResult<Option<Item>>;

    /// Merges the non-null `fields` onto the stored item and persists it.
    ///
    /// Returns the merged item, or `None` if no item has this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written.
    fn update(&self, id: &str, fields: Item) -> StorageResult<Option<Item>>;

    /// Removes an item. Returns `false` if no item had this id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn delete(&self, id: &str) -> StorageResult<bool>;

    /// Lists items, optionally filtered. `None` returns everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn list(&self, filter: Option<&ListFilter>) -> StorageResult<Vec<Item>>;

    /// Case-insensitive substring search over name and category.
    ///
    /// A blank query returns no items.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn search(&self, query: &str) -> StorageResult<Vec<Item>>;

    /// Finds an item whose name and category equal the given pair,
    /// ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_by_natural_key(&self, name: &str, category: &str) -> StorageResult<Option<Item>>;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn create(&self, item: Item) -> StorageResult<Item> {
        (**self).create(item)
    }

    fn get(&self, id: &str) -> StorageResult<Option<Item>> {
        (**self).get(id)
    }

    fn update(&self, id: &str, fields: Item) -> StorageResult<Option<Item>> {
        (**self).update(id, fields)
    }

    fn delete(&self, id: &str) -> StorageResult<bool> {
        (**self).delete(id)
    }

    fn list(&self, filter: Option<&ListFilter>) -> StorageResult<Vec<Item>> {
        (**self).list(filter)
    }

    fn search(&self, query: &str) -> StorageResult<Vec<Item>> {
        (**self).search(query)
    }

    fn find_by_natural_key(&self, name: &str, category: &str) -> StorageResult<Option<Item>> {
        (**self).find_by_natural_key(name, category)
    }
}

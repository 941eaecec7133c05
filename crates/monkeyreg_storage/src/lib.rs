//! # Monkey Registry Storage
//!
//! The storage port of the monkey registry and its two backends.
//!
//! Stores are **validation-free**: they move canonical [`Item`] mappings
//! in and out and guard only against duplicate ids. Record validation and
//! the `(name, category)` uniqueness rule live in `monkeyreg_core`.
//!
//! ## Available Backends
//!
//! - [`FileStore`] - one JSON array file, fully rewritten on every mutation
//! - [`KvStore`] - a remote key-value table reached through a [`KvClient`]
//!
//! [`InMemoryKvClient`] stands in for the hosted table in tests. With the
//! `dynamodb` feature, `DynamoDbClient` binds [`KvStore`] to Amazon
//! DynamoDB.
//!
//! ## Example
//!
//! ```rust
//! use monkeyreg_storage::{InMemoryKvClient, KvStore, KvStoreConfig, RecordStore};
//! use serde_json::json;
//!
//! let config = KvStoreConfig::default();
//! let client = InMemoryKvClient::new().with_table(&config.table_name);
//! let store = KvStore::new(client, config);
//!
//! let item = json!({"id": "monkey_0001", "name": "luna", "category": "marmoset"});
//! store.create(item.as_object().cloned().unwrap()).unwrap();
//! assert!(store.get("monkey_0001").unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod item;
pub mod kv;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::{FileStore, DEFAULT_DB_PATH};
pub use item::{
    fold, item_id, merge_non_null, refreshed_updated_at, timestamp_now, Item, ListFilter,
    CANONICAL_FIELDS, FIELD_AGE, FIELD_CATEGORY, FIELD_CREATED_AT, FIELD_ID,
    FIELD_LAST_CHECK_TIME, FIELD_NAME, FIELD_NOTE, FIELD_UPDATED_AT,
};
#[cfg(feature = "dynamodb")]
pub use kv::DynamoDbClient;
pub use kv::{
    AttributeValue, Condition, FilterExpression, InMemoryKvClient, ItemKey, KvClient, KvError,
    KvItem, KvResult, KvStore, KvStoreConfig, ScanPage, WriteCondition,
};
pub use store::RecordStore;

//! Remote key-value table backend.
//!
//! - [`attribute`]: attribute values and numeric normalization
//! - [`client`]: the [`KvClient`] transport seam, keys and conditions
//! - [`memory`]: [`InMemoryKvClient`], an in-process table
//! - [`store`]: [`KvStore`], the [`crate::RecordStore`] implementation
//! - `dynamodb`: `DynamoDbClient`, the hosted table (feature `dynamodb`)

pub mod attribute;
pub mod client;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;
pub mod store;

pub use attribute::{normalize_number, AttributeValue, KvItem};
pub use client::{
    Condition, FilterExpression, ItemKey, KvClient, KvError, KvResult, ScanPage, WriteCondition,
};
#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbClient;
pub use memory::{InMemoryKvClient, DEFAULT_SCAN_PAGE_SIZE};
pub use store::{KvStore, KvStoreConfig, BACKEND_ONLY_ATTRS};

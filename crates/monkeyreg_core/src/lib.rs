//! # Monkey Registry Core
//!
//! The record model and registry service of the monkey registry.
//!
//! This crate provides:
//! - [`Record`] with its validation rules and canonical mapping
//! - [`Registry`], which enforces validation and `(name, category)`
//!   uniqueness over any [`monkeyreg_storage::RecordStore`]
//! - [`RegistryConfig`] for choosing a backend at runtime
//! - Bulk import through the registry ([`import`])
//!
//! ## Example
//!
//! ```rust
//! use monkeyreg_core::{NewRecord, RecordPatch, Registry};
//! use monkeyreg_storage::FileStore;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let registry = Registry::new(FileStore::open(dir.path().join("monkeys.json")).unwrap());
//!
//! let koko = registry.create(NewRecord::new("Koko", "howler", 30)).unwrap();
//! let id = koko["id"].as_str().unwrap();
//!
//! let koko = registry.update(id, &RecordPatch::new().note("loud")).unwrap().unwrap();
//! assert_eq!(koko["note"], "loud");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod category;
mod config;
mod error;
pub mod import;
mod record;
mod registry;

pub use category::{Category, CAPPED_MAX_AGE, MAX_AGE};
pub use config::{BackendKind, RegistryConfig};
pub use error::{RegistryError, RegistryResult, ValidationError};
pub use import::{import_rows, read_rows, ImportMode, ImportOptions, ImportReport};
pub use record::{
    generate_id, validate_age, validate_name, validate_timestamp, NewRecord, Record, RecordPatch,
    ID_PREFIX, MAX_NAME_LEN, MIN_NAME_LEN,
};
pub use registry::{DynRegistry, Registry};

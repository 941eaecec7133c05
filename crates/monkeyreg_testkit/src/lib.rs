//! # Monkey Registry Testkit
//!
//! Test utilities for the monkey registry.
//!
//! This crate provides:
//! - Registries over each backend with automatic cleanup
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use monkeyreg_testkit::prelude::*;
//! use monkeyreg_core::NewRecord;
//!
//! with_kv_registry(|registry| {
//!     registry.create(NewRecord::new("Luna", "marmoset", 2)).unwrap();
//!     assert_eq!(registry.search("lun").unwrap().len(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;

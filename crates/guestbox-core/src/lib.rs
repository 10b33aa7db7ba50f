//! # Guestbox Core
//!
//! Shared, WASM-safe logic for Guestbox: guest-mode data models, the
//! storage-area abstraction, the quota-aware store with its typed
//! collections, the export/import codec, and the account migration pipeline.
//!
//! This crate contains no tokio, filesystem I/O, or HTTP client. Storage is
//! reached only through [`store::StorageArea`], and the remote account only
//! through [`migration::AccountStore`], so it compiles to both native targets
//! and `wasm32-unknown-unknown` (where the area wraps `localStorage`).

pub mod codec;
pub mod collections;
pub mod error;
pub mod migration;
pub mod models;
pub mod store;

pub use error::{ImportError, MigrationError, StoreError};
pub use store::{GuestStore, StorageArea, StorageStats, StoreOptions};

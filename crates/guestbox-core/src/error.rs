//! Error types for the guest store, the import codec, and migration.
//!
//! Nothing in this crate panics across its public boundary: storage failures,
//! quota rejections, and malformed imports all come back as values of these
//! enums so callers can tell "storage full" from "bad file" from "nothing to do".

use thiserror::Error;

/// Failure of a write against the guest store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The serialized document is larger than the configured quota.
    /// Storage was not touched.
    #[error("guest storage full: {size} bytes exceeds quota of {quota} bytes")]
    QuotaExceeded { size: u64, quota: u64 },

    /// The storage area rejected the operation (platform quota, I/O error).
    #[error("storage error: {0}")]
    Storage(String),

    /// The document could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// Another writer changed the document between our read and our write.
    #[error("guest data changed concurrently (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },

    /// The stored document was written by a newer schema and is left as is.
    #[error("stored guest data has unsupported version {0}; clear it before writing")]
    UnsupportedVersion(u32),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// Failure of [`GuestStore::import`](crate::store::GuestStore::import).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The text is not a guest data document. Existing data is unchanged.
    #[error("invalid guest data document: {0}")]
    Parse(String),

    /// The document was written by a newer schema than this build understands.
    #[error("unsupported guest data version {0}")]
    UnsupportedVersion(u32),

    /// The document parsed but could not be stored (e.g. over quota).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of the migration run as a whole.
///
/// Per-item failures are never reported here; they are counted in the
/// [`MigrationReport`](crate::migration::MigrationReport).
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The authenticated account could not be resolved before any item was sent.
    #[error("could not resolve target account: {0}")]
    Account(String),
}

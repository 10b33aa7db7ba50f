//! Quota-aware guest store.
//!
//! [`GuestStore`] is the sole gate to persistence. It holds the whole
//! [`GuestData`] document as one JSON string under a single key of a
//! [`StorageArea`], rewrites it as a whole on every mutation, and refuses any
//! write whose serialized size would exceed the configured quota.
//!
//! The guest-mode flag lives under a second key of the same area and is
//! mirrored in memory on the store object.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`read`](GuestStore::read) | Current document, `None` if absent or corrupt |
//! | [`write`](GuestStore::write) | Replace the document (quota-checked) |
//! | [`update_section`](GuestStore::update_section) | Overwrite one top-level section |
//! | [`clear`](GuestStore::clear) | Remove the document |
//! | [`available_bytes`](GuestStore::available_bytes) | Quota headroom |
//! | [`stats`](GuestStore::stats) | Used/total/percent for display |

pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{GuestData, Section, SCHEMA_VERSION};

/// Default quota: 5 MiB of serialized JSON.
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_DATA_KEY: &str = "guest_data";
pub const DEFAULT_FLAG_KEY: &str = "guest_mode";

/// Object-safe string key/value area, shaped like DOM `Storage`.
pub trait StorageArea: Send + Sync {
    /// Value stored under `key`, or `None` if missing or unreadable.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Keys and limits used by a [`GuestStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub data_key: String,
    pub flag_key: String,
    pub quota_bytes: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_key: DEFAULT_DATA_KEY.to_string(),
            flag_key: DEFAULT_FLAG_KEY.to_string(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

/// Storage usage for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageStats {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent_used: f64,
}

/// Guest-mode data store, constructed once per session and shared by reference.
pub struct GuestStore {
    area: Arc<dyn StorageArea>,
    options: StoreOptions,
    guest_mode: AtomicBool,
    lock: Mutex<()>,
}

impl GuestStore {
    /// Open a store over `area`, loading the persisted guest-mode flag.
    pub fn new(area: Arc<dyn StorageArea>, options: StoreOptions) -> Self {
        let flag = area.get_item(&options.flag_key).as_deref() == Some("true");
        Self {
            area,
            options,
            guest_mode: AtomicBool::new(flag),
            lock: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ─── Guest-mode flag ────────────────────────────────────────────

    pub fn is_guest_mode(&self) -> bool {
        self.guest_mode.load(Ordering::SeqCst)
    }

    /// Enter guest mode: write the default skeleton if no guest data exists
    /// yet, then persist the flag. Existing data is left untouched; if the
    /// skeleton cannot be written the flag is not set.
    pub fn enable_guest_mode(&self) -> Result<(), StoreError> {
        if self.load()?.is_none() {
            info!("initializing guest data");
            self.write(&GuestData::empty())?;
        }

        self.area
            .set_item(&self.options.flag_key, "true")
            .map_err(storage_err)?;
        self.guest_mode.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Leave guest mode. Guest data is kept until [`clear`](Self::clear).
    pub fn disable_guest_mode(&self) -> Result<(), StoreError> {
        self.area
            .remove_item(&self.options.flag_key)
            .map_err(storage_err)?;
        self.guest_mode.store(false, Ordering::SeqCst);
        Ok(())
    }

    // ─── Document primitives ────────────────────────────────────────

    /// The stored document, or `None` when absent, corrupt, or written by a
    /// newer schema.
    pub fn read(&self) -> Option<GuestData> {
        self.load().ok().flatten()
    }

    /// Replace the whole document.
    ///
    /// Fails with [`StoreError::QuotaExceeded`] if the serialized document is
    /// larger than the quota, and with [`StoreError::UnsupportedVersion`] if
    /// the stored document comes from a newer schema; in both cases storage
    /// is not modified.
    pub fn write(&self, data: &GuestData) -> Result<(), StoreError> {
        let _guard = self.guard();
        let current = self.stored_revision()?;
        let mut next = data.clone();
        next.revision = current.max(data.revision) + 1;
        self.persist(&next)
    }

    /// Overwrite one top-level section, stamping `last_updated`.
    pub fn update_section(&self, section: Section) -> Result<(), StoreError> {
        debug!(section = section.name(), "updating guest data section");
        self.transact(|data| {
            section.apply(data);
            ((), true)
        })
    }

    /// Remove the stored document. Removing an absent document succeeds.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.guard();
        self.area
            .remove_item(&self.options.data_key)
            .map_err(storage_err)?;
        info!("guest data cleared");
        Ok(())
    }

    /// Size in bytes of the stored document (0 when absent).
    pub fn used_bytes(&self) -> u64 {
        self.area
            .get_item(&self.options.data_key)
            .map(|raw| raw.len() as u64)
            .unwrap_or(0)
    }

    /// Quota minus the current serialized size.
    pub fn available_bytes(&self) -> u64 {
        self.options.quota_bytes.saturating_sub(self.used_bytes())
    }

    pub fn stats(&self) -> StorageStats {
        let used_bytes = self.used_bytes();
        let total_bytes = self.options.quota_bytes;
        let percent_used = if total_bytes > 0 {
            used_bytes as f64 * 100.0 / total_bytes as f64
        } else {
            0.0
        };
        StorageStats {
            used_bytes,
            total_bytes,
            percent_used,
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Read-modify-write under the store lock.
    ///
    /// `f` returns its result and whether it changed the document; unchanged
    /// documents are not written. The revision read at the start must still
    /// be the stored revision when writing, otherwise another process wrote
    /// in between and the update is refused.
    pub(crate) fn transact<R>(
        &self,
        f: impl FnOnce(&mut GuestData) -> (R, bool),
    ) -> Result<R, StoreError> {
        let _guard = self.guard();
        let expected = self.stored_revision()?;
        let mut data = self.load()?.unwrap_or_else(GuestData::empty);

        let (out, changed) = f(&mut data);
        if !changed {
            return Ok(out);
        }

        let found = self.stored_revision()?;
        if found != expected {
            warn!(expected, found, "guest data revision moved during update");
            return Err(StoreError::Conflict { expected, found });
        }

        data.last_updated = Utc::now();
        data.revision = expected + 1;
        self.persist(&data)?;
        Ok(out)
    }

    fn persist(&self, data: &GuestData) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(data).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let size = json.len() as u64;
        if size > self.options.quota_bytes {
            warn!(size, quota = self.options.quota_bytes, "guest data write rejected: over quota");
            return Err(StoreError::QuotaExceeded {
                size,
                quota: self.options.quota_bytes,
            });
        }
        self.area
            .set_item(&self.options.data_key, &json)
            .map_err(storage_err)?;
        debug!(size, revision = data.revision, "guest data written");
        Ok(())
    }

    /// Stored document, distinguishing a newer schema (an error, never
    /// overwritten) from an absent or corrupt blob (`None`).
    fn load(&self) -> Result<Option<GuestData>, StoreError> {
        let raw = match self.area.get_item(&self.options.data_key) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        if let Some(header) = parse_header(&raw) {
            if header.version > SCHEMA_VERSION {
                warn!(version = header.version, "stored guest data has an unsupported version");
                return Err(StoreError::UnsupportedVersion(header.version));
            }
        }
        let data: GuestData = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "stored guest data is corrupt; treating as absent");
                return Ok(None);
            }
        };
        data.upgrade().map(Some).map_err(StoreError::UnsupportedVersion)
    }

    /// Revision of the stored blob, read from its header so that documents
    /// whose body no longer parses still count.
    fn stored_revision(&self) -> Result<u64, StoreError> {
        let header = self
            .area
            .get_item(&self.options.data_key)
            .and_then(|raw| parse_header(&raw));
        match header {
            Some(h) if h.version > SCHEMA_VERSION => Err(StoreError::UnsupportedVersion(h.version)),
            Some(h) => Ok(h.revision),
            None => Ok(0),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The fields every schema version shares.
#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    revision: u64,
}

fn parse_header(raw: &str) -> Option<Header> {
    serde_json::from_str(raw).ok()
}

fn storage_err(e: anyhow::Error) -> StoreError {
    StoreError::Storage(format!("{:#}", e))
}

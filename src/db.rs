use std::sync::Arc;

use anyhow::Result;
use guestbox_core::GuestStore;

use crate::config::Config;
use crate::file_area::FileArea;

/// Open the guest store described by `[storage]`.
pub fn open(config: &Config) -> Result<GuestStore> {
    let area = FileArea::open(&config.storage.path)?;
    Ok(GuestStore::new(
        Arc::new(area),
        config.storage.store_options(),
    ))
}

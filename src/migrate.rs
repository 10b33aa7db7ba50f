//! `guestbox migrate`: move guest records into the signed-in account.
//!
//! Wires the configured [`RestAccountStore`] into the core pipeline,
//! prints the final tally, and optionally clears guest data when every
//! record made it across.

use anyhow::{bail, Result};
use guestbox_core::migration::{migrate, AccountStore, MigrationReport};
use guestbox_core::GuestStore;

use crate::config::Config;
use crate::progress::ProgressMode;
use crate::remote::RestAccountStore;

/// Run a migration against the account configured in `[account]`.
pub async fn run_migrate(
    config: &Config,
    store: &GuestStore,
    mode: ProgressMode,
    clear_after: bool,
) -> Result<MigrationReport> {
    let account_config = match &config.account {
        Some(account) => account,
        None => bail!("No [account] section configured; cannot migrate"),
    };
    let account = RestAccountStore::from_config(account_config)?;
    migrate_with(store, &account, mode, clear_after).await
}

/// Migrate the current guest snapshot to `account`.
///
/// Guest data is cleared afterwards only when `clear_after` is set and no
/// item failed; a partial migration always keeps the local copy.
pub async fn migrate_with(
    store: &GuestStore,
    account: &dyn AccountStore,
    mode: ProgressMode,
    clear_after: bool,
) -> Result<MigrationReport> {
    let data = match store.read() {
        Some(data) => data,
        None => {
            println!("No guest data to migrate.");
            return Ok(MigrationReport::default());
        }
    };

    let reporter = mode.reporter();
    let report = migrate(&data, account, reporter.as_ref()).await?;

    if report.total == 0 {
        println!("Nothing to migrate.");
        return Ok(report);
    }

    println!(
        "Migrated {} of {} records ({} failed).",
        report.success, report.total, report.failed
    );

    if clear_after {
        if report.is_complete() {
            store.clear()?;
            store.disable_guest_mode()?;
            println!("Guest data cleared.");
        } else {
            println!("Guest data kept because some records failed.");
        }
    }

    Ok(report)
}

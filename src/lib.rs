//! # Guestbox
//!
//! Guest-mode local data store and account migration for a web-scraping
//! workspace.
//!
//! Guests can define scraping tasks, record results, keep notes and selector
//! templates, and remember recently visited URLs without an account. All of
//! it lives in one quota-limited JSON document in local key/value storage.
//! When the guest signs up, the migration pipeline copies their records into
//! the account's remote store, item by item, tolerating partial failure.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌───────────┐
//! │   CLI    │──▶│ Collections  │──▶│ GuestStore │──▶│ FileArea  │
//! │(guestbox)│   │ tasks/notes… │   │ quota+rev  │   │ JSON file │
//! └────┬─────┘   └──────────────┘   └─────┬──────┘   └───────────┘
//!      │                                  │ snapshot
//!      │                                  ▼
//!      │                           ┌────────────┐   ┌──────────────────┐
//!      └──────────────────────────▶│ migrate()  │──▶│ RestAccountStore │
//!                                  └────────────┘   └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! guestbox init                                  # enter guest mode
//! guestbox task add --url https://x.com --name prices
//! guestbox export --output backup.json
//! guestbox migrate --clear-after                 # after signing in
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Opening the configured guest store |
//! | [`file_area`] | File-backed storage area |
//! | [`records`] | Collection commands |
//! | [`export`] | Export/import commands |
//! | [`stats`] | Status and storage statistics |
//! | [`migrate`] | Migration command |
//! | [`remote`] | HTTP account store |
//! | [`progress`] | Migration progress reporters |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod db;
pub mod export;
pub mod file_area;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod records;
pub mod remote;
pub mod stats;

//! Guest store status and storage statistics.
//!
//! Gives a quick summary of guest mode: whether it is active, how many
//! records each collection holds, and how much of the quota is used. Used by
//! `guestbox status`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use guestbox_core::GuestStore;

use crate::config::Config;

/// Print the status summary.
pub fn run_status(config: &Config, store: &GuestStore) -> Result<()> {
    let stats = store.stats();

    println!("Guestbox — Guest Storage");
    println!("========================");
    println!();
    println!("  Storage:     {}", config.storage.path.display());
    println!(
        "  Guest mode:  {}",
        if store.is_guest_mode() { "active" } else { "off" }
    );
    println!(
        "  Used:        {} / {} ({:.1}%)",
        format_bytes(stats.used_bytes),
        format_bytes(stats.total_bytes),
        stats.percent_used
    );
    println!("  Available:   {}", format_bytes(store.available_bytes()));

    match store.read() {
        Some(data) => {
            println!();
            println!("  Tasks:       {}", data.tasks.len());
            println!("  Results:     {}", data.results.len());
            println!("  Notes:       {}", data.notes.len());
            println!("  Templates:   {}", data.templates.len());
            println!("  Recent URLs: {}", data.recent_urls.len());
            println!(
                "  Updated:     {}",
                format_age(data.last_updated)
            );
        }
        None => {
            println!();
            println!("  No guest data.");
        }
    }

    println!();
    Ok(())
}

/// Byte count in the largest binary unit that keeps it at or above 1.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// How long ago `ts` was, in the coarsest whole unit ("3 hours ago").
/// Timestamps in the future or older than a month print as a date.
pub fn format_age(ts: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(ts);
    if age < Duration::zero() || age >= Duration::days(30) {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }
    if age < Duration::minutes(1) {
        return "just now".to_string();
    }
    let (count, unit) = if age < Duration::hours(1) {
        (age.num_minutes(), "min")
    } else if age < Duration::days(1) {
        (age.num_hours(), "hour")
    } else {
        (age.num_days(), "day")
    };
    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}

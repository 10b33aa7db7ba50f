//! Migration progress reporting.
//!
//! Reports observable progress during `guestbox migrate` so users see how many
//! records have been sent, which ones failed, and when the run is done.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

use guestbox_core::migration::{MigrationEvent, MigrationProgress, NoProgress};

/// Human-friendly progress on stderr: "migrate  [ 40%]  2 / 5  task guest-task-…  ok".
pub struct StderrProgress;

impl MigrationProgress for StderrProgress {
    fn report(&self, event: MigrationEvent) {
        let line = match &event {
            MigrationEvent::NothingToMigrate => "migrate  nothing to migrate\n".to_string(),
            MigrationEvent::Started { total } => {
                format!("migrate  sending {} records\n", format_number(*total))
            }
            MigrationEvent::Item {
                kind,
                id,
                error,
                report,
                percent,
            } => {
                let done = report.success + report.failed;
                let outcome = match error {
                    None => "ok".to_string(),
                    Some(e) => format!("FAILED: {}", e),
                };
                format!(
                    "migrate  [{:>3}%]  {} / {}  {} {}  {}\n",
                    percent,
                    format_number(done),
                    format_number(report.total),
                    kind.as_str(),
                    id,
                    outcome
                )
            }
            MigrationEvent::Finished(report) => format!(
                "migrate  done: {} migrated, {} failed, {} total\n",
                report.success, report.failed, report.total
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl MigrationProgress for JsonProgress {
    fn report(&self, event: MigrationEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// Digits grouped in thousands: `1234567` -> `1,234,567`.
fn format_number(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn MigrationProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}

//! Guest-to-account migration pipeline.
//!
//! Copies every task, result, note, and template from a guest snapshot into
//! an authenticated account through an [`AccountStore`]. Items are sent one
//! at a time, in a fixed order (tasks, results, notes, templates), and each
//! item's failure is counted without stopping the run. Preferences and
//! recent URLs are device-local and stay behind.
//!
//! ```text
//! GuestData ──▶ migrate() ──▶ AccountStore::create_*  (sequential)
//!                  │
//!                  └──▶ MigrationProgress::report      (after every item)
//! ```
//!
//! The guest store is never cleared here; that is a separate, explicit step.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::MigrationError;
use crate::models::{GuestData, Note, ScrapingResult, ScrapingTask, Template};

/// Remote, account-scoped record creation.
///
/// Each call is an independent request; there is no shared transaction.
/// Timeouts and retries are the implementation's business.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Resolve the id of the signed-in account that will own the records.
    async fn account_id(&self) -> Result<String>;

    /// Create a task and return its id in the remote store.
    async fn create_task(&self, account_id: &str, task: &ScrapingTask) -> Result<String>;

    /// Create a result. `task_id` is the remote id when the task was
    /// migrated in this run, otherwise the original guest id.
    async fn create_result(
        &self,
        account_id: &str,
        result: &ScrapingResult,
        task_id: &str,
    ) -> Result<()>;

    /// Create a note, with `task_id` resolved like [`create_result`](Self::create_result).
    async fn create_note(&self, account_id: &str, note: &Note, task_id: Option<&str>)
        -> Result<()>;

    async fn create_template(&self, account_id: &str, template: &Template) -> Result<()>;
}

/// Kind of record being migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Task,
    Result,
    Note,
    Template,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Task => "task",
            RecordKind::Result => "result",
            RecordKind::Note => "note",
            RecordKind::Template => "template",
        }
    }
}

/// Final tally of a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl MigrationReport {
    /// Every item made it across.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.success == self.total
    }

    /// `round(100 * (success + failed) / total)`; 100 for an empty run.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = (self.success + self.failed) as f64;
        (done * 100.0 / self.total as f64).round() as u8
    }
}

/// Progress notification emitted by [`migrate`].
///
/// Serializes as one flat JSON object tagged by `phase`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MigrationEvent {
    /// The snapshot holds no migratable records; no remote call was made.
    NothingToMigrate,
    Started {
        total: usize,
    },
    /// One item was attempted. `error` is set when it failed.
    Item {
        kind: RecordKind,
        id: String,
        error: Option<String>,
        report: MigrationReport,
        percent: u8,
    },
    Finished(MigrationReport),
}

/// Receives [`MigrationEvent`]s, e.g. to drive a progress bar.
pub trait MigrationProgress: Send + Sync {
    fn report(&self, event: MigrationEvent);
}

impl<F> MigrationProgress for F
where
    F: Fn(MigrationEvent) + Send + Sync,
{
    fn report(&self, event: MigrationEvent) {
        self(event)
    }
}

/// Discards all events.
pub struct NoProgress;

impl MigrationProgress for NoProgress {
    fn report(&self, _event: MigrationEvent) {}
}

struct Tally<'a> {
    report: MigrationReport,
    progress: &'a dyn MigrationProgress,
}

impl Tally<'_> {
    fn record(&mut self, kind: RecordKind, id: &str, outcome: Result<()>) {
        let error = match outcome {
            Ok(()) => {
                self.report.success += 1;
                None
            }
            Err(e) => {
                self.report.failed += 1;
                warn!(kind = kind.as_str(), id, error = %format!("{:#}", e), "migration item failed");
                Some(format!("{:#}", e))
            }
        };
        self.progress.report(MigrationEvent::Item {
            kind,
            id: id.to_string(),
            error,
            report: self.report,
            percent: self.report.percent(),
        });
    }
}

/// Migrate every task, result, note, and template in `data` to `account`.
///
/// Per-item failures are counted in the returned report. An error is
/// returned only when the run cannot start at all (the account cannot be
/// resolved), in which case nothing was sent.
pub async fn migrate(
    data: &GuestData,
    account: &dyn AccountStore,
    progress: &dyn MigrationProgress,
) -> Result<MigrationReport, MigrationError> {
    let total = data.migratable_count();
    if total == 0 {
        info!("no guest records to migrate");
        progress.report(MigrationEvent::NothingToMigrate);
        return Ok(MigrationReport::default());
    }

    let account_id = account
        .account_id()
        .await
        .map_err(|e| MigrationError::Account(format!("{:#}", e)))?;

    info!(total, account = %account_id, "starting guest data migration");
    progress.report(MigrationEvent::Started { total });

    let mut tally = Tally {
        report: MigrationReport {
            total,
            ..Default::default()
        },
        progress,
    };

    // guest task id -> remote task id
    let mut task_ids: HashMap<&str, String> = HashMap::new();

    for task in &data.tasks {
        let outcome = match account.create_task(&account_id, task).await {
            Ok(remote_id) => {
                task_ids.insert(task.id.as_str(), remote_id);
                Ok(())
            }
            Err(e) => Err(e),
        };
        tally.record(RecordKind::Task, &task.id, outcome);
    }

    for result in &data.results {
        let task_id = task_ids
            .get(result.task_id.as_str())
            .map(String::as_str)
            .unwrap_or(&result.task_id);
        let outcome = account.create_result(&account_id, result, task_id).await;
        tally.record(RecordKind::Result, &result.id, outcome);
    }

    for note in &data.notes {
        let task_id = note
            .task_id
            .as_deref()
            .map(|id| task_ids.get(id).map(String::as_str).unwrap_or(id));
        let outcome = account.create_note(&account_id, note, task_id).await;
        tally.record(RecordKind::Note, &note.id, outcome);
    }

    for template in &data.templates {
        let outcome = account.create_template(&account_id, template).await;
        tally.record(RecordKind::Template, &template.id, outcome);
    }

    let report = tally.report;
    info!(
        success = report.success,
        failed = report.failed,
        total = report.total,
        "guest data migration finished"
    );
    progress.report(MigrationEvent::Finished(report));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::bail;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::{ResultStatus, TaskStatus};

    /// Records every call; fails the calls whose 1-based sequence number is listed.
    #[derive(Default)]
    struct ScriptedAccount {
        fail_on: Vec<usize>,
        calls: AtomicUsize,
        log: Mutex<Vec<String>>,
        no_account: bool,
    }

    impl ScriptedAccount {
        fn failing(fail_on: &[usize]) -> Self {
            Self {
                fail_on: fail_on.to_vec(),
                ..Default::default()
            }
        }

        fn step(&self, entry: String) -> Result<()> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.lock().unwrap().push(entry);
            if self.fail_on.contains(&n) {
                bail!("remote rejected call {}", n);
            }
            Ok(())
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AccountStore for ScriptedAccount {
        async fn account_id(&self) -> Result<String> {
            if self.no_account {
                bail!("not signed in");
            }
            Ok("user-1".to_string())
        }

        async fn create_task(&self, _account_id: &str, task: &ScrapingTask) -> Result<String> {
            self.step(format!("task:{}", task.id))?;
            Ok(format!("remote-{}", task.id))
        }

        async fn create_result(
            &self,
            _account_id: &str,
            result: &ScrapingResult,
            task_id: &str,
        ) -> Result<()> {
            self.step(format!("result:{}:{}", result.id, task_id))
        }

        async fn create_note(
            &self,
            _account_id: &str,
            note: &Note,
            task_id: Option<&str>,
        ) -> Result<()> {
            self.step(format!("note:{}:{}", note.id, task_id.unwrap_or("-")))
        }

        async fn create_template(&self, _account_id: &str, template: &Template) -> Result<()> {
            self.step(format!("template:{}", template.id))
        }
    }

    fn task(id: &str) -> ScrapingTask {
        ScrapingTask {
            id: id.to_string(),
            url: format!("http://{id}.example"),
            name: id.to_string(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            schedule: None,
            selectors: None,
        }
    }

    fn with_tasks(n: usize) -> GuestData {
        let mut data = GuestData::empty();
        data.tasks = (1..=n).map(|i| task(&format!("t{i}"))).collect();
        data
    }

    #[tokio::test]
    async fn partial_failure_attempts_every_item() {
        let account = ScriptedAccount::failing(&[2, 4]);
        let report = migrate(&with_tasks(5), &account, &NoProgress).await.unwrap();

        assert_eq!(
            report,
            MigrationReport {
                success: 3,
                failed: 2,
                total: 5
            }
        );
        assert_eq!(account.log().len(), 5);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn empty_snapshot_makes_no_remote_call() {
        let account = ScriptedAccount {
            no_account: true,
            ..Default::default()
        };
        let mut data = GuestData::empty();
        data.recent_urls.push(crate::models::RecentUrl {
            url: "http://x.com".to_string(),
            title: None,
            visited_at: Utc::now(),
        });

        let events = Mutex::new(Vec::new());
        let progress = |e: MigrationEvent| events.lock().unwrap().push(e);
        let report = migrate(&data, &account, &progress).await.unwrap();

        assert_eq!(report.total, 0);
        assert!(account.log().is_empty());
        let events = events.into_inner().unwrap();
        assert!(matches!(events.as_slice(), [MigrationEvent::NothingToMigrate]));
    }

    #[tokio::test]
    async fn order_is_tasks_results_notes_templates() {
        let mut data = with_tasks(1);
        data.templates.push(Template {
            id: "tpl".to_string(),
            name: "tpl".to_string(),
            selectors: vec![],
            created_at: Utc::now(),
        });
        data.notes.push(Note {
            id: "n1".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            task_id: Some("t1".to_string()),
        });
        data.results.push(ScrapingResult {
            id: "r1".to_string(),
            task_id: "t1".to_string(),
            data: json!({}),
            created_at: Utc::now(),
            status: ResultStatus::Success,
            error: None,
        });
        data.results.push(ScrapingResult {
            id: "r2".to_string(),
            task_id: "elsewhere".to_string(),
            data: json!(null),
            created_at: Utc::now(),
            status: ResultStatus::Failed,
            error: Some("boom".to_string()),
        });

        let account = ScriptedAccount::default();
        let report = migrate(&data, &account, &NoProgress).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(
            account.log(),
            vec![
                "task:t1",
                "result:r1:remote-t1",
                "result:r2:elsewhere",
                "note:n1:remote-t1",
                "template:tpl",
            ]
        );
    }

    #[tokio::test]
    async fn failed_task_keeps_guest_id_for_children() {
        let mut data = with_tasks(1);
        data.notes.push(Note {
            id: "n1".to_string(),
            content: "c".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            task_id: Some("t1".to_string()),
        });
        let account = ScriptedAccount::failing(&[1]);
        let report = migrate(&data, &account, &NoProgress).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(account.log()[1], "note:n1:t1");
    }

    #[tokio::test]
    async fn progress_published_after_each_item() {
        let events = Mutex::new(Vec::new());
        let progress = |e: MigrationEvent| events.lock().unwrap().push(e);
        let account = ScriptedAccount::failing(&[2]);
        migrate(&with_tasks(3), &account, &progress).await.unwrap();

        let events = events.into_inner().unwrap();
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                MigrationEvent::Item { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![33, 67, 100]);
        assert!(matches!(events.first(), Some(MigrationEvent::Started { total: 3 })));
        assert!(matches!(
            events.last(),
            Some(MigrationEvent::Finished(MigrationReport {
                success: 2,
                failed: 1,
                total: 3
            }))
        ));
        let failed: Vec<&Option<String>> = events
            .iter()
            .filter_map(|e| match e {
                MigrationEvent::Item { error, .. } => Some(error),
                _ => None,
            })
            .collect();
        assert!(failed[1].as_deref().unwrap().contains("call 2"));
    }

    #[tokio::test]
    async fn unresolved_account_is_a_run_level_error() {
        let account = ScriptedAccount {
            no_account: true,
            ..Default::default()
        };
        let err = migrate(&with_tasks(2), &account, &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Account(_)));
        assert!(account.log().is_empty());
    }

    #[test]
    fn percent_rounds_half_up() {
        let report = MigrationReport {
            success: 1,
            failed: 0,
            total: 8,
        };
        // 12.5 -> 13
        assert_eq!(report.percent(), 13);
        assert_eq!(MigrationReport::default().percent(), 100);
    }

    #[test]
    fn events_serialize_flat_with_phase_tag() {
        let event = MigrationEvent::Item {
            kind: RecordKind::Note,
            id: "guest-note-1".to_string(),
            error: Some("boom".to_string()),
            report: MigrationReport {
                success: 1,
                failed: 1,
                total: 4,
            },
            percent: 50,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "item");
        assert_eq!(value["kind"], "note");
        assert_eq!(value["error"], "boom");
        assert_eq!(value["report"]["failed"], 1);
        assert_eq!(value["percent"], 50);

        let done = serde_json::to_value(MigrationEvent::Finished(MigrationReport {
            success: 4,
            failed: 0,
            total: 4,
        }))
        .unwrap();
        assert_eq!(done, json!({ "phase": "finished", "success": 4, "failed": 0, "total": 4 }));
        assert_eq!(
            serde_json::to_value(MigrationEvent::NothingToMigrate).unwrap(),
            json!({ "phase": "nothing_to_migrate" })
        );
    }
}

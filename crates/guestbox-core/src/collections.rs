//! Typed collection accessors on [`GuestStore`].
//!
//! Each add stamps creation time, generates an id of the form
//! `guest-<kind>-<millis>-<suffix>`, appends to its collection, and rewrites
//! the document through the quota-checked store. A rejected write comes back
//! as the [`StoreError`] so callers can tell the user storage is full.
//!
//! Tasks, results, and templates are append-only; notes are the only kind
//! edited in place. Recent URLs are deduplicated by URL and capped at
//! [`MAX_RECENT_URLS`], most recent first. Preferences are shallow-merged.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{
    NewNote, NewResult, NewTask, NewTemplate, Note, NotePatch, PreferencesPatch, RecentUrl,
    ScrapingResult, ScrapingTask, Section, Template, UserPreferences, MAX_RECENT_URLS,
};
use crate::store::GuestStore;

const SUFFIX_LEN: usize = 9;

/// Build an id not already used in the target collection.
fn generate_id(kind: &str, now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        let id = format!("guest-{}-{}-{}", kind, now.timestamp_millis(), suffix);
        if !taken(&id) {
            return id;
        }
    }
}

impl GuestStore {
    // ─── Tasks ──────────────────────────────────────────────────────

    pub fn add_task(&self, task: NewTask) -> Result<String, StoreError> {
        let now = Utc::now();
        self.transact(|data| {
            let id = generate_id("task", now, |id| data.tasks.iter().any(|t| t.id == id));
            data.tasks.push(ScrapingTask {
                id: id.clone(),
                url: task.url,
                name: task.name,
                status: task.status,
                created_at: now,
                schedule: task.schedule,
                selectors: task.selectors,
            });
            (id, true)
        })
    }

    pub fn tasks(&self) -> Vec<ScrapingTask> {
        self.read().map(|d| d.tasks).unwrap_or_default()
    }

    /// Replace the task collection wholesale (used for status changes).
    pub fn replace_tasks(&self, tasks: Vec<ScrapingTask>) -> Result<(), StoreError> {
        self.update_section(Section::Tasks(tasks))
    }

    // ─── Results ────────────────────────────────────────────────────

    pub fn add_result(&self, result: NewResult) -> Result<String, StoreError> {
        let now = Utc::now();
        self.transact(|data| {
            let id = generate_id("result", now, |id| data.results.iter().any(|r| r.id == id));
            data.results.push(ScrapingResult {
                id: id.clone(),
                task_id: result.task_id,
                data: result.data,
                created_at: now,
                status: result.status,
                error: result.error,
            });
            (id, true)
        })
    }

    /// Results, optionally only those recorded for `task_id`.
    pub fn results(&self, task_id: Option<&str>) -> Vec<ScrapingResult> {
        let results = self.read().map(|d| d.results).unwrap_or_default();
        match task_id {
            Some(task_id) => results.into_iter().filter(|r| r.task_id == task_id).collect(),
            None => results,
        }
    }

    // ─── Notes ──────────────────────────────────────────────────────

    pub fn add_note(&self, note: NewNote) -> Result<String, StoreError> {
        let now = Utc::now();
        self.transact(|data| {
            let id = generate_id("note", now, |id| data.notes.iter().any(|n| n.id == id));
            data.notes.push(Note {
                id: id.clone(),
                content: note.content,
                created_at: now,
                updated_at: now,
                task_id: note.task_id,
            });
            (id, true)
        })
    }

    /// Notes, optionally only those attached to `task_id`.
    pub fn notes(&self, task_id: Option<&str>) -> Vec<Note> {
        let notes = self.read().map(|d| d.notes).unwrap_or_default();
        match task_id {
            Some(task_id) => notes
                .into_iter()
                .filter(|n| n.task_id.as_deref() == Some(task_id))
                .collect(),
            None => notes,
        }
    }

    /// Apply `patch` to the note with `id` and bump its `updated_at`.
    ///
    /// Returns `Ok(false)` without writing when no note has that id.
    pub fn update_note(&self, id: &str, patch: NotePatch) -> Result<bool, StoreError> {
        let now = Utc::now();
        self.transact(|data| match data.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                if let Some(content) = patch.content {
                    note.content = content;
                }
                if let Some(task_id) = patch.task_id {
                    note.task_id = task_id;
                }
                note.updated_at = now;
                (true, true)
            }
            None => (false, false),
        })
    }

    // ─── Templates ──────────────────────────────────────────────────

    pub fn add_template(&self, template: NewTemplate) -> Result<String, StoreError> {
        let now = Utc::now();
        self.transact(|data| {
            let id = generate_id("template", now, |id| {
                data.templates.iter().any(|t| t.id == id)
            });
            data.templates.push(Template {
                id: id.clone(),
                name: template.name,
                selectors: template.selectors,
                created_at: now,
            });
            (id, true)
        })
    }

    pub fn templates(&self) -> Vec<Template> {
        self.read().map(|d| d.templates).unwrap_or_default()
    }

    // ─── Recent URLs ────────────────────────────────────────────────

    /// Record a visit: move `url` to the front and keep at most
    /// [`MAX_RECENT_URLS`] entries.
    pub fn add_recent_url(&self, url: &str, title: Option<String>) -> Result<(), StoreError> {
        let now = Utc::now();
        self.transact(|data| {
            data.recent_urls.retain(|r| r.url != url);
            data.recent_urls.insert(
                0,
                RecentUrl {
                    url: url.to_string(),
                    title,
                    visited_at: now,
                },
            );
            data.recent_urls.truncate(MAX_RECENT_URLS);
            ((), true)
        })
    }

    pub fn recent_urls(&self) -> Vec<RecentUrl> {
        self.read().map(|d| d.recent_urls).unwrap_or_default()
    }

    // ─── Preferences ────────────────────────────────────────────────

    pub fn preferences(&self) -> UserPreferences {
        self.read().map(|d| d.preferences).unwrap_or_default()
    }

    /// Merge `patch` into the stored preferences and return the result.
    pub fn update_preferences(
        &self,
        patch: PreferencesPatch,
    ) -> Result<UserPreferences, StoreError> {
        self.transact(|data| {
            data.preferences.merge(patch);
            (data.preferences.clone(), true)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::models::{ResultStatus, TaskStatus, Theme};
    use crate::store::memory::InMemoryArea;
    use crate::store::StoreOptions;

    fn store() -> GuestStore {
        GuestStore::new(Arc::new(InMemoryArea::new()), StoreOptions::default())
    }

    fn new_task(url: &str, name: &str) -> NewTask {
        NewTask {
            url: url.to_string(),
            name: name.to_string(),
            status: TaskStatus::Pending,
            ..Default::default()
        }
    }

    #[test]
    fn add_task_scenario() {
        let store = store();
        let id = store.add_task(new_task("http://x.com", "t1")).unwrap();
        assert!(!id.is_empty());
        assert!(id.starts_with("guest-task-"));

        let tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].url, "http://x.com");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }

    #[test]
    fn generated_ids_are_unique() {
        let store = store();
        let mut ids: Vec<String> = (0..50)
            .map(|i| store.add_task(new_task("http://x.com", &format!("t{i}"))).unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn id_suffix_shape() {
        let now = Utc::now();
        let id = generate_id("note", now, |_| false);
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
        assert!(id.starts_with(&format!("guest-note-{}-", now.timestamp_millis())));
    }

    #[test]
    fn replace_tasks_changes_status() {
        let store = store();
        store.add_task(new_task("http://a.com", "a")).unwrap();
        let mut tasks = store.tasks();
        tasks[0].status = TaskStatus::Completed;
        store.replace_tasks(tasks).unwrap();
        assert_eq!(store.tasks()[0].status, TaskStatus::Completed);
    }

    #[test]
    fn results_filter_by_task() {
        let store = store();
        for (task, n) in [("t1", 1), ("t2", 2), ("t1", 3)] {
            store
                .add_result(NewResult {
                    task_id: task.to_string(),
                    data: json!({ "n": n }),
                    status: ResultStatus::Success,
                    error: None,
                })
                .unwrap();
        }
        assert_eq!(store.results(None).len(), 3);
        let t1 = store.results(Some("t1"));
        assert_eq!(t1.len(), 2);
        assert_eq!(t1[1].data, json!({ "n": 3 }));
        assert!(store.results(Some("missing")).is_empty());
    }

    #[test]
    fn notes_filter_and_update() {
        let store = store();
        let attached = store
            .add_note(NewNote {
                content: "first".to_string(),
                task_id: Some("t1".to_string()),
            })
            .unwrap();
        store
            .add_note(NewNote {
                content: "loose".to_string(),
                task_id: None,
            })
            .unwrap();

        assert_eq!(store.notes(Some("t1")).len(), 1);
        let before = store.notes(Some("t1")).remove(0);

        let updated = store
            .update_note(
                &attached,
                NotePatch {
                    content: Some("edited".to_string()),
                    task_id: None,
                },
            )
            .unwrap();
        assert!(updated);

        let after = store.notes(Some("t1")).remove(0);
        assert_eq!(after.content, "edited");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[test]
    fn update_missing_note_does_not_write() {
        let store = store();
        store.add_note(NewNote::default()).unwrap();
        let revision = store.read().unwrap().revision;

        assert!(!store.update_note("nope", NotePatch::default()).unwrap());
        assert_eq!(store.read().unwrap().revision, revision);
    }

    #[test]
    fn note_can_be_detached() {
        let store = store();
        let id = store
            .add_note(NewNote {
                content: "x".to_string(),
                task_id: Some("t1".to_string()),
            })
            .unwrap();
        store
            .update_note(
                &id,
                NotePatch {
                    content: None,
                    task_id: Some(None),
                },
            )
            .unwrap();
        assert!(store.notes(Some("t1")).is_empty());
        assert_eq!(store.notes(None).len(), 1);
    }

    #[test]
    fn templates_keep_selectors_verbatim() {
        let store = store();
        let selectors = vec![json!({ "name": "title", "css": "h1", "extra": [1, 2] })];
        store
            .add_template(NewTemplate {
                name: "headings".to_string(),
                selectors: selectors.clone(),
            })
            .unwrap();
        let templates = store.templates();
        assert_eq!(templates[0].selectors, selectors);
        assert!(templates[0].id.starts_with("guest-template-"));
    }

    #[test]
    fn recent_urls_capped_most_recent_first() {
        let store = store();
        for i in 0..25 {
            store
                .add_recent_url(&format!("http://site{i}.com"), None)
                .unwrap();
        }
        let urls: Vec<String> = store.recent_urls().into_iter().map(|r| r.url).collect();
        assert_eq!(urls.len(), MAX_RECENT_URLS);
        assert_eq!(urls[0], "http://site24.com");
        assert_eq!(urls[19], "http://site5.com");
        let mut deduped = urls.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), urls.len());
    }

    #[test]
    fn revisit_moves_url_to_front() {
        let store = store();
        store.add_recent_url("A", None).unwrap();
        store.add_recent_url("B", None).unwrap();
        store.add_recent_url("A", Some("again".to_string())).unwrap();

        let recent = store.recent_urls();
        let urls: Vec<&str> = recent.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["A", "B"]);
        assert_eq!(recent[0].title.as_deref(), Some("again"));
    }

    #[test]
    fn preferences_merge_on_update() {
        let store = store();
        assert_eq!(store.preferences(), UserPreferences::default());

        store
            .update_preferences(PreferencesPatch {
                notifications_enabled: Some(false),
                ..Default::default()
            })
            .unwrap();
        let prefs = store
            .update_preferences(PreferencesPatch {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(prefs.theme, Theme::Dark);
        assert!(!prefs.notifications_enabled);
        assert_eq!(store.preferences(), prefs);
    }

    #[test]
    fn add_over_quota_returns_error_and_keeps_data() {
        let store = GuestStore::new(
            Arc::new(InMemoryArea::new()),
            StoreOptions {
                quota_bytes: 1024,
                ..Default::default()
            },
        );
        store.add_task(new_task("http://a.com", "a")).unwrap();

        let err = store
            .add_note(NewNote {
                content: "x".repeat(2000),
                task_id: None,
            })
            .unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.notes(None).is_empty());
        assert_eq!(store.tasks().len(), 1);
    }
}

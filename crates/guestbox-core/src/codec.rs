//! Export/import of the whole guest store as a JSON document.
//!
//! The export is the stored [`GuestData`] pretty-printed, including its
//! `version` tag, so a later build can upgrade it on import. Importing goes
//! through the same quota-checked write as every other mutation: a document
//! that parses but does not fit is rejected as a whole.

use tracing::{info, warn};

use crate::error::ImportError;
use crate::models::GuestData;
use crate::store::GuestStore;

/// Export text produced when no guest data exists.
pub const EMPTY_EXPORT: &str = "{}";

impl GuestStore {
    /// Pretty-printed JSON of the whole store, or `{}` when absent.
    pub fn export(&self) -> String {
        match self.read() {
            Some(data) => serde_json::to_string_pretty(&data).unwrap_or_else(|e| {
                warn!(error = %e, "failed to serialize guest data for export");
                EMPTY_EXPORT.to_string()
            }),
            None => EMPTY_EXPORT.to_string(),
        }
    }

    /// Replace the whole store with the document in `text`.
    ///
    /// On any error the existing data is left exactly as it was.
    pub fn import(&self, text: &str) -> Result<(), ImportError> {
        let data = parse_document(text)?;
        self.write(&data)?;
        info!(
            tasks = data.tasks.len(),
            results = data.results.len(),
            notes = data.notes.len(),
            templates = data.templates.len(),
            "guest data imported"
        );
        Ok(())
    }
}

/// Parse and upgrade an exported document without touching storage.
pub fn parse_document(text: &str) -> Result<GuestData, ImportError> {
    let data: GuestData =
        serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))?;
    data.upgrade().map_err(ImportError::UnsupportedVersion)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::StoreError;
    use crate::models::{
        NewNote, NewResult, NewTask, NewTemplate, PreferencesPatch, ResultStatus, Theme,
        SCHEMA_VERSION,
    };
    use crate::store::memory::InMemoryArea;
    use crate::store::{StorageArea, StoreOptions};

    fn store() -> GuestStore {
        GuestStore::new(Arc::new(InMemoryArea::new()), StoreOptions::default())
    }

    fn populated() -> GuestStore {
        let store = store();
        let task = store
            .add_task(NewTask {
                url: "http://x.com".to_string(),
                name: "t1".to_string(),
                schedule: Some("0 * * * *".to_string()),
                selectors: Some(vec![json!({ "css": ".price" })]),
                ..Default::default()
            })
            .unwrap();
        store
            .add_result(NewResult {
                task_id: task.clone(),
                data: json!({ "rows": [{ "price": "9.99" }], "nested": { "ok": true } }),
                status: ResultStatus::Partial,
                error: Some("timeout on page 2".to_string()),
            })
            .unwrap();
        store
            .add_note(NewNote {
                content: "check prices".to_string(),
                task_id: Some(task),
            })
            .unwrap();
        store
            .add_template(NewTemplate {
                name: "shop".to_string(),
                selectors: vec![json!("h1"), json!({ "attr": "href" })],
            })
            .unwrap();
        store.add_recent_url("http://x.com", Some("X".to_string())).unwrap();
        store
            .update_preferences(PreferencesPatch {
                theme: Some(Theme::Dark),
                ..Default::default()
            })
            .unwrap();
        store
    }

    #[test]
    fn export_of_absent_store_is_empty_object() {
        assert_eq!(store().export(), EMPTY_EXPORT);
    }

    #[test]
    fn round_trip_reproduces_store() {
        let source = populated();
        let exported = source.export();
        let original = source.read().unwrap();

        let target = store();
        target.import(&exported).unwrap();
        let restored = target.read().unwrap();
        assert!(restored.same_content(&original));
        assert_eq!(restored.version, SCHEMA_VERSION);
    }

    #[test]
    fn import_over_existing_replaces_everything() {
        let target = populated();
        target.import(EMPTY_EXPORT).unwrap();
        let data = target.read().unwrap();
        assert!(data.same_content(&GuestData::empty()));
    }

    #[test]
    fn invalid_json_leaves_storage_untouched() {
        let target = populated();
        let before = target.export();

        let err = target.import("{ definitely not json").unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
        let err = target.import(r#"{"tasks": "nope"}"#).unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));

        assert_eq!(target.export(), before);
    }

    #[test]
    fn oversized_import_rejected_whole() {
        let target = GuestStore::new(
            Arc::new(InMemoryArea::new()),
            StoreOptions {
                quota_bytes: 4096,
                ..Default::default()
            },
        );
        target
            .add_note(NewNote {
                content: "keep me".to_string(),
                task_id: None,
            })
            .unwrap();

        let mut big = GuestData::empty();
        for i in 0..100 {
            big.recent_urls.push(crate::models::RecentUrl {
                url: format!("http://example.com/{i}"),
                title: Some("a fairly long page title".to_string()),
                visited_at: chrono::Utc::now(),
            });
        }
        let text = serde_json::to_string_pretty(&big).unwrap();

        let err = target.import(&text).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Store(StoreError::QuotaExceeded { .. })
        ));
        assert_eq!(target.notes(None)[0].content, "keep me");
        assert!(target.recent_urls().is_empty());
    }

    #[test]
    fn import_does_not_replace_newer_stored_document() {
        let area = Arc::new(InMemoryArea::new());
        let newer = r#"{"version":9,"revision":3}"#;
        area.set_item("guest_data", newer).unwrap();
        let target = GuestStore::new(area.clone(), StoreOptions::default());

        let err = target.import(EMPTY_EXPORT).unwrap_err();
        assert_eq!(err, ImportError::Store(StoreError::UnsupportedVersion(9)));
        assert_eq!(area.get_item("guest_data").as_deref(), Some(newer));
    }

    #[test]
    fn unversioned_documents_are_upgraded() {
        let text = r#"{
            "tasks": [{
                "id": "guest-task-1-abc",
                "url": "http://old.example",
                "name": "legacy",
                "status": "completed",
                "created_at": "2024-01-02T03:04:05Z"
            }],
            "last_updated": "2024-01-02T03:04:05Z"
        }"#;
        let target = store();
        target.import(text).unwrap();
        let data = target.read().unwrap();
        assert_eq!(data.version, SCHEMA_VERSION);
        assert_eq!(data.tasks[0].name, "legacy");
        assert!(data.tasks[0].selectors.is_none());
    }

    #[test]
    fn newer_versions_are_refused() {
        let target = populated();
        let before = target.export();
        let text = format!(r#"{{"version": {}}}"#, SCHEMA_VERSION + 1);
        assert_eq!(
            target.import(&text),
            Err(ImportError::UnsupportedVersion(SCHEMA_VERSION + 1))
        );
        assert_eq!(target.export(), before);
    }
}

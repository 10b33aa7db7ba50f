//! Guest-mode data models.
//!
//! Everything a guest user creates lives in one [`GuestData`] document that is
//! serialized as a single JSON blob. Field names serialize in `snake_case`
//! and timestamps as RFC 3339 UTC strings.
//!
//! Selector definitions and scraped result payloads are **opaque**: they are
//! held as [`serde_json::Value`] and round-tripped verbatim, never inspected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written into every stored and exported document.
///
/// Version 0 is the unversioned layout (no `version` field); it has the same
/// shape as version 1 and is upgraded by stamping the version.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum number of entries kept in [`GuestData::recent_urls`].
pub const MAX_RECENT_URLS: usize = 20;

/// Lifecycle state of a scraping task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// Outcome of a single scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    #[default]
    Success,
    Partial,
    Failed,
}

/// A scraping job defined by a guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingTask {
    pub id: String,
    pub url: String,
    pub name: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Opaque selector definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<Value>>,
}

/// Data captured by running a task. `task_id` is a convention, not a
/// foreign key: results may outlive or predate their task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingResult {
    pub id: String,
    pub task_id: String,
    /// Opaque scraped payload.
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Free-form note, optionally attached to a task. The only mutable kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Reusable set of selectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// Opaque selector definitions.
    #[serde(default)]
    pub selectors: Vec<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Device-local UI preferences. Never migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub theme: Theme,
    pub layout: Layout,
    pub notifications_enabled: bool,
    pub default_export_format: ExportFormat,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            layout: Layout::Grid,
            notifications_enabled: true,
            default_export_format: ExportFormat::Json,
        }
    }
}

/// Partial preferences update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub layout: Option<Layout>,
    pub notifications_enabled: Option<bool>,
    pub default_export_format: Option<ExportFormat>,
}

impl UserPreferences {
    /// Shallow-merge `patch` into these preferences.
    pub fn merge(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(enabled) = patch.notifications_enabled {
            self.notifications_enabled = enabled;
        }
        if let Some(format) = patch.default_export_format {
            self.default_export_format = format;
        }
    }
}

/// The root guest document.
///
/// Every field has a serde default, so partial documents (including `{}`)
/// deserialize into a valid value with empty collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestData {
    #[serde(default)]
    pub version: u32,
    /// Incremented by every successful write.
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub tasks: Vec<ScrapingTask>,
    #[serde(default)]
    pub results: Vec<ScrapingResult>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub recent_urls: Vec<RecentUrl>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl GuestData {
    /// The default skeleton written on first guest-mode activation.
    pub fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION,
            revision: 0,
            tasks: Vec::new(),
            results: Vec::new(),
            notes: Vec::new(),
            templates: Vec::new(),
            recent_urls: Vec::new(),
            preferences: UserPreferences::default(),
            last_updated: Utc::now(),
        }
    }

    /// Bring a document written by an older schema up to [`SCHEMA_VERSION`].
    ///
    /// Returns the unsupported version number if the document is newer.
    pub fn upgrade(mut self) -> Result<Self, u32> {
        if self.version > SCHEMA_VERSION {
            return Err(self.version);
        }
        // 0 -> 1: identical layout, only the version tag was added.
        self.version = SCHEMA_VERSION;
        Ok(self)
    }

    /// Number of records the migration pipeline would send.
    pub fn migratable_count(&self) -> usize {
        self.tasks.len() + self.results.len() + self.notes.len() + self.templates.len()
    }

    /// Same entities and field values, ignoring `last_updated` and `revision`.
    pub fn same_content(&self, other: &GuestData) -> bool {
        self.tasks == other.tasks
            && self.results == other.results
            && self.notes == other.notes
            && self.templates == other.templates
            && self.recent_urls == other.recent_urls
            && self.preferences == other.preferences
    }
}

/// One named top-level section of [`GuestData`] together with its new value.
#[derive(Debug, Clone)]
pub enum Section {
    Tasks(Vec<ScrapingTask>),
    Results(Vec<ScrapingResult>),
    Notes(Vec<Note>),
    Templates(Vec<Template>),
    RecentUrls(Vec<RecentUrl>),
    Preferences(UserPreferences),
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::Tasks(_) => "tasks",
            Section::Results(_) => "results",
            Section::Notes(_) => "notes",
            Section::Templates(_) => "templates",
            Section::RecentUrls(_) => "recent_urls",
            Section::Preferences(_) => "preferences",
        }
    }

    /// Overwrite the matching section of `data` in place.
    pub fn apply(self, data: &mut GuestData) {
        match self {
            Section::Tasks(v) => data.tasks = v,
            Section::Results(v) => data.results = v,
            Section::Notes(v) => data.notes = v,
            Section::Templates(v) => data.templates = v,
            Section::RecentUrls(v) => data.recent_urls = v,
            Section::Preferences(v) => data.preferences = v,
        }
    }
}

// ─── Creation inputs ────────────────────────────────────────────────

/// Fields supplied by the caller when adding a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub url: String,
    pub name: String,
    pub status: TaskStatus,
    pub schedule: Option<String>,
    pub selectors: Option<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct NewResult {
    pub task_id: String,
    pub data: Value,
    pub status: ResultStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub content: String,
    pub task_id: Option<String>,
}

/// Replacement values for a note's mutable fields.
///
/// `task_id: Some(None)` detaches the note from its task.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub content: Option<String>,
    pub task_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub selectors: Vec<Value>,
}

//! CLI handlers for the guest collections.
//!
//! Thin wrappers over the typed collection API in `guestbox_core`: they
//! build the creation inputs from command-line arguments, call the store,
//! and print either a table or JSON. A rejected write (e.g. storage full)
//! is returned as an error so the binary exits non-zero.

use anyhow::{Context, Result};
use guestbox_core::models::{
    NewNote, NewResult, NewTask, NewTemplate, NotePatch, PreferencesPatch, ResultStatus,
    TaskStatus,
};
use guestbox_core::GuestStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Parse a lowercase enum name (`pending`, `dark`, ...) through its serde form.
pub fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(Value::String(s.to_lowercase()))
        .map_err(|_| format!("invalid value '{}'", s))
}

/// Selector arguments are JSON when they parse as JSON, plain strings otherwise.
fn selector_values(raw: &[String]) -> Vec<Value> {
    raw.iter()
        .map(|s| serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())))
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn short_ts(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

// ─── Tasks ──────────────────────────────────────────────────────────

pub fn run_task_add(
    store: &GuestStore,
    url: String,
    name: String,
    status: TaskStatus,
    schedule: Option<String>,
    selectors: &[String],
) -> Result<()> {
    let id = store
        .add_task(NewTask {
            url,
            name,
            status,
            schedule,
            selectors: if selectors.is_empty() {
                None
            } else {
                Some(selector_values(selectors))
            },
        })
        .context("Failed to add task")?;
    println!("{}", id);
    Ok(())
}

pub fn run_task_list(store: &GuestStore, json: bool) -> Result<()> {
    let tasks = store.tasks();
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    println!("{:<40} {:<10} {:<16} {}", "ID", "STATUS", "CREATED", "NAME / URL");
    println!("{}", "-".repeat(96));
    for t in &tasks {
        println!(
            "{:<40} {:<10} {:<16} {} ({})",
            t.id,
            serde_json::to_value(t.status)?.as_str().unwrap_or("?"),
            short_ts(&t.created_at),
            t.name,
            t.url
        );
    }
    Ok(())
}

/// Change a task's status by rewriting the task collection.
pub fn run_task_set_status(store: &GuestStore, id: &str, status: TaskStatus) -> Result<()> {
    let mut tasks = store.tasks();
    let task = tasks
        .iter_mut()
        .find(|t| t.id == id)
        .ok_or_else(|| anyhow::anyhow!("No task with id {}", id))?;
    task.status = status;
    store
        .replace_tasks(tasks)
        .context("Failed to update task status")?;
    println!("Updated {}.", id);
    Ok(())
}

// ─── Results ────────────────────────────────────────────────────────

pub fn run_result_add(
    store: &GuestStore,
    task_id: String,
    data: &str,
    status: ResultStatus,
    error: Option<String>,
) -> Result<()> {
    let data: Value =
        serde_json::from_str(data).with_context(|| "Result data must be valid JSON")?;
    let id = store
        .add_result(NewResult {
            task_id,
            data,
            status,
            error,
        })
        .context("Failed to add result")?;
    println!("{}", id);
    Ok(())
}

pub fn run_result_list(store: &GuestStore, task_id: Option<&str>, json: bool) -> Result<()> {
    let results = store.results(task_id);
    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    println!("{:<42} {:<40} {:<8} {}", "ID", "TASK", "STATUS", "CREATED");
    println!("{}", "-".repeat(110));
    for r in &results {
        println!(
            "{:<42} {:<40} {:<8} {}{}",
            r.id,
            r.task_id,
            serde_json::to_value(r.status)?.as_str().unwrap_or("?"),
            short_ts(&r.created_at),
            r.error
                .as_ref()
                .map(|e| format!("  error: {}", e))
                .unwrap_or_default()
        );
    }
    Ok(())
}

// ─── Notes ──────────────────────────────────────────────────────────

pub fn run_note_add(store: &GuestStore, content: String, task_id: Option<String>) -> Result<()> {
    let id = store
        .add_note(NewNote { content, task_id })
        .context("Failed to add note")?;
    println!("{}", id);
    Ok(())
}

pub fn run_note_list(store: &GuestStore, task_id: Option<&str>, json: bool) -> Result<()> {
    let notes = store.notes(task_id);
    if json {
        return print_json(&notes);
    }
    if notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }
    for n in &notes {
        println!(
            "{}  (updated {}{})",
            n.id,
            short_ts(&n.updated_at),
            n.task_id
                .as_ref()
                .map(|t| format!(", task {}", t))
                .unwrap_or_default()
        );
        println!("  {}", n.content.replace('\n', "\n  "));
    }
    Ok(())
}

pub fn run_note_edit(
    store: &GuestStore,
    id: &str,
    content: Option<String>,
    task_id: Option<String>,
    detach: bool,
) -> Result<()> {
    let patch = NotePatch {
        content,
        task_id: if detach { Some(None) } else { task_id.map(Some) },
    };
    if store.update_note(id, patch).context("Failed to update note")? {
        println!("Updated {}.", id);
        Ok(())
    } else {
        anyhow::bail!("No note with id {}", id)
    }
}

// ─── Templates ──────────────────────────────────────────────────────

pub fn run_template_add(store: &GuestStore, name: String, selectors: &[String]) -> Result<()> {
    let id = store
        .add_template(NewTemplate {
            name,
            selectors: selector_values(selectors),
        })
        .context("Failed to add template")?;
    println!("{}", id);
    Ok(())
}

pub fn run_template_list(store: &GuestStore, json: bool) -> Result<()> {
    let templates = store.templates();
    if json {
        return print_json(&templates);
    }
    if templates.is_empty() {
        println!("No templates.");
        return Ok(());
    }
    for t in &templates {
        println!("{}  {}  ({} selectors)", t.id, t.name, t.selectors.len());
    }
    Ok(())
}

// ─── Recent URLs ────────────────────────────────────────────────────

pub fn run_visit(store: &GuestStore, url: &str, title: Option<String>) -> Result<()> {
    store
        .add_recent_url(url, title)
        .context("Failed to record visit")?;
    Ok(())
}

pub fn run_recent(store: &GuestStore, json: bool) -> Result<()> {
    let recent = store.recent_urls();
    if json {
        return print_json(&recent);
    }
    if recent.is_empty() {
        println!("No recent URLs.");
        return Ok(());
    }
    for r in &recent {
        match &r.title {
            Some(title) => println!("{}  {}  {}", short_ts(&r.visited_at), r.url, title),
            None => println!("{}  {}", short_ts(&r.visited_at), r.url),
        }
    }
    Ok(())
}

// ─── Preferences ────────────────────────────────────────────────────

pub fn run_prefs_show(store: &GuestStore) -> Result<()> {
    print_json(&store.preferences())
}

pub fn run_prefs_set(store: &GuestStore, patch: PreferencesPatch) -> Result<()> {
    let prefs = store
        .update_preferences(patch)
        .context("Failed to update preferences")?;
    print_json(&prefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestbox_core::models::Theme;

    #[test]
    fn parse_enum_accepts_any_case() {
        assert_eq!(parse_enum::<TaskStatus>("Completed"), Ok(TaskStatus::Completed));
        assert_eq!(parse_enum::<Theme>("dark"), Ok(Theme::Dark));
        assert!(parse_enum::<ResultStatus>("meh").is_err());
    }

    #[test]
    fn selectors_accept_json_or_text() {
        let values = selector_values(&["h1.title".to_string(), r#"{"css": "a"}"#.to_string()]);
        assert_eq!(values[0], Value::String("h1.title".to_string()));
        assert_eq!(values[1]["css"], "a");
    }
}

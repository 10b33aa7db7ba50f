//! HTTP [`AccountStore`] for a PostgREST-compatible backend.
//!
//! Each guest record becomes one `POST {url}/rest/v1/{table}` request with the
//! owning `user_id` added and the guest id dropped (the backend assigns its
//! own). The signed-in account is resolved with `GET {url}/auth/v1/user`.
//!
//! | Kind | Table |
//! |------|-------|
//! | task | `scraping_tasks` |
//! | result | `scraping_results` |
//! | note | `notes` |
//! | template | `templates` |
//!
//! Retry strategy (per request):
//! - HTTP 429 or 5xx → retry with exponential backoff
//! - HTTP 4xx (not 429) → fail immediately
//! - Network error → retry

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use guestbox_core::migration::AccountStore;
use guestbox_core::models::{Note, ScrapingResult, ScrapingTask, Template};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::AccountConfig;

pub struct RestAccountStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: String,
    max_retries: u32,
    backoff: Duration,
}

impl RestAccountStore {
    /// Build a client from `[account]`, reading the API key and access
    /// token from the environment variables it names.
    ///
    /// # Errors
    ///
    /// Returns an error if either environment variable is not set.
    pub fn from_config(config: &AccountConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;
        let access_token = std::env::var(&config.token_env).map_err(|_| {
            anyhow::anyhow!(
                "{} environment variable not set (sign in first)",
                config.token_env
            )
        })?;
        Self::new(config, api_key, access_token)
    }

    pub fn new(config: &AccountConfig, api_key: String, access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            max_retries: config.max_retries,
            backoff: Duration::from_secs(1),
        })
    }

    /// Base delay before the first retry; doubles on every attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn send(&self, build: impl Fn() -> reqwest::RequestBuilder) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1x, 2x, 4x, 8x, ...
                let delay = self.backoff * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = build()
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.access_token))
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await?;
                        if text.trim().is_empty() {
                            return Ok(Value::Null);
                        }
                        return serde_json::from_str(&text)
                            .with_context(|| format!("Invalid JSON response: {}", text));
                    }

                    // Rate limited or server error, retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!("account API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429), no retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("account API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("account request failed after retries")))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        debug!(table, "inserting migrated record");
        let resp = self
            .send(|| {
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(&row)
            })
            .await
            .with_context(|| format!("insert into {} failed", table))?;
        Ok(resp)
    }
}

/// Pull the `id` out of a PostgREST insert response (`[{...}]` or `{...}`).
fn inserted_id(resp: &Value) -> Option<String> {
    let row = match resp {
        Value::Array(rows) => rows.first()?,
        other => other,
    };
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl AccountStore for RestAccountStore {
    async fn account_id(&self) -> Result<String> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let user = self.send(|| self.client.get(&url)).await?;
        user.get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid user response: missing id"))
    }

    async fn create_task(&self, account_id: &str, task: &ScrapingTask) -> Result<String> {
        let row = json!({
            "user_id": account_id,
            "url": task.url,
            "name": task.name,
            "status": task.status,
            "schedule": task.schedule,
            "selectors": task.selectors,
            "created_at": task.created_at,
        });
        let resp = self.insert("scraping_tasks", row).await?;
        inserted_id(&resp).ok_or_else(|| anyhow::anyhow!("insert response carried no task id"))
    }

    async fn create_result(
        &self,
        account_id: &str,
        result: &ScrapingResult,
        task_id: &str,
    ) -> Result<()> {
        let row = json!({
            "user_id": account_id,
            "task_id": task_id,
            "data": result.data,
            "status": result.status,
            "error": result.error,
            "created_at": result.created_at,
        });
        self.insert("scraping_results", row).await?;
        Ok(())
    }

    async fn create_note(
        &self,
        account_id: &str,
        note: &Note,
        task_id: Option<&str>,
    ) -> Result<()> {
        let row = json!({
            "user_id": account_id,
            "task_id": task_id,
            "content": note.content,
            "created_at": note.created_at,
            "updated_at": note.updated_at,
        });
        self.insert("notes", row).await?;
        Ok(())
    }

    async fn create_template(&self, account_id: &str, template: &Template) -> Result<()> {
        let row = json!({
            "user_id": account_id,
            "name": template.name,
            "selectors": template.selectors,
            "created_at": template.created_at,
        });
        self.insert("templates", row).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_id_from_array_or_object() {
        assert_eq!(
            inserted_id(&json!([{ "id": "abc", "name": "x" }])).as_deref(),
            Some("abc")
        );
        assert_eq!(inserted_id(&json!({ "id": 42 })).as_deref(), Some("42"));
        assert_eq!(inserted_id(&json!([])), None);
        assert_eq!(inserted_id(&Value::Null), None);
    }

    #[test]
    fn trailing_slash_trimmed() {
        let config = AccountConfig {
            url: "https://example.test/".to_string(),
            api_key_env: "UNUSED".to_string(),
            token_env: "UNUSED".to_string(),
            timeout_secs: 5,
            max_retries: 0,
        };
        let store = RestAccountStore::new(&config, "k".into(), "t".into()).unwrap();
        assert_eq!(store.base_url, "https://example.test");
    }
}

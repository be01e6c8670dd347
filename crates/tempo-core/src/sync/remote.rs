//! Remote store boundary
//!
//! Push and pull talk to the remote through [`RemoteStore`] only. The HTTP
//! implementation targets a PostgREST-style row API; tests use
//! [`MemoryRemoteStore`] with scripted failures.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::EntityKind;

/// Remote row operations the sync engines need
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert or overwrite one row keyed by its `id`.
    ///
    /// Deletes travel as upserts of tombstoned rows. The idempotency key
    /// lets the remote drop duplicate deliveries of a retried event.
    async fn upsert(&self, kind: EntityKind, row: &Value, idempotency_key: &str) -> Result<()>;

    /// Rows of `kind` owned by `owner_id` changed strictly after `cursor`,
    /// ordered by `updated_at` ascending.
    ///
    /// `min_start_time` bounds time-slot pulls; other kinds ignore it.
    async fn select_changed(
        &self,
        kind: EntityKind,
        owner_id: &str,
        cursor: Option<&str>,
        min_start_time: Option<&str>,
    ) -> Result<Vec<Value>>;
}

/// PostgREST-style HTTP remote store
pub struct HttpRemoteStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Build a store for the given endpoint and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::InvalidInput("remote base URL must not be empty".to_string()));
        }
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client: reqwest::Client::builder().build().map_err(|e| Error::Remote(e.to_string()))?,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upsert(&self, kind: EntityKind, row: &Value, idempotency_key: &str) -> Result<()> {
        let url = format!(
            "{}/{}?on_conflict=id,user_id",
            self.base_url,
            kind.remote_table()
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .header("Idempotency-Key", idempotency_key)
            .json(row)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("upsert to {} failed: {e}", kind.remote_table())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!(
                "upsert to {} rejected ({status}): {body}",
                kind.remote_table()
            )));
        }
        Ok(())
    }

    async fn select_changed(
        &self,
        kind: EntityKind,
        owner_id: &str,
        cursor: Option<&str>,
        min_start_time: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut url = format!(
            "{}/{}?user_id=eq.{}&order=updated_at.asc",
            self.base_url,
            kind.remote_table(),
            urlencoding::encode(owner_id),
        );
        if let Some(cursor) = cursor {
            url.push_str(&format!("&updated_at=gt.{}", urlencoding::encode(cursor)));
        }
        if let Some(min_start_time) = min_start_time {
            url.push_str(&format!(
                "&start_time=gte.{}",
                urlencoding::encode(min_start_time)
            ));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("select from {} failed: {e}", kind.remote_table())))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Remote(format!(
                "select from {} rejected ({status})",
                kind.remote_table()
            )));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| Error::Remote(format!("invalid select response: {e}")))
    }
}

/// In-memory remote for tests, with scripted failure injection
#[derive(Default)]
pub struct MemoryRemoteStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    // kind -> entity id -> row
    rows: HashMap<EntityKind, HashMap<String, Value>>,
    upsert_keys: Vec<String>,
    failing_upserts: usize,
    failing_selects: usize,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row as if another device had pushed it
    pub fn seed(&self, kind: EntityKind, row: Value) {
        let id = row["id"].as_str().expect("seed row needs an id").to_string();
        let mut inner = self.inner.lock().unwrap();
        inner.rows.entry(kind).or_default().insert(id, row);
    }

    /// Make the next `n` upserts fail
    pub fn fail_next_upserts(&self, n: usize) {
        self.inner.lock().unwrap().failing_upserts = n;
    }

    /// Make the next `n` selects fail
    pub fn fail_next_selects(&self, n: usize) {
        self.inner.lock().unwrap().failing_selects = n;
    }

    /// Idempotency keys of every accepted upsert, in order
    #[must_use]
    pub fn upsert_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().upsert_keys.clone()
    }

    /// Current row for an entity, if present
    #[must_use]
    pub fn row(&self, kind: EntityKind, id: &str) -> Option<Value> {
        self.inner.lock().unwrap().rows.get(&kind)?.get(id).cloned()
    }

    /// Number of stored rows of a kind
    #[must_use]
    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.inner
            .lock()
            .unwrap()
            .rows
            .get(&kind)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upsert(&self, kind: EntityKind, row: &Value, idempotency_key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_upserts > 0 {
            inner.failing_upserts -= 1;
            return Err(Error::Remote("injected upsert failure".to_string()));
        }
        let id = row["id"]
            .as_str()
            .ok_or_else(|| Error::Remote("upsert row missing id".to_string()))?
            .to_string();
        // Duplicate delivery of the same logical event is a no-op
        if !inner.upsert_keys.iter().any(|k| k == idempotency_key) {
            inner.upsert_keys.push(idempotency_key.to_string());
            inner.rows.entry(kind).or_default().insert(id, row.clone());
        }
        Ok(())
    }

    async fn select_changed(
        &self,
        kind: EntityKind,
        owner_id: &str,
        cursor: Option<&str>,
        min_start_time: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_selects > 0 {
            inner.failing_selects -= 1;
            return Err(Error::Remote("injected select failure".to_string()));
        }

        // Fixed-format RFC 3339 UTC strings compare correctly as text
        let mut rows: Vec<Value> = inner
            .rows
            .get(&kind)
            .map(|rows| {
                rows.values()
                    .filter(|row| row["user_id"].as_str() == Some(owner_id))
                    .filter(|row| {
                        cursor.is_none_or(|c| row["updated_at"].as_str().is_some_and(|u| u > c))
                    })
                    .filter(|row| {
                        min_start_time.is_none_or(|min| {
                            row.get("start_time")
                                .and_then(Value::as_str)
                                .is_none_or(|s| s >= min)
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            a["updated_at"]
                .as_str()
                .unwrap_or_default()
                .cmp(b["updated_at"].as_str().unwrap_or_default())
        });
        Ok(rows)
    }
}

use crate::config::SinkConfig;
use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Bulk-insert target for normalized rows.
///
/// One call per batch, no update or merge semantics: re-running a harvest
/// produces duplicate rows unless the target enforces uniqueness.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<()>;
}

/// PostgREST bulk insert against a Supabase project.
pub struct PostgrestSink {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
}

impl PostgrestSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key,
        }
    }
}

#[async_trait]
impl Sink for PostgrestSink {
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<()> {
        let endpoint = format!("{}/rest/v1/{}", self.base_url, table);
        let response = self
            .client
            .post(&endpoint)
            .header("apikey", self.service_role_key.clone())
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HarvestError::Sink {
                message: format!("{status} - {body}"),
            });
        }
        debug!(table, rows = rows.len(), "batch inserted");
        Ok(())
    }
}

/// In-memory sink for tests and local inspection, with optional failure
/// injection for exercising batch isolation.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    fail_next: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the next `n` insert calls with a sink error.
    pub fn fail_next_batches(&self, n: usize) {
        *self.fail_next.lock().unwrap() = n;
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<()> {
        {
            let mut fail_next = self.fail_next.lock().unwrap();
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(HarvestError::Sink {
                    message: "injected batch failure".to_string(),
                });
            }
        }
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(rows);
        debug!(table, rows = rows.len(), "batch stored in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_sink_stores_rows_per_table() {
        let sink = MemorySink::new();
        sink.insert_rows("geo_hochwasser", &[json!({"gemeinde": "Köln"})])
            .await
            .unwrap();
        sink.insert_rows("geo_boris", &[json!({"gemeinde": "Essen"})])
            .await
            .unwrap();
        assert_eq!(sink.rows("geo_hochwasser").len(), 1);
        assert_eq!(sink.rows("geo_boris").len(), 1);
        assert!(sink.rows("geo_mietspiegel").is_empty());
    }

    #[tokio::test]
    async fn failure_injection_rejects_then_recovers() {
        let sink = MemorySink::new();
        sink.fail_next_batches(1);
        assert!(sink.insert_rows("t", &[json!({})]).await.is_err());
        assert!(sink.insert_rows("t", &[json!({})]).await.is_ok());
        assert_eq!(sink.rows("t").len(), 1);
    }
}

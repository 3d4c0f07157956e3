//! Supabase backend: PostgREST over HTTPS.
//!
//! Every request targets `<url>/rest/v1/<table>` and carries the service-role
//! key twice: as the `apikey` header and as a bearer token. Writes send a
//! `Prefer: return=...` header. One fixed timeout per request, no retries.

use async_trait::async_trait;
use scopepilot_config::StoreConfig;
use scopepilot_core::error::StoreError;
use scopepilot_core::store::{RestBackend, Returning, Row, RowQuery};
use std::time::Duration;
use tracing::{debug, warn};

pub struct SupabaseBackend {
    base_url: String,
    service_key: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl SupabaseBackend {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            timeout_secs,
            client,
        })
    }

    /// Build from config; `NotConfigured` when the URL or key is missing.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match (config.base_url(), config.service_key.as_deref().map(str::trim)) {
            (Some(url), Some(key)) if !key.is_empty() => Self::new(url, key, config.timeout_secs),
            _ => Err(StoreError::NotConfigured),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn send(
        &self,
        table: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout {
                    table: table.to_string(),
                    timeout_secs: self.timeout_secs,
                }
            } else {
                StoreError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(table, status = status.as_u16(), body = %body, "Store returned error");
            return Err(StoreError::Http {
                table: table.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn rows(&self, table: &str, response: reqwest::Response) -> Result<Vec<Row>, StoreError> {
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode {
            table: table.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RestBackend for SupabaseBackend {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>, StoreError> {
        debug!(table, params = ?query.to_params(), "GET");
        let builder = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&query.to_params());
        let response = self.send(table, builder).await?;
        self.rows(table, response).await
    }

    async fn insert(
        &self,
        table: &str,
        rows: Vec<Row>,
        returning: Returning,
    ) -> Result<Vec<Row>, StoreError> {
        debug!(table, count = rows.len(), "POST");
        let builder = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Content-Type", "application/json")
            .header("Prefer", returning.header_value())
            .json(&rows);
        let response = self.send(table, builder).await?;
        match returning {
            Returning::Representation => self.rows(table, response).await,
            Returning::Minimal => Ok(Vec::new()),
        }
    }

    async fn update(
        &self,
        table: &str,
        query: &RowQuery,
        patch: Row,
        returning: Returning,
    ) -> Result<Vec<Row>, StoreError> {
        debug!(table, params = ?query.to_params(), "PATCH");
        let builder = self
            .authorized(self.client.patch(self.table_url(table)))
            .query(&query.to_params())
            .header("Content-Type", "application/json")
            .header("Prefer", returning.header_value())
            .json(&patch);
        let response = self.send(table, builder).await?;
        match returning {
            Returning::Representation => self.rows(table, response).await,
            Returning::Minimal => Ok(Vec::new()),
        }
    }

    async fn delete(&self, table: &str, query: &RowQuery) -> Result<(), StoreError> {
        debug!(table, params = ?query.to_params(), "DELETE");
        let builder = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&query.to_params())
            .header("Prefer", Returning::Minimal.header_value());
        self.send(table, builder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_not_configured() {
        let config = StoreConfig::default();
        assert!(matches!(
            SupabaseBackend::from_config(&config),
            Err(StoreError::NotConfigured)
        ));

        let mut config = StoreConfig::default();
        config.url = Some("https://abc.supabase.co".into());
        config.service_key = Some("   ".into());
        assert!(matches!(
            SupabaseBackend::from_config(&config),
            Err(StoreError::NotConfigured)
        ));
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let backend = SupabaseBackend::new("https://abc.supabase.co/", "key", 10).unwrap();
        assert_eq!(
            backend.table_url("contract_versions"),
            "https://abc.supabase.co/rest/v1/contract_versions"
        );
        assert_eq!(backend.name(), "supabase");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_or_timeout() {
        let backend = SupabaseBackend::new("http://127.0.0.1:9", "key", 1).unwrap();
        let err = backend
            .select("estimates", &RowQuery::new().eq("id", "e1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Network(_) | StoreError::Timeout { .. }
        ));
    }
}

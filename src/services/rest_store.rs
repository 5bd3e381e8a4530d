use crate::config::StoreSettings;
use crate::error::StoreError;
use crate::models::{School, Tier};
use crate::services::store::SchoolStore;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// Catalog store reached over a PostgREST-style HTTP API.
///
/// Rows are read from a single table (or view) exposing the catalog columns
/// plus `division_group`.
pub struct RestSchoolStore {
    base_url: String,
    api_key: String,
    table: String,
    client: Client,
}

impl RestSchoolStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
            client,
        })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            settings.table.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        )
    }

    fn table_url(&self, query: &str) -> String {
        format!("{}/rest/v1/{}?{}", self.base_url, self.table, query)
    }

    async fn get_rows(&self, url: &str) -> Result<Vec<School>, StoreError> {
        tracing::debug!("Fetching schools from: {}", url);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body)
            .map_err(|e| StoreError::Decode(format!("failed to parse school rows: {}", e)))
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Quote a value for a PostgREST `in.(...)` list
fn quote_in_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl SchoolStore for RestSchoolStore {
    async fn fetch_tier(&self, tier: Tier) -> Result<Vec<School>, StoreError> {
        let query = format!(
            "select=*&division_group=eq.{}&order=school_name.asc",
            urlencoding::encode(tier.as_str())
        );
        let schools = self.get_rows(&self.table_url(&query)).await?;
        tracing::debug!(tier = %tier, count = schools.len(), "Fetched tier");
        Ok(schools)
    }

    async fn fetch_by_names(&self, names: &[String]) -> Result<Vec<School>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let list = names.iter().map(|n| quote_in_value(n)).collect::<Vec<_>>().join(",");
        let query = format!("select=*&school_name=in.({})", urlencoding::encode(&list));
        self.get_rows(&self.table_url(&query)).await
    }

    async fn health(&self) -> Result<(), StoreError> {
        let url = self.table_url("select=school_name&limit=1");
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    fn kind(&self) -> &'static str {
        "rest"
    }
}

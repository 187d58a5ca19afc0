//! Hosted players table over a PostgREST-style API.
//!
//! Rows are addressed with `id=eq.<id>` filters and writes ask for the
//! stored representation back (`Prefer: return=representation`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use super::{PlayerStore, StorageError};
use crate::models::{PlayerId, PlayerRow};

/// Connection settings for the hosted table.
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://abc.supabase.co`
    pub base_url: Url,

    /// Anonymous or service key, sent as `apikey` and bearer token
    pub api_key: String,

    pub table: String,

    pub timeout: Duration,
}

impl RestStoreConfig {
    pub fn new(base_url: Url, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            table: "players".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct RestPlayerStore {
    client: Client,
    table_url: Url,
}

impl RestPlayerStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StorageError> {
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| StorageError::InvalidUrl("API key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StorageError::InvalidUrl("API key is not a valid header value".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            table_url: table_url(&config.base_url, &config.table)?,
        })
    }

    fn row_url(&self, id: &PlayerId) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", id))
            .append_pair("select", "*");
        url
    }
}

/// `{base}/rest/v1/{table}`, keeping any path prefix on the base URL.
pub fn table_url(base: &Url, table: &str) -> Result<Url, StorageError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("rest/v1/{}", table))
        .map_err(|e| StorageError::InvalidUrl(e.to_string()))
}

async fn read_rows(response: Response) -> Result<Vec<PlayerRow>, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StorageError::HttpStatus {
            status: status.as_u16(),
            message,
        });
    }
    let values: Vec<serde_json::Value> = response.json().await?;
    Ok(parse_rows(values))
}

/// Convert rows one at a time, skipping any whose shape does not match.
pub fn parse_rows(values: Vec<serde_json::Value>) -> Vec<PlayerRow> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Skipping unreadable row {} from player table: {}", idx, e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl PlayerStore for RestPlayerStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn list(&self) -> Result<Vec<PlayerRow>, StorageError> {
        let mut url = self.table_url.clone();
        url.query_pairs_mut().append_pair("select", "*");
        debug!("GET {}", url);
        read_rows(self.client.get(url).send().await?).await
    }

    async fn get(&self, id: &PlayerId) -> Result<Option<PlayerRow>, StorageError> {
        let rows = read_rows(self.client.get(self.row_url(id)).send().await?).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, row: PlayerRow) -> Result<PlayerRow, StorageError> {
        let id = row.id.clone();
        let response = self
            .client
            .post(self.table_url.clone())
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(StorageError::Conflict(id));
        }
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StorageError::NotFound(id))
    }

    async fn update(&self, row: PlayerRow) -> Result<PlayerRow, StorageError> {
        let id = row.id.clone();
        let response = self
            .client
            .patch(self.row_url(&id))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StorageError::NotFound(id))
    }

    async fn delete(&self, id: &PlayerId) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(self.row_url(id))
            .header("Prefer", "return=representation")
            .send()
            .await?;
        if read_rows(response).await?.is_empty() {
            return Err(StorageError::NotFound(id.clone()));
        }
        Ok(())
    }
}

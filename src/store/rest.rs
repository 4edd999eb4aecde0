//! Hosted data API client.
//!
//! Thin wrapper over the organization's PostgREST-style endpoint: one table
//! per entity kind, JSON in and out, key-based auth. No query planning or
//! retry logic lives here; failures surface as [`StoreError`] and the
//! caller decides what to tell the user.
//!
//! Configuration comes from the environment (a `.env` file is honored):
//!
//! - `STORE_URL` - base URL, e.g. `https://org.example.co/rest/v1`
//! - `STORE_API_KEY` - service key sent as `apikey` + bearer token

use serde::Deserialize;
use serde_json::Value;
use std::env;
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreResult};
use crate::schema::EntityKind;

use super::{ChangeAction, ChangeEvent, DataStore, CHANGE_CHANNEL_CAPACITY};

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    changes: broadcast::Sender<ChangeEvent>,
}

/// Error body shape of PostgREST-style backends.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
}

impl RestStore {
    /// Create a client with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            changes,
        }
    }

    /// Create a client from `STORE_URL` / `STORE_API_KEY`.
    pub fn from_env() -> StoreResult<Self> {
        let _ = dotenvy::dotenv();

        let base_url = env::var("STORE_URL")
            .map_err(|_| StoreError::MissingConfig("STORE_URL not set".into()))?;
        let api_key = env::var("STORE_API_KEY")
            .map_err(|_| StoreError::MissingConfig("STORE_API_KEY not set".into()))?;

        Ok(Self::new(base_url, api_key))
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.base_url, kind.table())
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn notify(&self, kind: EntityKind, action: ChangeAction, rows: usize) {
        let _ = self.changes.send(ChangeEvent { kind, action, rows });
    }

    /// Map a non-success response to a `StoreError` carrying the backend's
    /// own message (code and details folded in so callers can classify).
    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        if let Ok(err) = serde_json::from_str::<ApiError>(&body) {
            let mut message = err.message;
            if !err.code.is_empty() {
                message = format!("{} (code {})", message, err.code);
            }
            if let Some(details) = err.details {
                message = format!("{message}: {details}");
            }
            return Err(StoreError::Rejected(message));
        }
        Err(StoreError::Rejected(format!("HTTP {status}: {body}")))
    }
}

impl DataStore for RestStore {
    async fn fetch_existing(&self, kind: EntityKind) -> StoreResult<Vec<Value>> {
        let response = self
            .request(reqwest::Method::GET, format!("{}?select=*", self.table_url(kind)))
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        Self::check(response)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn bulk_insert(&self, kind: EntityKind, records: Vec<Value>) -> StoreResult<usize> {
        let count = records.len();
        let response = self
            .request(reqwest::Method::POST, self.table_url(kind))
            .header("Prefer", "return=minimal")
            .json(&records)
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        Self::check(response).await?;
        self.notify(kind, ChangeAction::Inserted, count);
        Ok(count)
    }

    async fn insert_row(&self, kind: EntityKind, record: Value) -> StoreResult<Value> {
        let response = self
            .request(reqwest::Method::POST, self.table_url(kind))
            .header("Prefer", "return=representation")
            .json(&vec![record])
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        let mut rows: Vec<Value> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        let stored = rows
            .pop()
            .ok_or_else(|| StoreError::InvalidResponse("empty insert response".into()))?;
        self.notify(kind, ChangeAction::Inserted, 1);
        Ok(stored)
    }

    async fn update_row(&self, kind: EntityKind, id: &str, patch: Value) -> StoreResult<()> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                format!("{}?id=eq.{}", self.table_url(kind), id),
            )
            .json(&patch)
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        Self::check(response).await?;
        self.notify(kind, ChangeAction::Updated, 1);
        Ok(())
    }

    async fn delete_row(&self, kind: EntityKind, id: &str) -> StoreResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                format!("{}?id=eq.{}", self.table_url(kind), id),
            )
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?;

        Self::check(response).await?;
        self.notify(kind, ChangeAction::Deleted, 1);
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let store = RestStore::new("https://org.example.co/rest/v1/", "key");
        assert_eq!(
            store.table_url(EntityKind::Students),
            "https://org.example.co/rest/v1/students"
        );
    }

    #[test]
    fn test_api_error_body_parses() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":"Key (student_id)=(S-1) already exists."}"#;
        let err: ApiError = serde_json::from_str(body).unwrap();
        assert_eq!(err.code, "23505");
        assert!(err.details.unwrap().contains("S-1"));
    }
}

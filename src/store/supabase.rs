//! Supabase PostgREST client for reports and bans (service_role key)

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::SupabaseConfig;

/// Table holding detection reports
pub const REPORTS_TABLE: &str = "cheat_reports";
/// Table holding account bans
pub const ACCOUNT_BANS_TABLE: &str = "account_bans";
/// Table holding hardware bans, unique on `hwid`
pub const HARDWARE_BANS_TABLE: &str = "hardware_bans";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Uses the service_role key, which bypasses RLS. Never hand it to clients.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        }
    }

    fn table_url(&self, table: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}/rest/v1/{}?{}", self.base_url, table, q),
            _ => format!("{}/rest/v1/{}", self.base_url, table),
        }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    async fn send(request: RequestBuilder) -> Result<Response, SupabaseError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SupabaseError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Select rows matching a PostgREST query string
    pub async fn get<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        let request = self.authed(self.client.get(self.table_url(table, Some(query))));
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(SupabaseError::Parse)
    }

    /// Insert one row without reading it back
    pub async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), SupabaseError> {
        let request = self
            .authed(self.client.post(self.table_url(table, None)))
            .header("Prefer", "return=minimal")
            .json(row);
        Self::send(request).await.map(drop)
    }

    /// Insert, or merge into the row sharing `on_conflict`
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        on_conflict: &str,
    ) -> Result<(), SupabaseError> {
        let query = format!("on_conflict={}", on_conflict);
        let request = self
            .authed(self.client.post(self.table_url(table, Some(&query))))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);
        Self::send(request).await.map(drop)
    }
}

/// Supabase errors
#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),
}

//! Google Sheets v4 backend for `LeadStore`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, info};

use super::auth::{ServiceAccountAuth, ServiceAccountKey, SheetsScope};
use super::traits::{LeadStore, ensure_resolved};
use crate::error::StoreError;
use crate::pipeline::types::{HandoffStatus, LeadRecord, RowIndex};

/// Default Sheets API base.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Default tab name.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Column holding sender ids.
const SENDER_COLUMN: &str = "B";
/// Column holding the handoff status.
const STATUS_COLUMN: &str = "H";
/// Full row span of the layout.
const ROW_SPAN: &str = "A:H";

/// Location of the leads sheet.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub api_base: String,
    pub credentials: ServiceAccountKey,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Leads sheet accessed through the Sheets REST API.
pub struct SheetsStore {
    client: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
    spreadsheet_id: String,
    sheet_name: String,
    api_base: Url,
}

impl SheetsStore {
    /// Create a store authenticating with the given scope.
    pub fn new(config: &SheetsConfig, scope: SheetsScope) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StoreError::RequestFailed {
                operation: "client".to_string(),
                reason: e.to_string(),
            })?;

        let api_base = Url::parse(config.api_base.trim_end_matches('/')).map_err(|e| {
            StoreError::RequestFailed {
                operation: "client".to_string(),
                reason: format!("invalid API base {}: {e}", config.api_base),
            }
        })?;

        let auth = Arc::new(ServiceAccountAuth::new(
            config.credentials.clone(),
            scope,
            client.clone(),
        ));

        Ok(Self {
            client,
            auth,
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            api_base,
        })
    }

    /// `{base}/spreadsheets/{id}/values/{range}{suffix}` with the range escaped.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, StoreError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::RequestFailed {
                operation: "client".to_string(),
                reason: "API base cannot carry a path".to_string(),
            })?
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    /// A1 range on the configured tab, e.g. `'Leads 2024'!B:B`.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{}", self.sheet_name.replace('\'', "''"), cells)
    }

    /// Send an authorized request and return the successful response.
    async fn send(
        &self,
        operation: &str,
        method: Method,
        url: Url,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, StoreError> {
        let token = self.auth.access_token().await?;

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret())
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| StoreError::RequestFailed {
            operation: operation.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_range(
        &self,
        operation: &str,
        range: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(range, "")?;
        let response = self.send(operation, Method::GET, url, query, None).await?;
        let parsed: ValueRange = response.json().await.map_err(|e| StoreError::RequestFailed {
            operation: operation.to_string(),
            reason: format!("invalid response body: {e}"),
        })?;

        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl LeadStore for SheetsStore {
    async fn append(&self, record: &LeadRecord) -> Result<(), StoreError> {
        let url = self.values_url(&self.range("A1"), ":append")?;
        let body = serde_json::json!({ "values": [record.to_row()] });

        self.send(
            "append",
            Method::POST,
            url,
            &[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ],
            Some(body),
        )
        .await?;

        info!(sender = %record.sender_id, "Lead row appended to sheet");
        Ok(())
    }

    async fn find_by_sender_id(&self, sender_id: &str) -> Result<Option<RowIndex>, StoreError> {
        let column = self
            .read_range(
                "find_by_sender_id",
                &self.range(&format!("{SENDER_COLUMN}:{SENDER_COLUMN}")),
                &[("majorDimension", "COLUMNS")],
            )
            .await?;

        let found = column
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, id)| id.as_str() == sender_id)
            .map(|(offset, _)| RowIndex::from_column_offset(offset));

        debug!(sender = %sender_id, row = ?found, "Sender id lookup");
        Ok(found)
    }

    async fn update_status(&self, row: RowIndex, status: HandoffStatus) -> Result<(), StoreError> {
        ensure_resolved(row, status)?;

        let cell = self.range(&format!("{STATUS_COLUMN}{row}"));
        let url = self.values_url(&cell, "")?;
        let body = serde_json::json!({ "values": [[status.as_str()]] });

        self.send(
            "update_status",
            Method::PUT,
            url,
            &[("valueInputOption", "RAW")],
            Some(body),
        )
        .await?;

        info!(row = row.get(), status = %status, "Lead status updated");
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        self.read_range("read_all", &self.range(ROW_SPAN), &[]).await
    }
}

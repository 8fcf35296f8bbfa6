//! Typed gateway client and editor session state.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    ConnectionDescriptor, ConnectionTestResponse, ExecuteQueryRequest, GenerateSqlRequest,
    GenerateSqlResponse, HealthResponse, QueryResult, SchemaEntry, SchemaResponse,
};

pub mod history;
pub mod session;

pub use history::{QueryHistory, QueryHistoryEntry};
pub use session::{ConnectionForm, ConnectionStatus, EditorSession, SessionError};

pub const DEFAULT_API_BASE: &str = "http://localhost:3001";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The gateway could not be reached or its reply could not be read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response from gateway: {0}")]
    Decode(#[from] serde_json::Error),

    /// The gateway answered with `success: false`.
    #[error("{message}")]
    Gateway { status: StatusCode, message: String },
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Decode(_))
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GatewayClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn test_connection(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<ConnectionTestResponse, ClientError> {
        self.post("/api/test-connection", descriptor).await
    }

    pub async fn execute_query(
        &self,
        descriptor: &ConnectionDescriptor,
        query: &str,
    ) -> Result<QueryResult, ClientError> {
        let request = ExecuteQueryRequest {
            connection: descriptor.clone(),
            query: query.to_string(),
        };
        self.post("/api/execute-query", &request).await
    }

    pub async fn get_schemas(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Vec<SchemaEntry>, ClientError> {
        let response: SchemaResponse = self.post("/api/get-schemas", descriptor).await?;
        Ok(response.schemas)
    }

    pub async fn generate_sql(
        &self,
        description: &str,
        schemas: &[SchemaEntry],
        database_type: Option<&str>,
    ) -> Result<String, ClientError> {
        let request = GenerateSqlRequest {
            description: description.to_string(),
            schema: schemas.to_vec(),
            database_type: database_type.map(str::to_string),
        };
        let response: GenerateSqlResponse = self.post("/api/generate-sql", &request).await?;
        response.sql.ok_or_else(|| ClientError::Gateway {
            status: StatusCode::OK,
            message: response
                .error
                .unwrap_or_else(|| "AI generation failed".to_string()),
        })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/api/health")).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        decode_envelope(status, body)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        decode_envelope(status, body)
    }
}

/// Every gateway reply carries `success`; anything but a 2xx with
/// `success: true` is reported with the gateway's `error` text.
fn decode_envelope<R: DeserializeOwned>(status: StatusCode, body: Value) -> Result<R, ClientError> {
    let succeeded = body.get("success").and_then(Value::as_bool) == Some(true);
    if status.is_success() && succeeded {
        return Ok(serde_json::from_value(body)?);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    Err(ClientError::Gateway { status, message })
}

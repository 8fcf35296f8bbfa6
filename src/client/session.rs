use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{ClientError, GatewayClient, QueryHistory};
use crate::export::{self, ExportError};
use crate::format::format_sql;
use crate::models::{ConnectionDescriptor, DatabaseType, QueryResult, SchemaEntry};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please enter a SQL query")]
    EmptyQuery,
    #[error("Please connect to a database first")]
    NotConnected,
    #[error("Please test the connection successfully first")]
    NotTested,
    #[error("Please describe what you want to query")]
    EmptyDescription,
    #[error("No results to export")]
    NothingToExport,
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Testing,
    Connected(String),
    Error(String),
}

impl ConnectionStatus {
    pub fn message(&self) -> &str {
        match self {
            ConnectionStatus::Disconnected => "Not connected to any database",
            ConnectionStatus::Testing => "Testing connection to database...",
            ConnectionStatus::Connected(message) | ConnectionStatus::Error(message) => message,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected(_))
    }
}

/// The connection dialog's fields: a display name plus the descriptor sent
/// to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionForm {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: ConnectionDescriptor,
}

impl Default for ConnectionForm {
    fn default() -> Self {
        Self {
            name: "Local Database".to_string(),
            descriptor: ConnectionDescriptor {
                database_type: DatabaseType::MySql,
                host: "localhost".to_string(),
                port: DatabaseType::MySql.default_port(),
                username: String::new(),
                password: Some(String::new()),
                database: None,
            },
        }
    }
}

impl ConnectionForm {
    /// Switching dialect resets the port to that dialect's default.
    pub fn set_database_type(&mut self, database_type: DatabaseType) {
        self.descriptor.database_type = database_type;
        self.descriptor.port = database_type
            .default_port()
            .or(DatabaseType::MySql.default_port());
    }

    fn endpoint(&self) -> String {
        let port = self
            .descriptor
            .port
            .map(|p| p.to_string())
            .unwrap_or_default();
        format!("{}:{}", self.descriptor.host, port)
    }
}

/// Editor state between gateway calls.
#[derive(Debug)]
pub struct EditorSession {
    client: GatewayClient,
    pub query: String,
    connection: Option<ConnectionForm>,
    schemas: Vec<SchemaEntry>,
    connection_status: ConnectionStatus,
    status: String,
    results: Option<QueryResult>,
    error: Option<String>,
    history: QueryHistory,
}

impl EditorSession {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            query: String::new(),
            connection: None,
            schemas: Vec::new(),
            connection_status: ConnectionStatus::Disconnected,
            status: "Ready - No database connected".to_string(),
            results: None,
            error: None,
            history: QueryHistory::new(),
        }
    }

    pub fn connection(&self) -> Option<&ConnectionForm> {
        self.connection.as_ref()
    }

    pub fn schemas(&self) -> &[SchemaEntry] {
        &self.schemas
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection_status
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn results(&self) -> Option<&QueryResult> {
        self.results.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    /// Returns whether the gateway could connect. Schemas from a successful
    /// test replace the cached ones.
    pub async fn test_connection(&mut self, form: &ConnectionForm) -> bool {
        if form.descriptor.host.is_empty() || form.descriptor.username.is_empty() {
            self.connection_status =
                ConnectionStatus::Error("Please fill in Host and Username fields".to_string());
            return false;
        }

        self.connection_status = ConnectionStatus::Testing;
        match self.client.test_connection(&form.descriptor).await {
            Ok(response) => {
                self.connection_status = ConnectionStatus::Connected(format!(
                    "Successfully connected to {} database",
                    form.descriptor.database_type
                ));
                self.schemas = response.schemas;
                true
            }
            Err(e) if e.is_transport() => {
                self.connection_status = ConnectionStatus::Error(format!(
                    "Cannot connect to database: {}. Make sure your backend API is running on {}",
                    e,
                    self.client.base_url()
                ));
                false
            }
            Err(e) => {
                self.connection_status =
                    ConnectionStatus::Error(format!("Connection failed: {}", e));
                false
            }
        }
    }

    /// Keeps `form` as the active connection and refreshes the schema list.
    /// A failed refresh is logged and leaves the cached schemas alone.
    pub async fn save_connection(&mut self, form: ConnectionForm) -> Result<(), SessionError> {
        if !self.connection_status.is_connected() {
            return Err(SessionError::NotTested);
        }

        self.status = format!("Connected to {} ({})", form.name, form.endpoint());
        match self.client.get_schemas(&form.descriptor).await {
            Ok(schemas) => self.schemas = schemas,
            Err(e) => warn!("Failed to fetch schemas: {}", e),
        }
        self.connection = Some(form);
        Ok(())
    }

    pub async fn execute(&mut self) -> Result<(), SessionError> {
        if self.query.trim().is_empty() {
            return Err(self.fail(SessionError::EmptyQuery));
        }
        let Some(connection) = self.connection.as_ref() else {
            return Err(self.fail(SessionError::NotConnected));
        };

        self.status = "Executing query against database...".to_string();
        self.error = None;
        self.results = None;

        match self
            .client
            .execute_query(&connection.descriptor, self.query.trim())
            .await
        {
            Ok(result) => {
                self.history.push(&self.query);
                let verb = if result.is_select() {
                    "rows returned"
                } else {
                    "rows affected"
                };
                self.status = format!(
                    "Query executed successfully - {} {} in {}",
                    result.row_count, verb, result.execution_time
                );
                info!("{}", self.status);
                self.results = Some(result);
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("Query execution failed: {}", e));
                self.status = "Query execution failed".to_string();
                Err(e.into())
            }
        }
    }

    pub async fn generate_sql(&mut self, description: &str) -> Result<(), SessionError> {
        if description.trim().is_empty() {
            return Err(self.fail(SessionError::EmptyDescription));
        }

        self.status = "Generating SQL with AI...".to_string();
        let database_type = self
            .connection
            .as_ref()
            .map(|c| c.descriptor.database_type.as_str());
        match self
            .client
            .generate_sql(description, &self.schemas, database_type)
            .await
        {
            Ok(sql) => {
                self.query = sql;
                self.status = "SQL generated by AI".to_string();
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!(
                    "AI generation failed: {}. Feature requires AI API setup.",
                    e
                ));
                self.status = "AI generation failed".to_string();
                Err(e.into())
            }
        }
    }

    pub fn format_query(&mut self) {
        if self.query.trim().is_empty() {
            return;
        }
        self.query = format_sql(&self.query);
        self.status = "Query formatted".to_string();
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.results = None;
        self.error = None;
        self.status = "Editor cleared".to_string();
    }

    pub fn export_csv(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let rows = self.result_rows()?;
        export::write_csv(dir, rows)?.ok_or(SessionError::NothingToExport)
    }

    pub fn export_json(&self, dir: &Path) -> Result<PathBuf, SessionError> {
        let rows = self.result_rows()?;
        export::write_json(dir, rows)?.ok_or(SessionError::NothingToExport)
    }

    fn result_rows(&self) -> Result<&[crate::models::Row], SessionError> {
        self.results
            .as_ref()
            .and_then(|r| r.data.as_deref())
            .ok_or(SessionError::NothingToExport)
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.error = Some(err.to_string());
        err
    }
}

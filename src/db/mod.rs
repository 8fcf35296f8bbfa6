use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ColumnDefinition, ConnectionDescriptor, DatabaseType, Row};

pub mod mysql;
pub mod postgres;

/// Which endpoint is asking for the schema. The two endpoints disagree on
/// the database fallback and on the nullability suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionMode {
    ConnectionTest,
    SchemaFetch,
}

/// How a dialect enumerates tables for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectionPlan {
    /// Catalog schema the table and column queries are filtered by.
    pub namespace: String,
    /// Prefix rendered before each table name, e.g. `public`.
    pub table_prefix: Option<String>,
    pub not_null_suffix: bool,
}

#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Opens one dedicated connection. Timeouts are applied by the caller.
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> GatewayResult<Box<dyn DatabaseSession>>;

    /// `Ok(None)` means the dialect does not implement introspection for this
    /// mode and the endpoint answers with an empty schema list.
    fn introspection_plan(
        &self,
        descriptor: &ConnectionDescriptor,
        mode: IntrospectionMode,
    ) -> GatewayResult<Option<IntrospectionPlan>>;
}

#[async_trait]
pub trait DatabaseSession: Send {
    async fn ping(&mut self) -> GatewayResult<()>;
    async fn list_tables(&mut self, namespace: &str) -> GatewayResult<Vec<String>>;
    async fn list_columns(
        &mut self,
        namespace: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDefinition>>;
    async fn fetch_rows(&mut self, sql: &str) -> GatewayResult<Vec<Row>>;
    async fn execute(&mut self, sql: &str) -> GatewayResult<u64>;
    async fn close(self: Box<Self>) -> GatewayResult<()>;
}

/// Opens a session, runs `work` on it, and closes the session whatever the
/// outcome of `work` was.
pub async fn with_session<T, F>(
    driver: &dyn DatabaseDriver,
    descriptor: &ConnectionDescriptor,
    connect_timeout: Duration,
    work: F,
) -> GatewayResult<T>
where
    F: for<'s> FnOnce(&'s mut (dyn DatabaseSession + 'static)) -> BoxFuture<'s, GatewayResult<T>>,
{
    let mut session = tokio::time::timeout(connect_timeout, driver.connect(descriptor))
        .await
        .map_err(|_| GatewayError::ConnectTimeout(connect_timeout))??;

    let outcome = work(session.as_mut()).await;

    if let Err(e) = session.close().await {
        warn!(
            "Failed to close {} connection to {}: {}",
            driver.database_type(),
            descriptor.host,
            e
        );
    }
    outcome
}

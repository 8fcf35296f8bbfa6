use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgValueFormat};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::db::{DatabaseDriver, DatabaseSession, IntrospectionMode, IntrospectionPlan};
use crate::error::GatewayResult;
use crate::models::{ColumnDefinition, ConnectionDescriptor, DatabaseType, Row as ResultRow};

/// Only this schema is introspected; tables elsewhere are not listed.
const PUBLIC_SCHEMA: &str = "public";

pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
        let mut opts = PgConnectOptions::new()
            .host(&descriptor.host)
            .username(&descriptor.username)
            .password(descriptor.password.as_deref().unwrap_or(""));
        if let Some(port) = descriptor.port_or_default() {
            opts = opts.port(port);
        }
        if let Some(db) = descriptor.database() {
            opts = opts.database(db);
        }
        opts.disable_statement_logging()
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSql
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> GatewayResult<Box<dyn DatabaseSession>> {
        let conn = Self::connect_options(descriptor).connect().await?;
        Ok(Box::new(PostgresSession { conn }))
    }

    fn introspection_plan(
        &self,
        _descriptor: &ConnectionDescriptor,
        mode: IntrospectionMode,
    ) -> GatewayResult<Option<IntrospectionPlan>> {
        match mode {
            IntrospectionMode::ConnectionTest => Ok(Some(IntrospectionPlan {
                namespace: PUBLIC_SCHEMA.to_string(),
                table_prefix: Some(PUBLIC_SCHEMA.to_string()),
                not_null_suffix: false,
            })),
            // Schema refresh after saving a connection is MySQL-only.
            IntrospectionMode::SchemaFetch => Ok(None),
        }
    }
}

pub struct PostgresSession {
    conn: PgConnection,
}

#[async_trait]
impl DatabaseSession for PostgresSession {
    async fn ping(&mut self) -> GatewayResult<()> {
        sqlx::query("SELECT 1").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn list_tables(&mut self, namespace: &str) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name::text AS table_name, table_type::text AS table_type \
             FROM information_schema.tables \
             WHERE table_schema = $1",
        )
        .bind(namespace)
        .fetch_all(&mut self.conn)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<String>, sqlx::Error>>()?)
    }

    async fn list_columns(
        &mut self,
        namespace: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(
            "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                    is_nullable::text AS is_nullable, column_default::text AS column_default \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(namespace)
        .bind(table)
        .fetch_all(&mut self.conn)
        .await?;

        debug!("PostgreSQL table {}.{} has {} columns", namespace, table, rows.len());
        let mut cols = Vec::with_capacity(rows.len());
        for row in &rows {
            let is_nullable: String = row.try_get("is_nullable")?;
            cols.push(ColumnDefinition {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                nullable: is_nullable != "NO",
            });
        }
        Ok(cols)
    }

    async fn fetch_rows(&mut self, sql: &str) -> GatewayResult<Vec<ResultRow>> {
        // Simple-query protocol: the text is sent as-is and may hold several statements.
        let rows = Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> GatewayResult<u64> {
        let done = Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(done.rows_affected())
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn convert_row(row: &PgRow) -> ResultRow {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), map_postgres_value(row, col.ordinal())))
        .collect()
}

fn map_postgres_value(row: &PgRow, index: usize) -> serde_json::Value {
    let value_ref = match row.try_get_raw(index) {
        Ok(v) => v,
        Err(_) => return serde_json::Value::Null,
    };

    if value_ref.is_null() {
        return serde_json::Value::Null;
    }

    let type_info = value_ref.type_info();
    let type_name = type_info.name();

    match type_name {
        "BOOL" => {
            let v: Option<bool> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "INT2" => {
            let v: Option<i16> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "INT4" => {
            let v: Option<i32> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "INT8" => {
            let v: Option<i64> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "FLOAT4" => {
            let v: Option<f32> = row.try_get(index).ok();
            serde_json::json!(v.map(f64::from))
        }
        "FLOAT8" => {
            let v: Option<f64> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "BPCHAR" => {
            let v: Option<String> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "UUID" => {
            let v: Option<uuid::Uuid> = row.try_get(index).ok();
            serde_json::json!(v.map(|u| u.to_string()))
        }
        "TIMESTAMPTZ" => {
            let v: Option<DateTime<Utc>> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::json!(t.to_rfc3339()),
                None => fallback_value(row, index, type_name),
            }
        }
        "TIMESTAMP" => {
            let v: Option<NaiveDateTime> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::json!(t.to_string()),
                None => fallback_value(row, index, type_name),
            }
        }
        "DATE" => {
            let v: Option<NaiveDate> = row.try_get(index).ok();
            match v {
                Some(d) => serde_json::json!(d.to_string()),
                None => fallback_value(row, index, type_name),
            }
        }
        "TIME" => {
            let v: Option<NaiveTime> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::json!(t.to_string()),
                None => fallback_value(row, index, type_name),
            }
        }
        "MONEY" => match value_ref.format() {
            // binary MONEY is a 64-bit integer count of cents
            PgValueFormat::Binary => match value_ref.as_bytes() {
                Ok(bytes) if bytes.len() == 8 => {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(bytes);
                    let cents = i64::from_be_bytes(buf);
                    serde_json::Value::String(format!("${:.2}", cents as f64 / 100.0))
                }
                _ => fallback_value(row, index, type_name),
            },
            PgValueFormat::Text => fallback_value(row, index, type_name),
        },
        "NUMERIC" => {
            let v: Option<bigdecimal::BigDecimal> = row.try_get(index).ok();
            match v {
                Some(d) => serde_json::json!(d.to_string()),
                None => fallback_value(row, index, type_name),
            }
        }
        // INET, CIDR, MACADDR and friends keep the server's own text form
        "VARCHAR[]" | "TEXT[]" | "CHAR[]" | "NAME[]" => {
            let v: Option<Vec<String>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "INT2[]" => {
            let v: Option<Vec<i16>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "INT4[]" => {
            let v: Option<Vec<i32>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "INT8[]" => {
            let v: Option<Vec<i64>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "FLOAT4[]" | "FLOAT8[]" => {
            let v: Option<Vec<f64>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "BOOL[]" => {
            let v: Option<Vec<bool>> = row.try_get(index).ok();
            v.map(|v| serde_json::json!(v))
                .unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        "JSON" | "JSONB" => {
            let v: Option<serde_json::Value> = row.try_get(index).ok();
            v.unwrap_or_else(|| fallback_value(row, index, type_name))
        }
        _ => fallback_value(row, index, type_name),
    }
}

/// The server's text for the value; binary values it cannot read are shown
/// by type name.
fn fallback_value(row: &PgRow, index: usize, type_name: &str) -> serde_json::Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(s);
    }
    if let Ok(value_ref) = row.try_get_raw(index) {
        if let Ok(s) = value_ref.as_str() {
            return serde_json::Value::String(s.to_string());
        }
    }
    serde_json::Value::String(format!("<{}>", type_name))
}

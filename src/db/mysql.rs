use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::db::{DatabaseDriver, DatabaseSession, IntrospectionMode, IntrospectionPlan};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ColumnDefinition, ConnectionDescriptor, DatabaseType, Row as ResultRow};

/// Schema listed when a connection test names no database.
const FALLBACK_SCHEMA: &str = "information_schema";

pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(descriptor: &ConnectionDescriptor) -> MySqlConnectOptions {
        let mut opts = MySqlConnectOptions::new()
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

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> GatewayResult<Box<dyn DatabaseSession>> {
        let conn = Self::connect_options(descriptor).connect().await?;
        Ok(Box::new(MySqlSession { conn }))
    }

    fn introspection_plan(
        &self,
        descriptor: &ConnectionDescriptor,
        mode: IntrospectionMode,
    ) -> GatewayResult<Option<IntrospectionPlan>> {
        let plan = match mode {
            IntrospectionMode::ConnectionTest => IntrospectionPlan {
                namespace: descriptor.database().unwrap_or(FALLBACK_SCHEMA).to_string(),
                table_prefix: None,
                not_null_suffix: false,
            },
            IntrospectionMode::SchemaFetch => IntrospectionPlan {
                namespace: descriptor
                    .database()
                    .ok_or(GatewayError::MissingDatabase)?
                    .to_string(),
                table_prefix: None,
                not_null_suffix: true,
            },
        };
        Ok(Some(plan))
    }
}

pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    async fn ping(&mut self) -> GatewayResult<()> {
        sqlx::query("SELECT 1").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn list_tables(&mut self, namespace: &str) -> GatewayResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT TABLE_NAME, TABLE_COMMENT \
             FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = ?",
        )
        .bind(namespace)
        .fetch_all(&mut self.conn)
        .await?;

        Ok(rows.iter().map(|row| text_column(row, 0)).collect())
    }

    async fn list_columns(
        &mut self,
        namespace: &str,
        table: &str,
    ) -> GatewayResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(namespace)
        .bind(table)
        .fetch_all(&mut self.conn)
        .await?;

        debug!("MySQL table {}.{} has {} columns", namespace, table, rows.len());
        Ok(rows
            .iter()
            .map(|row| ColumnDefinition {
                name: text_column(row, 0),
                data_type: text_column(row, 1),
                nullable: text_column(row, 2) != "NO",
            })
            .collect())
    }

    async fn fetch_rows(&mut self, sql: &str) -> GatewayResult<Vec<ResultRow>> {
        let rows = sqlx::query(sql).fetch_all(&mut self.conn).await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> GatewayResult<u64> {
        let done = sqlx::query(sql).execute(&mut self.conn).await?;
        Ok(done.rows_affected())
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// MySQL 8 reports several INFORMATION_SCHEMA columns with a binary
/// collation, which sqlx refuses to decode as `String`.
fn text_column(row: &MySqlRow, idx: usize) -> String {
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return s;
    }
    match row.try_get::<Option<Vec<u8>>, _>(idx) {
        Ok(Some(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

fn convert_row(row: &MySqlRow) -> ResultRow {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), map_mysql_value(row, col.ordinal())))
        .collect()
}

fn map_mysql_value(row: &MySqlRow, index: usize) -> serde_json::Value {
    let value_ref = match row.try_get_raw(index) {
        Ok(v) => v,
        Err(_) => return serde_json::Value::Null,
    };

    if value_ref.is_null() {
        return serde_json::Value::Null;
    }

    let type_name = value_ref.type_info().name().to_ascii_uppercase();

    match type_name.as_str() {
        // TINYINT(1) comes back as a number, not a boolean
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT"
        | "YEAR" => {
            let v: Option<i64> = row
                .try_get::<i64, _>(index)
                .or_else(|_| row.try_get::<i32, _>(index).map(i64::from))
                .or_else(|_| row.try_get::<i16, _>(index).map(i64::from))
                .or_else(|_| row.try_get::<i8, _>(index).map(i64::from))
                .or_else(|_| row.try_get::<u16, _>(index).map(i64::from))
                .ok();
            v.map(serde_json::Value::from)
                .unwrap_or_else(|| fallback_value(row, index, &type_name))
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "INTEGER UNSIGNED" | "BIGINT UNSIGNED" => {
            let v: Option<u64> = row
                .try_get::<u64, _>(index)
                .or_else(|_| row.try_get::<u32, _>(index).map(u64::from))
                .or_else(|_| row.try_get::<u16, _>(index).map(u64::from))
                .or_else(|_| row.try_get::<u8, _>(index).map(u64::from))
                .ok();
            v.map(serde_json::Value::from)
                .unwrap_or_else(|| fallback_value(row, index, &type_name))
        }
        "FLOAT" => {
            let v: Option<f32> = row.try_get(index).ok();
            serde_json::json!(v.map(f64::from))
        }
        "DOUBLE" | "REAL" => {
            let v: Option<f64> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        // Exact numerics stay strings so no precision is lost
        "DECIMAL" | "NUMERIC" | "NEWDECIMAL" => {
            let v: Option<bigdecimal::BigDecimal> = row.try_get(index).ok();
            match v {
                Some(d) => serde_json::Value::String(d.to_string()),
                None => fallback_value(row, index, &type_name),
            }
        }
        "DATETIME" => {
            let v: Option<NaiveDateTime> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::Value::String(t.to_string()),
                None => fallback_value(row, index, &type_name),
            }
        }
        "TIMESTAMP" => {
            let v: Option<DateTime<Utc>> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::Value::String(t.to_rfc3339()),
                None => fallback_value(row, index, &type_name),
            }
        }
        "DATE" => {
            let v: Option<NaiveDate> = row.try_get(index).ok();
            match v {
                Some(d) => serde_json::Value::String(d.to_string()),
                None => fallback_value(row, index, &type_name),
            }
        }
        "TIME" => {
            let v: Option<NaiveTime> = row.try_get(index).ok();
            match v {
                Some(t) => serde_json::Value::String(t.to_string()),
                None => fallback_value(row, index, &type_name),
            }
        }
        "JSON" => {
            let v: Option<serde_json::Value> = row.try_get(index).ok();
            v.unwrap_or_else(|| fallback_value(row, index, &type_name))
        }
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT" => {
            match row.try_get::<Vec<u8>, _>(index) {
                Ok(bytes) => serde_json::Value::String(bytes_to_string_or_hex(bytes)),
                Err(_) => fallback_value(row, index, &type_name),
            }
        }
        _ => fallback_value(row, index, &type_name),
    }
}

fn fallback_value(row: &MySqlRow, index: usize, type_name: &str) -> serde_json::Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(s);
    }
    // ENUM, SET and friends: read the raw payload without the type check
    match row.try_get_unchecked::<Vec<u8>, _>(index) {
        Ok(bytes) => serde_json::Value::String(bytes_to_string_or_hex(bytes)),
        Err(_) => serde_json::Value::String(format!("<{}>", type_name)),
    }
}

/// Binary columns that hold text are shown as text, anything else as hex.
fn bytes_to_string_or_hex(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) if !s.chars().any(|c| c.is_control() && !c.is_whitespace()) => s,
        Ok(s) => to_hex(s.as_bytes()),
        Err(e) => to_hex(e.as_bytes()),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for byte in bytes {
        let _ = write!(&mut s, "{:02X}", byte);
    }
    s
}

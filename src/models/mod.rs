use serde::{Deserialize, Deserializer, Serialize};

/// A single result row: column name to driver value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatabaseType {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "postgresql")]
    PostgreSql,
    /// Any `type` value the gateway has no driver for, including a missing one.
    #[default]
    #[serde(rename = "unsupported")]
    #[serde(other)]
    Unsupported,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySql => "mysql",
            DatabaseType::PostgreSql => "postgresql",
            DatabaseType::Unsupported => "unsupported",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::MySql => Some(3306),
            DatabaseType::PostgreSql => Some(5432),
            DatabaseType::Unsupported => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConnectionDescriptor {
    #[serde(rename = "type", default)]
    pub database_type: DatabaseType,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "deserialize_database")]
    pub database: Option<String>,
}

impl ConnectionDescriptor {
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| self.database_type.default_port())
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

/// Browser forms send the port as a string; empty or non-numeric means "driver default".
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u64),
        Text(String),
    }

    let port = match Option::<RawPort>::deserialize(deserializer)? {
        Some(RawPort::Number(n)) => u16::try_from(n).ok(),
        Some(RawPort::Text(s)) => s.trim().parse::<u16>().ok(),
        None => None,
    };
    Ok(port.filter(|p| *p != 0))
}

fn deserialize_database<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let database = Option::<String>::deserialize(deserializer)?;
    Ok(database.filter(|db| !db.trim().is_empty()))
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    pub table_name: String,
    pub columns: String,
}

/// One column as read from a catalog view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecuteQueryRequest {
    #[serde(default)]
    pub connection: ConnectionDescriptor,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GenerateSqlRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub schema: Vec<SchemaEntry>,
    #[serde(default)]
    pub database_type: Option<String>,
}

/// Wire shape of a successful `execute-query`. `data` is present for the
/// select variant, `message` for every other statement type.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    #[serde(rename = "type")]
    pub statement_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub row_count: u64,
    pub execution_time: String,
}

impl QueryResult {
    pub fn is_select(&self) -> bool {
        self.statement_type == "select"
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub message: String,
    pub schemas: Vec<SchemaEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaResponse {
    pub success: bool,
    pub schemas: Vec<SchemaEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateSqlResponse {
    pub success: bool,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

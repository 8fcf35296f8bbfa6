//! Runs `execute-query` statements; the kind is taken from the first word only.

use std::time::Duration;

use crate::db::DatabaseSession;
use crate::error::GatewayResult;
use crate::models::{QueryResult, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    /// Lowercased first token, e.g. `update`, `with`, `show`.
    Other(String),
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let token = sql
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();
        if token == "select" {
            StatementKind::Select
        } else {
            StatementKind::Other(token)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Other(token) => token,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Affected { statement: String, count: u64 },
}

impl QueryOutcome {
    pub fn into_result(self, elapsed: Duration) -> QueryResult {
        let execution_time = format_elapsed(elapsed);
        match self {
            QueryOutcome::Rows(rows) => QueryResult {
                success: true,
                statement_type: StatementKind::Select.as_str().to_string(),
                row_count: rows.len() as u64,
                data: Some(rows),
                message: None,
                execution_time,
            },
            QueryOutcome::Affected { statement, count } => QueryResult {
                success: true,
                statement_type: statement,
                data: None,
                message: Some(format!("{} row(s) affected", count)),
                row_count: count,
                execution_time,
            },
        }
    }
}

pub async fn run(session: &mut dyn DatabaseSession, sql: &str) -> GatewayResult<QueryOutcome> {
    match StatementKind::classify(sql) {
        StatementKind::Select => Ok(QueryOutcome::Rows(session.fetch_rows(sql).await?)),
        StatementKind::Other(statement) => {
            let count = session.execute(sql).await?;
            Ok(QueryOutcome::Affected { statement, count })
        }
    }
}

/// Whole milliseconds, e.g. `"42ms"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}ms", elapsed.as_millis())
}

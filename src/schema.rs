//! Table-then-columns catalog walk (1 + N queries).

use tracing::debug;

use crate::db::{DatabaseSession, IntrospectionPlan};
use crate::error::GatewayResult;
use crate::models::{ColumnDefinition, SchemaEntry};

pub async fn introspect(
    session: &mut dyn DatabaseSession,
    plan: &IntrospectionPlan,
) -> GatewayResult<Vec<SchemaEntry>> {
    let tables = session.list_tables(&plan.namespace).await?;
    debug!("Introspecting {} tables in {}", tables.len(), plan.namespace);

    let mut schemas = Vec::with_capacity(tables.len());
    for table in tables {
        let columns = session.list_columns(&plan.namespace, &table).await?;
        schemas.push(SchemaEntry {
            table_name: table_display_name(plan, &table),
            columns: render_columns(&columns, plan.not_null_suffix),
        });
    }
    Ok(schemas)
}

fn table_display_name(plan: &IntrospectionPlan, table: &str) -> String {
    match &plan.table_prefix {
        Some(prefix) => format!("{}.{}", prefix, table),
        None => table.to_string(),
    }
}

/// `"id (int NOT NULL), name (varchar)"`
pub fn render_columns(columns: &[ColumnDefinition], not_null_suffix: bool) -> String {
    columns
        .iter()
        .map(|col| {
            let suffix = if not_null_suffix && !col.nullable {
                " NOT NULL"
            } else {
                ""
            };
            format!("{} ({}{})", col.name, col.data_type, suffix)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

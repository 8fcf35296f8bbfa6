use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use tracing::{error, info};

use crate::db::{self, IntrospectionMode};
use crate::error::{GatewayError, TimedError};
use crate::models::{
    ConnectionDescriptor, ConnectionTestResponse, ErrorResponse, ExecuteQueryRequest,
    GenerateSqlRequest, HealthResponse, QueryResult, SchemaResponse,
};
use crate::query::{self, format_elapsed};
use crate::schema;
use crate::state::AppState;

pub const GENERATE_SQL_UNAVAILABLE: &str =
    "AI SQL generation requires integration with AI service (OpenAI, Claude, etc.)";

fn invalid_body(rejection: JsonRejection) -> GatewayError {
    GatewayError::InvalidRequest(rejection.body_text())
}

pub async fn test_connection(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionDescriptor>, JsonRejection>,
) -> Result<Json<ConnectionTestResponse>, GatewayError> {
    let Json(descriptor) = payload.map_err(invalid_body)?;

    let schemas = match state.registry.get(descriptor.database_type) {
        Some(driver) => {
            let plan = driver.introspection_plan(&descriptor, IntrospectionMode::ConnectionTest)?;
            let outcome = db::with_session(
                driver.as_ref(),
                &descriptor,
                state.connect_timeout,
                move |session| {
                    Box::pin(async move {
                        session.ping().await?;
                        match plan {
                            Some(plan) => schema::introspect(session, &plan).await,
                            None => Ok(Vec::new()),
                        }
                    })
                },
            )
            .await;
            outcome.map_err(|e| {
                error!(
                    "Connection test failed for {} at {}: {}",
                    descriptor.database_type, descriptor.host, e
                );
                e
            })?
        }
        // Unknown dialects fall through with nothing introspected.
        None => Vec::new(),
    };

    info!(
        "Connection test to {} at {} succeeded, {} tables",
        descriptor.database_type,
        descriptor.host,
        schemas.len()
    );
    Ok(Json(ConnectionTestResponse {
        success: true,
        message: "Connection successful".to_string(),
        schemas,
    }))
}

pub async fn execute_query(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteQueryRequest>, JsonRejection>,
) -> Result<Json<QueryResult>, TimedError> {
    let started = Instant::now();
    let timed = |e: GatewayError| e.timed(format_elapsed(started.elapsed()));

    let Json(request) = payload.map_err(|r| timed(invalid_body(r)))?;
    let ExecuteQueryRequest { connection, query: sql } = request;
    let driver = state
        .registry
        .get(connection.database_type)
        .ok_or_else(|| timed(GatewayError::UnsupportedDialect(connection.database_type)))?;

    let outcome = db::with_session(
        driver.as_ref(),
        &connection,
        state.connect_timeout,
        move |session| Box::pin(async move { query::run(session, &sql).await }),
    )
    .await;

    match outcome {
        Ok(outcome) => {
            let result = outcome.into_result(started.elapsed());
            info!(
                "{} query on {} returned {} rows in {}",
                result.statement_type, connection.host, result.row_count, result.execution_time
            );
            Ok(Json(result))
        }
        Err(e) => {
            error!("Query execution failed on {}: {}", connection.host, e);
            Err(timed(e))
        }
    }
}

pub async fn get_schemas(
    State(state): State<AppState>,
    payload: Result<Json<ConnectionDescriptor>, JsonRejection>,
) -> Result<Json<SchemaResponse>, GatewayError> {
    let Json(descriptor) = payload.map_err(invalid_body)?;

    let plan = match state.registry.get(descriptor.database_type) {
        Some(driver) => driver
            .introspection_plan(&descriptor, IntrospectionMode::SchemaFetch)?
            .map(|plan| (driver, plan)),
        None => None,
    };

    let schemas = match plan {
        Some((driver, plan)) => db::with_session(
            driver.as_ref(),
            &descriptor,
            state.connect_timeout,
            move |session| Box::pin(async move { schema::introspect(session, &plan).await }),
        )
        .await
        .map_err(|e| {
            error!("Schema fetch failed for {}: {}", descriptor.host, e);
            e
        })?,
        None => Vec::new(),
    };

    Ok(Json(SchemaResponse {
        success: true,
        schemas,
    }))
}

pub async fn generate_sql(
    payload: Result<Json<GenerateSqlRequest>, JsonRejection>,
) -> (StatusCode, Json<ErrorResponse>) {
    if let Ok(Json(request)) = payload {
        info!(
            "SQL generation requested for {:?} ({} tables in context)",
            request.database_type,
            request.schema.len()
        );
    }
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorResponse {
            success: false,
            error: GENERATE_SQL_UNAVAILABLE.to_string(),
            execution_time: None,
        }),
    )
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "SQL Editor API is running".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

mod common;

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use regex::Regex;
use serde_json::{json, Value};
use sqlpad_lib::commands::GENERATE_SQL_UNAVAILABLE;
use sqlpad_lib::http::router;
use sqlpad_lib::models::DatabaseType;
use tower::ServiceExt;

use common::{mysql_descriptor, postgres_descriptor, state_with, state_with_timeout, FakeDriver};

async fn send(app: Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body)
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body.to_string())).await
}

fn execute_body(connection: Value, query: &str) -> Value {
    json!({ "connection": connection, "query": query })
}

fn assert_execution_time(value: &Value) {
    let pattern = Regex::new(r"^\d+ms$").unwrap();
    let time = value["executionTime"].as_str().unwrap();
    assert!(pattern.is_match(time), "unexpected executionTime {time}");
}

#[tokio::test]
async fn select_returns_rows_in_column_order() {
    let driver = FakeDriver::new(DatabaseType::MySql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(
        app,
        "/api/execute-query",
        execute_body(mysql_descriptor(Some("shop")), "SELECT id, email FROM users"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "select");
    assert_eq!(body["rowCount"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert!(body.get("message").is_none());
    assert_execution_time(&body);

    let first: Vec<&String> = body["data"][0].as_object().unwrap().keys().collect();
    assert_eq!(first, vec!["id", "email"]);

    let journal = journal.lock().unwrap();
    assert_eq!(journal.statements, vec![("fetch", "SELECT id, email FROM users".to_string())]);
    assert_eq!((journal.connects, journal.closes), (1, 1));
}

#[tokio::test]
async fn update_reports_affected_rows() {
    let app = router(state_with(vec![FakeDriver::new(DatabaseType::MySql)]));

    let (status, body) = post(
        app,
        "/api/execute-query",
        execute_body(mysql_descriptor(Some("shop")), "update users set email = null"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "update");
    assert_eq!(body["message"], "4 row(s) affected");
    assert_eq!(body["rowCount"], 4);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn with_query_takes_the_execute_path() {
    let driver = FakeDriver::new(DatabaseType::PostgreSql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(
        app,
        "/api/execute-query",
        execute_body(postgres_descriptor(), "WITH t AS (SELECT 1) SELECT * FROM t"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "with");
    assert!(body.get("data").is_none());
    assert_eq!(journal.lock().unwrap().statements[0].0, "execute");
}

#[tokio::test]
async fn query_failure_is_timed_and_still_closes() {
    let driver =
        FakeDriver::new(DatabaseType::MySql).failing_queries("Table 'shop.nope' doesn't exist");
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(
        app,
        "/api/execute-query",
        execute_body(mysql_descriptor(Some("shop")), "SELECT * FROM nope"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Table 'shop.nope' doesn't exist"));
    assert_execution_time(&body);

    let journal = journal.lock().unwrap();
    assert_eq!((journal.connects, journal.closes), (1, 1));
}

#[tokio::test]
async fn refused_connection_is_bad_request() {
    let driver = FakeDriver::new(DatabaseType::MySql).refusing_connections("Access denied");
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(app, "/api/test-connection", mysql_descriptor(None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Access denied"));
    assert_eq!(journal.lock().unwrap().closes, 0);
}

#[tokio::test]
async fn slow_connect_hits_the_timeout() {
    let driver = FakeDriver::new(DatabaseType::MySql).slow_to_connect(Duration::from_secs(5));
    let app = router(state_with_timeout(vec![driver], Duration::from_secs(1)));

    let (status, body) = post(
        app,
        "/api/execute-query",
        execute_body(mysql_descriptor(Some("shop")), "SELECT 1"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection timed out after 1s");
    assert_execution_time(&body);
}

#[tokio::test]
async fn mysql_connection_test_falls_back_to_information_schema() {
    let driver = FakeDriver::new(DatabaseType::MySql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(app, "/api/test-connection", mysql_descriptor(None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": "Connection successful",
            "schemas": [{"tableName": "users", "columns": "id (int), email (varchar)"}]
        })
    );
    assert_eq!(journal.lock().unwrap().namespaces, vec!["information_schema"]);
}

#[tokio::test]
async fn mysql_schema_fetch_marks_not_null_columns() {
    let driver = FakeDriver::new(DatabaseType::MySql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(app, "/api/get-schemas", mysql_descriptor(Some("shop"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["schemas"],
        json!([{"tableName": "users", "columns": "id (int NOT NULL), email (varchar)"}])
    );
    assert_eq!(journal.lock().unwrap().namespaces, vec!["shop"]);
}

#[tokio::test]
async fn mysql_schema_fetch_requires_database() {
    let driver = FakeDriver::new(DatabaseType::MySql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (status, body) = post(app, "/api/get-schemas", mysql_descriptor(None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Database name is required to fetch schemas");
    assert_eq!(journal.lock().unwrap().connects, 0);
}

#[tokio::test]
async fn postgres_lists_public_tables_only_on_connection_test() {
    let driver = FakeDriver::new(DatabaseType::PostgreSql);
    let journal = driver.journal();
    let app = router(state_with(vec![driver]));

    let (_, tested) = post(app.clone(), "/api/test-connection", postgres_descriptor()).await;
    assert_eq!(tested["schemas"][0]["tableName"], "public.users");
    assert_eq!(tested["schemas"][0]["columns"], "id (int), email (varchar)");

    let (status, fetched) = post(app, "/api/get-schemas", postgres_descriptor()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, json!({"success": true, "schemas": []}));

    assert_eq!(journal.lock().unwrap().connects, 1);
}

#[tokio::test]
async fn unsupported_type_differs_per_endpoint() {
    let app = router(state_with(vec![FakeDriver::new(DatabaseType::MySql)]));
    let oracle = json!({"type": "oracle", "host": "h", "port": 1521, "username": "u"});

    let (status, body) = post(app.clone(), "/api/test-connection", oracle.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schemas"], json!([]));

    let (status, body) = post(app.clone(), "/api/get-schemas", oracle.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["schemas"], json!([]));

    let (status, body) = post(app, "/api/execute-query", execute_body(oracle, "SELECT 1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unsupported database type: unsupported");
    assert_execution_time(&body);
}

#[tokio::test]
async fn malformed_body_is_rejected_with_envelope() {
    let app = router(state_with(vec![FakeDriver::new(DatabaseType::MySql)]));

    let (status, body) = send(
        app,
        Method::POST,
        "/api/test-connection",
        Some("{not json".to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generate_sql_is_not_implemented() {
    let app = router(state_with(vec![]));

    let (status, body) = post(
        app,
        "/api/generate-sql",
        json!({"description": "top customers", "schema": [], "databaseType": "mysql"}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body, json!({"success": false, "error": GENERATE_SQL_UNAVAILABLE}));
}

#[tokio::test]
async fn health_reports_timestamp() {
    let app = router(state_with(vec![]));

    let (status, body) = send(app, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "SQL Editor API is running");
    let timestamp = body["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    assert!(timestamp.ends_with('Z'));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = router(state_with(vec![]));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

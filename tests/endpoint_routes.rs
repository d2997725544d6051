//! Endpoint Route Tests
//!
//! Drives the axum router in-process:
//! - Registration returns a handle and widget config
//! - The endpoint answers GET (query string) and POST (form or JSON)
//! - Lookup failures are 200 with the error envelope
//! - Sessions isolate registrations and can be invalidated

use aerogrid::datatables::{DataTables, MemoryTable, Row, TableCatalog};
use aerogrid::http_server::{DataTablesState, HttpServer, HttpServerConfig};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// =============================================================================
// Helper Functions
// =============================================================================

const SESSION: &str = "session-a";

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("row must be an object"),
    }
}

fn app() -> Router {
    let table = MemoryTable::with_rows(
        "users",
        vec!["id".to_string(), "name".to_string()],
        (1..=15)
            .map(|i| row(json!({"id": i, "name": format!("user{:02}", i), "secret": "x"})))
            .collect(),
    )
    .unwrap();
    let mut catalog = TableCatalog::new();
    catalog.add(table);

    let config = HttpServerConfig::default();
    let state = DataTablesState::new(DataTables::in_memory(), catalog, &config);
    HttpServer::with_state(config, Arc::new(state)).router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/datatables/register")
        .header("x-session-id", SESSION)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn register_people(app: &Router) {
    let (status, _) = register(
        app,
        json!({
            "handle": "people",
            "source": {
                "type": "rows",
                "rows": [
                    {"id": 1, "name": "Bob"},
                    {"id": 2, "name": "ann"}
                ]
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-session-id", SESSION)
        .body(Body::empty())
        .unwrap()
}

const SEARCH_AN: &str =
    "draw=3&search%5Bvalue%5D=an&columns%5B0%5D%5Bdata%5D=name&columns%5B0%5D%5Bsearchable%5D=true";

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_rows_returns_config() {
    let app = app();
    let (status, body) = register(
        &app,
        json!({
            "handle": "people",
            "http_method": "GET",
            "options": {"class": "compact", "data-role": "grid"},
            "source": {"type": "rows", "rows": [{"first_name": "Ann"}]}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session_id"], SESSION);
    assert_eq!(body["registration"]["handle"], "people");
    assert_eq!(body["registration"]["source"], "rows");
    assert_eq!(
        body["registration"]["columns"],
        json!([{"data": "first_name", "title": "First name"}])
    );
    assert_eq!(body["table"]["tableId"], "people");
    assert_eq!(body["table"]["tableClass"], "compact");
    assert_eq!(body["table"]["attributes"]["data-role"], "grid");
    assert_eq!(body["table"]["ajax"]["url"], "/datatables/endpoint?key=people");
    assert_eq!(body["table"]["ajax"]["type"], "GET");
}

#[tokio::test]
async fn test_register_requires_session_header() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/datatables/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"source": {"type": "rows", "rows": []}}).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("x-session-id"));

    let (_, body) = send(&app, get("/datatables/registrations")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_register_empty_rows_has_no_columns() {
    let app = app();
    let (status, body) = register(&app, json!({"source": {"type": "rows", "rows": []}})).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session_id"], SESSION);
    assert!(body["registration"]["columns"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_table_projects_allow_list() {
    let app = app();
    let (status, body) = register(
        &app,
        json!({"handle": "users", "source": {"type": "table", "name": "users"}}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registration"]["source"], "query");
    assert_eq!(
        body["registration"]["columns"],
        json!([{"data": "id", "title": "Id"}, {"data": "name", "title": "Name"}])
    );
}

#[tokio::test]
async fn test_register_unsupported_source() {
    let app = app();
    let (status, body) = register(&app, json!({"source": {"type": "sql", "query": "x"}})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Unsupported data source"));
}

#[tokio::test]
async fn test_register_invalid_handle() {
    let app = app();
    let (status, _) = register(
        &app,
        json!({"handle": "../etc", "source": {"type": "rows", "rows": []}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Page Endpoint
// =============================================================================

#[tokio::test]
async fn test_endpoint_get() {
    let app = app();
    register_people(&app).await;

    let (status, body) = send(&app, get(&format!("/datatables/endpoint?key=people&{}", SEARCH_AN))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "draw": 3,
            "recordsTotal": 2,
            "recordsFiltered": 1,
            "data": [{"id": 2, "name": "ann"}]
        })
    );
}

#[tokio::test]
async fn test_endpoint_post_form() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/datatables/endpoint?key=people")
        .header("x-session-id", SESSION)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(SEARCH_AN))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recordsFiltered"], 1);
    assert_eq!(body["data"][0]["name"], "ann");
}

#[tokio::test]
async fn test_endpoint_post_json() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/datatables/endpoint")
        .header("x-session-id", SESSION)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "key": "people",
                "draw": "4",
                "order": [{"column": 0, "dir": "desc"}],
                "columns": [{"data": "name", "orderable": true}]
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["draw"], 4);
    assert_eq!(body["data"][0]["name"], "ann");
    assert_eq!(body["data"][1]["name"], "Bob");
}

#[tokio::test]
async fn test_endpoint_post_json_malformed_fields_default() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/datatables/endpoint?key=people")
        .header("x-session-id", SESSION)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "draw": [9],
                "order": null,
                "search": {"value": "an"},
                "columns": [{"data": {"_": "name", "sort": "name"}, "searchable": true}]
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "draw": 0,
            "recordsTotal": 2,
            "recordsFiltered": 1,
            "data": [{"id": 2, "name": "ann"}]
        })
    );
}

#[tokio::test]
async fn test_endpoint_query_pagination() {
    let app = app();
    register(
        &app,
        json!({"handle": "users", "source": {"type": "table", "name": "users"}}),
    )
    .await;

    let (status, body) = send(
        &app,
        get("/datatables/endpoint?key=users&start=12&length=5&order%5B0%5D%5Bcolumn%5D=0&order%5B0%5D%5Bdir%5D=asc&columns%5B0%5D%5Bdata%5D=name&columns%5B0%5D%5Borderable%5D=true"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recordsTotal"], 15);
    assert_eq!(body["recordsFiltered"], 15);
    // start aligns down to the page boundary at 10
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["user11", "user12", "user13", "user14", "user15"]);
    assert!(body["data"][0].get("secret").is_none());
}

#[tokio::test]
async fn test_endpoint_unknown_key_is_error_envelope() {
    let app = app();
    let (status, body) = send(&app, get("/datatables/endpoint?key=nobody&draw=1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "An error occurred or invalid session key."}));
}

#[tokio::test]
async fn test_endpoint_missing_key_is_error_envelope() {
    let app = app();
    let (status, body) = send(&app, get("/datatables/endpoint?draw=1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Invalid session key."}));
}

#[tokio::test]
async fn test_endpoint_other_session_cannot_read() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .uri("/datatables/endpoint?key=people")
        .header("x-session-id", "session-b")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_some());
    assert!(body.get("data").is_none());
}

// =============================================================================
// Metadata and Lifecycle
// =============================================================================

#[tokio::test]
async fn test_columns_and_config_routes() {
    let app = app();
    register_people(&app).await;

    let (status, columns) = send(&app, get("/datatables/columns?key=people")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        columns,
        json!([{"data": "id", "title": "Id"}, {"data": "name", "title": "Name"}])
    );

    let (status, config) = send(&app, get("/datatables/config?key=people&id=grid1&style=wide")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["tableId"], "grid1");
    assert_eq!(config["tableClass"], "display");
    assert_eq!(config["attributes"], json!({"style": "wide"}));
    assert_eq!(config["serverSide"], true);

    let (status, _) = send(&app, get("/datatables/columns?key=missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_session() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/datatables/session")
        .header("x-session-id", SESSION)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(&app, get("/datatables/endpoint?key=people")).await;
    assert_eq!(body["error"], "An error occurred or invalid session key.");
}

#[tokio::test]
async fn test_create_session_then_register() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/datatables/session")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let session = body["session_id"].as_str().unwrap().to_string();
    assert_eq!(session.len(), 36);

    let request = Request::builder()
        .method("POST")
        .uri("/datatables/register")
        .header("x-session-id", session.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"handle": "mine", "source": {"type": "rows", "rows": []}}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session_id"], session.as_str());
}

#[tokio::test]
async fn test_remove_single_registration() {
    let app = app();
    register_people(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/datatables/registration?key=people")
        .header("x-session-id", SESSION)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(&app, get("/datatables/registrations")).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

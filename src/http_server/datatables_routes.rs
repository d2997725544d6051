//! DataTables HTTP Routes
//!
//! Page endpoint (GET and POST), registration, column/config lookup and
//! session lifecycle.

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datatables::registration::RegistrationInfo;
use crate::datatables::{
    ColumnDef, DataTables, DataTablesError, DataTablesResult, EndpointResponse, Handle,
    HttpMethod, RegisterOptions, RequestParams, SessionId, SourceSpec, TableCatalog,
    TableConfig, TableOptions, TableView,
};

use super::config::HttpServerConfig;

// ==================
// Shared State
// ==================

/// DataTables state shared across handlers
pub struct DataTablesState {
    pub datatables: DataTables,
    pub catalog: TableCatalog,
    pub endpoint_path: String,
    pub session_header: String,
}

impl DataTablesState {
    pub fn new(datatables: DataTables, catalog: TableCatalog, config: &HttpServerConfig) -> Self {
        Self {
            datatables: datatables.with_page_length(config.default_page_length),
            catalog,
            endpoint_path: config.endpoint_path.clone(),
            session_header: config.session_header.clone(),
        }
    }

    /// Session id carried by the request, if any
    fn session(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get(self.session_header.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(SessionId::new)
    }

    /// Session that owns nothing; lookups through it never resolve
    fn session_or_anonymous(&self, headers: &HeaderMap) -> SessionId {
        self.session(headers).unwrap_or_else(|| SessionId::new(""))
    }
}

impl Default for DataTablesState {
    fn default() -> Self {
        Self::new(
            DataTables::in_memory(),
            TableCatalog::new(),
            &HttpServerConfig::default(),
        )
    }
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Declarative source: `{"type": "rows", ...}` or `{"type": "table", ...}`
    pub source: Value,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub transform: Option<String>,
    #[serde(default)]
    pub http_method: HttpMethod,
    /// Render-time column overrides
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub options: TableOptions,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub session_id: SessionId,
    pub registration: RegistrationInfo,
    pub table: TableConfig,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationsResponse {
    pub registrations: Vec<RegistrationInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

// ==================
// Router
// ==================

/// Create DataTables routes; the endpoint is mounted at the configured path
pub fn datatables_routes(state: Arc<DataTablesState>) -> Router {
    let endpoint_path = state.endpoint_path.clone();

    Router::new()
        .route(&endpoint_path, get(endpoint_get_handler).post(endpoint_post_handler))
        .route("/datatables/register", post(register_handler))
        .route("/datatables/registrations", get(list_registrations_handler))
        .route(
            "/datatables/registration",
            delete(remove_registration_handler),
        )
        .route("/datatables/columns", get(columns_handler))
        .route("/datatables/config", get(config_handler))
        .route(
            "/datatables/session",
            post(create_session_handler).delete(invalidate_session_handler),
        )
        .with_state(state)
}

// ==================
// Handlers
// ==================

fn find_key(pairs: &[(String, String)]) -> Option<String> {
    pairs
        .iter()
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value.clone())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// GET: parameters in the query string
async fn endpoint_get_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    query: Result<Query<Vec<(String, String)>>, axum::extract::rejection::QueryRejection>,
) -> EndpointResponse {
    let Query(pairs) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return DataTablesError::InvalidRequest(rejection.body_text()).into();
        }
    };

    let key = find_key(&pairs);
    let params = RequestParams::from_pairs(pairs);
    let session = state.session_or_anonymous(&headers);

    state.datatables.endpoint(&session, key.as_deref(), &params)
}

/// POST: parameters in a form or JSON body, `key` in the query string or body
async fn endpoint_post_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    query: Option<Query<KeyQuery>>,
    request: Request,
) -> EndpointResponse {
    let session = state.session_or_anonymous(&headers);

    let decoded = if is_json(&headers) {
        decode_json_body(request).await
    } else {
        decode_form_body(request).await
    };

    match decoded {
        Ok((body_key, params)) => {
            let key = query.and_then(|Query(query)| query.key).or(body_key);
            state.datatables.endpoint(&session, key.as_deref(), &params)
        }
        Err(err) => err.into(),
    }
}

async fn decode_form_body(request: Request) -> DataTablesResult<(Option<String>, RequestParams)> {
    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
        .await
        .map_err(|rejection| DataTablesError::InvalidRequest(rejection.body_text()))?;

    Ok((find_key(&pairs), RequestParams::from_pairs(pairs)))
}

async fn decode_json_body(request: Request) -> DataTablesResult<(Option<String>, RequestParams)> {
    let Json(body) = Json::<Value>::from_request(request, &())
        .await
        .map_err(|rejection| DataTablesError::InvalidRequest(rejection.body_text()))?;

    let key = body.get("key").and_then(Value::as_str).map(str::to_string);
    Ok((key, RequestParams::from_json(&body)?))
}

async fn register_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> DataTablesResult<(StatusCode, Json<RegisterResponse>)> {
    // A registration is always owned by a named session
    let session = state.session(&headers).ok_or_else(|| {
        DataTablesError::InvalidRequest(format!("missing session header '{}'", state.session_header))
    })?;

    let source = SourceSpec::from_value(&request.source)?.resolve(&state.catalog)?;

    let mut options = RegisterOptions::new().http_method(request.http_method);
    if let Some(handle) = request.handle.as_deref() {
        options = options.handle(Handle::parse(handle)?);
    }
    if let Some(transform) = request.transform {
        options = options.transform(transform);
    }

    let registration = state.datatables.register(&session, source, options)?;
    let table = TableView::new(&registration)
        .columns(request.columns)
        .options(request.options)
        .config(&state.endpoint_path);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            session_id: session,
            registration: RegistrationInfo::from(registration.as_ref()),
            table,
        }),
    ))
}

async fn list_registrations_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
) -> DataTablesResult<Json<RegistrationsResponse>> {
    let session = state.session_or_anonymous(&headers);
    let registrations: Vec<RegistrationInfo> = state
        .datatables
        .registrations(&session)?
        .iter()
        .map(|registration| RegistrationInfo::from(registration.as_ref()))
        .collect();

    Ok(Json(RegistrationsResponse {
        total: registrations.len(),
        registrations,
    }))
}

async fn remove_registration_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
) -> DataTablesResult<Json<RemovedResponse>> {
    let session = state.session_or_anonymous(&headers);
    let registration = state.datatables.lookup(&session, query.key.as_deref())?;
    let removed = state.datatables.unregister(&session, registration.handle())?;

    Ok(Json(RemovedResponse {
        removed: usize::from(removed),
    }))
}

async fn columns_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
) -> DataTablesResult<Json<Vec<ColumnDef>>> {
    let session = state.session_or_anonymous(&headers);
    Ok(Json(state.datatables.columns(&session, query.key.as_deref())?))
}

/// Widget config; query parameters other than `key` are table options
async fn config_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> DataTablesResult<Json<TableConfig>> {
    let session = state.session_or_anonymous(&headers);
    let key = find_key(&pairs);
    let registration = state.datatables.lookup(&session, key.as_deref())?;

    let options = pairs
        .into_iter()
        .filter(|(name, _)| name != "key")
        .fold(TableOptions::new(), |options, (name, value)| options.set(name, value));

    Ok(Json(
        TableView::new(&registration)
            .options(options)
            .config(&state.endpoint_path),
    ))
}

/// Mint a session id for clients without one; nothing is stored until a
/// registration names it
async fn create_session_handler() -> (StatusCode, Json<SessionResponse>) {
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: SessionId::generate(),
        }),
    )
}

async fn invalidate_session_handler(
    State(state): State<Arc<DataTablesState>>,
    headers: HeaderMap,
) -> DataTablesResult<Json<RemovedResponse>> {
    let session = state
        .session(&headers)
        .ok_or(DataTablesError::MissingSessionKey)?;
    let removed = state.datatables.invalidate_session(&session)?;
    Ok(Json(RemovedResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_key() {
        let pairs = vec![
            ("draw".to_string(), "1".to_string()),
            ("key".to_string(), "users".to_string()),
        ];
        assert_eq!(find_key(&pairs).as_deref(), Some("users"));
        assert_eq!(find_key(&[]), None);
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(is_json(&headers));
    }

    #[test]
    fn test_session_header() {
        let state = DataTablesState::default();
        let mut headers = HeaderMap::new();
        assert!(state.session(&headers).is_none());

        headers.insert("x-session-id", "abc".parse().unwrap());
        assert_eq!(state.session(&headers), Some(SessionId::new("abc")));
    }
}

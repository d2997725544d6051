//! # Registrations
//!
//! A registration binds a data source, its derived columns and an optional
//! row-transform id under an opaque handle, scoped to one caller session.
//! Registrations are immutable once created.

use std::fmt;

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::column::ColumnDef;
use super::errors::{DataTablesError, DataTablesResult};
use super::source::DataSource;

/// Longest caller-supplied handle
pub const MAX_HANDLE_LEN: usize = 128;

/// Opaque identifier of a registration within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// 256 random bits, URL-safe base64
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Handle(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept a caller-supplied handle: 1..=128 chars of `[A-Za-z0-9_-]`
    pub fn parse(value: &str) -> DataTablesResult<Self> {
        if value.is_empty() || value.len() > MAX_HANDLE_LEN {
            return Err(DataTablesError::InvalidHandle(format!(
                "handle must be 1 to {} characters",
                MAX_HANDLE_LEN
            )));
        }

        if !value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(DataTablesError::InvalidHandle(
                "handle may only contain letters, digits, '_' and '-'".to_string(),
            ));
        }

        Ok(Handle(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller session that owns registrations
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// HTTP method the widget should use against the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Optional settings for `DataTables::register`
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Explicit handle; a random one is generated when absent
    pub handle: Option<Handle>,

    /// Row transform id, resolved through the transform registry
    pub transform: Option<String>,

    pub http_method: HttpMethod,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn transform(mut self, id: impl Into<String>) -> Self {
        self.transform = Some(id.into());
        self
    }

    pub fn http_method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }
}

/// A registered table instance
#[derive(Debug)]
pub struct Registration {
    handle: Handle,
    session: SessionId,
    source: DataSource,
    columns: Vec<ColumnDef>,
    transform: Option<String>,
    http_method: HttpMethod,
    created_at: DateTime<Utc>,
}

impl Registration {
    pub(crate) fn new(
        handle: Handle,
        session: SessionId,
        source: DataSource,
        columns: Vec<ColumnDef>,
        options: &RegisterOptions,
    ) -> Self {
        Self {
            handle,
            session,
            source,
            columns,
            transform: options.transform.clone(),
            http_method: options.http_method,
            created_at: Utc::now(),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Columns derived from the sample row at registration time
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn transform(&self) -> Option<&str> {
        self.transform.as_deref()
    }

    pub fn http_method(&self) -> HttpMethod {
        self.http_method
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Summary of a registration, safe to return to clients
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationInfo {
    pub handle: Handle,
    pub source: &'static str,
    pub columns: Vec<ColumnDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    pub http_method: HttpMethod,
    pub created_at: DateTime<Utc>,
}

impl From<&Registration> for RegistrationInfo {
    fn from(registration: &Registration) -> Self {
        Self {
            handle: registration.handle.clone(),
            source: registration.source.kind(),
            columns: registration.columns.clone(),
            transform: registration.transform.clone(),
            http_method: registration.http_method,
            created_at: registration.created_at,
        }
    }
}

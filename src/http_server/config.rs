//! HTTP Server Configuration
//!
//! Bind address, CORS, endpoint location and request defaults.

use serde::{Deserialize, Serialize};

use crate::datatables::params::DEFAULT_PAGE_LENGTH;
use crate::observability::Severity;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 54321)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Path of the page endpoint (default: "/datatables/endpoint")
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Header carrying the session id (default: "x-session-id")
    #[serde(default = "default_session_header")]
    pub session_header: String,

    /// Page length when a request carries none (default: 10)
    #[serde(default = "default_page_length")]
    pub default_page_length: usize,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    54321
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

fn default_endpoint_path() -> String {
    "/datatables/endpoint".to_string()
}

fn default_session_header() -> String {
    "x-session-id".to_string()
}

fn default_page_length() -> usize {
    DEFAULT_PAGE_LENGTH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            endpoint_path: default_endpoint_path(),
            session_header: default_session_header(),
            default_page_length: default_page_length(),
            log_level: default_log_level(),
        }
    }
}

impl HttpServerConfig {
    /// Create a new config with specified port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> Option<Severity> {
        Severity::parse(&self.log_level)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), String> {
        if !self.endpoint_path.starts_with('/') {
            return Err(format!(
                "endpoint_path must start with '/': '{}'",
                self.endpoint_path
            ));
        }

        if self.session_header.is_empty()
            || axum::http::HeaderName::from_bytes(self.session_header.as_bytes()).is_err()
        {
            return Err(format!("Invalid session_header: '{}'", self.session_header));
        }

        if self.default_page_length == 0 {
            return Err("default_page_length must be > 0".to_string());
        }

        if self.severity().is_none() {
            return Err(format!("Invalid log_level: '{}'", self.log_level));
        }

        Ok(())
    }
}

//! # HTTP Server Module
//!
//! axum server exposing the DataTables page endpoint and its companions.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `<endpoint_path>` - Page endpoint, GET and POST (default `/datatables/endpoint`)
//! - `/datatables/register` - Register a data source
//! - `/datatables/columns`, `/datatables/config` - Render metadata
//! - `/datatables/registration`, `/datatables/session` - Lifecycle

pub mod config;
pub mod datatables_routes;
pub mod health_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use datatables_routes::DataTablesState;
pub use server::HttpServer;

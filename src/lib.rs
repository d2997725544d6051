//! aerogrid - server-side adapter for the DataTables grid protocol
//!
//! Registers data sources (query descriptors or in-memory rows) under
//! per-session handles and answers the widget's page requests with
//! filtered, ordered, paginated responses.

pub mod cli;
pub mod datatables;
pub mod http_server;
pub mod observability;

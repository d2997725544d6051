//! CLI command implementations
//!
//! Startup sequence for `serve`:
//! 1. Configuration load and validation
//! 2. Log level applied
//! 3. Seed tables and transforms registered
//! 4. HTTP server bound

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::datatables::{
    DataTables, MemoryRegistrationStore, MemoryTable, Row, TableCatalog, TransformRegistry,
    TransformSpec,
};
use crate::http_server::{DataTablesState, HttpServer, HttpServerConfig};
use crate::observability::{log_event, Event, Logger};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Table seeded into the catalog at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSeed {
    pub name: String,

    /// Field allow-list; rows are projected onto it
    pub fields: Vec<String>,

    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub tables: Vec<TableSeed>,

    /// Row transforms by id
    #[serde(default)]
    pub transforms: BTreeMap<String, TransformSpec>,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        self.server.validate().map_err(CliError::config_error)?;

        let mut names = HashSet::new();
        for table in &self.tables {
            if table.name.is_empty() {
                return Err(CliError::config_error("Table name must not be empty"));
            }
            if !names.insert(table.name.as_str()) {
                return Err(CliError::config_error(format!(
                    "Duplicate table: '{}'",
                    table.name
                )));
            }
            if table.fields.is_empty() {
                return Err(CliError::config_error(format!(
                    "Table '{}' must declare at least one field",
                    table.name
                )));
            }

            let mut fields = HashSet::new();
            for field in &table.fields {
                if field.is_empty() || !fields.insert(field.as_str()) {
                    return Err(CliError::config_error(format!(
                        "Table '{}' has an empty or duplicate field: '{}'",
                        table.name, field
                    )));
                }
            }
        }

        if self.transforms.keys().any(|id| id.is_empty()) {
            return Err(CliError::config_error("Transform id must not be empty"));
        }

        Ok(())
    }
}

/// Seed tables and transforms into server state
pub fn build_state(config: &Config) -> CliResult<DataTablesState> {
    let mut catalog = TableCatalog::new();
    for seed in &config.tables {
        let table = MemoryTable::with_rows(&seed.name, seed.fields.clone(), seed.rows.clone())
            .map_err(|e| CliError::config_error(format!("Table '{}': {}", seed.name, e)))?;
        catalog.add(table);
    }

    let mut transforms = TransformRegistry::new();
    for (id, spec) in &config.transforms {
        transforms.register_spec(id.clone(), spec);
    }

    let datatables = DataTables::new(Arc::new(MemoryRegistrationStore::new()), transforms);
    Ok(DataTablesState::new(datatables, catalog, &config.server))
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load the configuration and serve until interrupted
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    if let Some(severity) = config.server.severity() {
        Logger::set_min_severity(severity);
    }

    let tables = config.tables.len().to_string();
    let transforms = config.transforms.len().to_string();
    log_event(
        Event::ConfigLoaded,
        &[
            ("path", &config_path.display().to_string()),
            ("tables", &tables),
            ("transforms", &transforms),
        ],
    );

    let state = build_state(&config)?;
    let server = HttpServer::with_state(config.server, Arc::new(state));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate a configuration file and report what it declares.
///
/// The outcome is written to stdout as JSON either way; a failure is also
/// returned so the process exits non-zero.
pub fn check_config(config_path: &Path) -> CliResult<()> {
    match describe_config(config_path) {
        Ok(report) => write_response(report),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

fn describe_config(config_path: &Path) -> CliResult<serde_json::Value> {
    let config = Config::load(config_path)?;
    let state = build_state(&config)?;

    Ok(json!({
        "valid": true,
        "addr": config.server.socket_addr(),
        "endpoint_path": config.server.endpoint_path,
        "tables": state.catalog.names(),
        "transforms": state.datatables.transforms().ids(),
    }))
}

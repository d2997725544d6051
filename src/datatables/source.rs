//! # Data Sources
//!
//! A data source is either a query descriptor or a materialized sequence of
//! rows. `SourceSpec` is the declarative JSON form a client or config file
//! uses to name one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::errors::{DataTablesError, DataTablesResult};
use super::filter::Condition;
use super::query::{MemoryTable, QueryDescriptor};
use super::Row;

/// Source of rows for a registration
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Database-backed query, re-evaluated on every request
    Query(Box<dyn QueryDescriptor>),

    /// Rows snapshotted at registration time
    Rows(Vec<Row>),
}

impl DataSource {
    pub fn query(query: impl QueryDescriptor + 'static) -> Self {
        DataSource::Query(Box::new(query))
    }

    pub fn rows(rows: Vec<Row>) -> Self {
        DataSource::Rows(rows)
    }

    /// Accept a JSON array of objects as in-memory rows
    pub fn from_value(value: Value) -> DataTablesResult<Self> {
        match value {
            Value::Array(items) => {
                let rows = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(row) => Ok(row),
                        other => Err(DataTablesError::UnsupportedSource(format!(
                            "row {} is {}, expected an object",
                            i,
                            json_type(&other)
                        ))),
                    })
                    .collect::<DataTablesResult<Vec<Row>>>()?;
                Ok(DataSource::Rows(rows))
            }
            other => Err(DataTablesError::UnsupportedSource(format!(
                "expected a query descriptor or an array of rows, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataSource::Query(_) => "query",
            DataSource::Rows(_) => "rows",
        }
    }

    /// The single row used to derive columns
    pub(crate) fn sample(&self) -> DataTablesResult<Option<Row>> {
        match self {
            DataSource::Query(query) => query.first(),
            DataSource::Rows(rows) => Ok(rows.first().cloned()),
        }
    }
}

/// Named tables available to query-backed sources
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: BTreeMap<String, Arc<MemoryTable>>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: MemoryTable) -> Arc<MemoryTable> {
        let table = Arc::new(table);
        self.tables
            .insert(table.name().to_string(), Arc::clone(&table));
        table
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MemoryTable>> {
        self.tables.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

/// Declarative data source
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Inline rows
    Rows { rows: Vec<Row> },

    /// Query over a catalog table, optionally pre-filtered
    Table {
        name: String,
        #[serde(default)]
        filter: Option<Condition>,
    },
}

impl SourceSpec {
    /// Decode, rejecting unknown source types as unsupported
    pub fn from_value(value: &Value) -> DataTablesResult<Self> {
        let kind = value.get("type").and_then(Value::as_str).ok_or_else(|| {
            DataTablesError::UnsupportedSource("source must declare a string 'type'".to_string())
        })?;

        if !matches!(kind, "rows" | "table") {
            return Err(DataTablesError::UnsupportedSource(format!(
                "unknown source type '{}'",
                kind
            )));
        }

        serde_json::from_value(value.clone())
            .map_err(|e| DataTablesError::UnsupportedSource(e.to_string()))
    }

    /// Resolve against the table catalog
    pub fn resolve(self, catalog: &TableCatalog) -> DataTablesResult<DataSource> {
        match self {
            SourceSpec::Rows { rows } => Ok(DataSource::Rows(rows)),
            SourceSpec::Table { name, filter } => {
                let table = catalog.get(&name).ok_or_else(|| {
                    DataTablesError::InvalidRequest(format!("unknown table '{}'", name))
                })?;

                let mut query = table.query();
                if let Some(condition) = filter {
                    if let Some(field) = condition
                        .fields()
                        .into_iter()
                        .find(|f| !table.fields().iter().any(|known| known == f))
                    {
                        return Err(DataTablesError::InvalidRequest(format!(
                            "filter references unknown field '{}'",
                            field
                        )));
                    }
                    query = query.filter(condition);
                }

                Ok(DataSource::query(query))
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> TableCatalog {
        let mut catalog = TableCatalog::new();
        let table = MemoryTable::new("users", vec!["id".to_string(), "name".to_string()]);
        catalog.add(table);
        catalog
    }

    #[test]
    fn test_rows_from_value() {
        let source = DataSource::from_value(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(source.kind(), "rows");
        assert_eq!(source.sample().unwrap().unwrap()["id"], 1);
    }

    #[test]
    fn test_unsupported_values() {
        assert!(matches!(
            DataSource::from_value(json!(42)),
            Err(DataTablesError::UnsupportedSource(_))
        ));
        assert!(matches!(
            DataSource::from_value(json!([{"id": 1}, "x"])),
            Err(DataTablesError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_spec_unknown_type() {
        let result = SourceSpec::from_value(&json!({"type": "csv", "path": "/tmp/x"}));
        assert!(matches!(result, Err(DataTablesError::UnsupportedSource(_))));

        let result = SourceSpec::from_value(&json!({"rows": []}));
        assert!(matches!(result, Err(DataTablesError::UnsupportedSource(_))));
    }

    #[test]
    fn test_spec_table_resolves_to_query() {
        let spec = SourceSpec::from_value(&json!({
            "type": "table",
            "name": "users",
            "filter": {"op": "like", "field": "name", "value": "a"}
        }))
        .unwrap();

        let source = spec.resolve(&catalog()).unwrap();
        assert_eq!(source.kind(), "query");
    }

    #[test]
    fn test_spec_filter_must_use_known_fields() {
        let spec = SourceSpec::from_value(&json!({
            "type": "table",
            "name": "users",
            "filter": {"op": "eq", "field": "password", "value": "x"}
        }))
        .unwrap();

        assert!(matches!(
            spec.resolve(&catalog()),
            Err(DataTablesError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_spec_unknown_table() {
        let spec = SourceSpec::from_value(&json!({"type": "table", "name": "orders"})).unwrap();
        assert!(spec.resolve(&catalog()).is_err());
    }
}

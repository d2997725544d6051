//! # Query Descriptors
//!
//! A query descriptor is the cloneable handle the translator drives for
//! query-backed sources: count, filter-AND composition, ordering and paginated
//! execution, plus the entity's declared field names used as the allow-list.
//!
//! `MemoryTable` / `MemoryQuery` is an in-process implementation. Rows live in
//! a shared table, so counts are evaluated at call time against the current
//! contents.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use super::errors::{DataTablesError, DataTablesResult};
use super::filter::Condition;
use super::params::{Page, SortDirection};
use super::Row;

/// Cloneable query over a named entity
pub trait QueryDescriptor: fmt::Debug + Send + Sync {
    /// Entity the query is bound to
    fn entity(&self) -> &str;

    /// Declared field names of the entity
    fn fields(&self) -> &[String];

    /// Number of rows the query currently matches
    fn count(&self) -> DataTablesResult<u64>;

    /// AND-compose a condition with the existing ones
    fn and_filter_where(&mut self, condition: Condition);

    /// Append a sort key after any existing ones
    fn add_order_by(&mut self, field: &str, direction: SortDirection);

    /// Execute and materialize one page
    fn fetch(&self, page: Page) -> DataTablesResult<Vec<Row>>;

    fn box_clone(&self) -> Box<dyn QueryDescriptor>;

    /// Whether `name` is a declared field
    fn has_field(&self, name: &str) -> bool {
        self.fields().iter().any(|f| f == name)
    }

    /// Single-row projection
    fn first(&self) -> DataTablesResult<Option<Row>> {
        Ok(self.fetch(Page::new(0, 1))?.into_iter().next())
    }
}

impl Clone for Box<dyn QueryDescriptor> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// In-process table backing `MemoryQuery`
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    fields: Vec<String>,
    rows: RwLock<Vec<Row>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Create a table and insert `rows`
    pub fn with_rows(
        name: impl Into<String>,
        fields: Vec<String>,
        rows: Vec<Row>,
    ) -> DataTablesResult<Self> {
        let table = Self::new(name, fields);
        for row in rows {
            table.insert(row)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Insert a row, projected onto the declared fields
    pub fn insert(&self, row: Row) -> DataTablesResult<()> {
        let projected: Row = self
            .fields
            .iter()
            .map(|f| (f.clone(), row.get(f).cloned().unwrap_or(Value::Null)))
            .collect();

        self.rows
            .write()
            .map_err(|_| DataTablesError::DataSource("table lock poisoned".to_string()))?
            .push(projected);
        Ok(())
    }

    pub fn len(&self) -> DataTablesResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> DataTablesResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Unfiltered query over this table
    pub fn query(self: &Arc<Self>) -> MemoryQuery {
        MemoryQuery {
            table: Arc::clone(self),
            conditions: Vec::new(),
            order: Vec::new(),
        }
    }

    fn read(&self) -> DataTablesResult<std::sync::RwLockReadGuard<'_, Vec<Row>>> {
        self.rows
            .read()
            .map_err(|_| DataTablesError::DataSource("table lock poisoned".to_string()))
    }
}

/// Query over a `MemoryTable`
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    table: Arc<MemoryTable>,
    conditions: Vec<Condition>,
    order: Vec<(String, SortDirection)>,
}

impl MemoryQuery {
    /// Builder form of `and_filter_where`, for base queries
    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder form of `add_order_by`
    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order.push((field.to_string(), direction));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[(String, SortDirection)] {
        &self.order
    }

    fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

impl QueryDescriptor for MemoryQuery {
    fn entity(&self) -> &str {
        self.table.name()
    }

    fn fields(&self) -> &[String] {
        self.table.fields()
    }

    fn count(&self) -> DataTablesResult<u64> {
        let rows = self.table.read()?;
        Ok(rows.iter().filter(|r| self.matches(r)).count() as u64)
    }

    fn and_filter_where(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    fn add_order_by(&mut self, field: &str, direction: SortDirection) {
        self.order.push((field.to_string(), direction));
    }

    fn fetch(&self, page: Page) -> DataTablesResult<Vec<Row>> {
        let mut rows: Vec<Row> = {
            let rows = self.table.read()?;
            rows.iter().filter(|r| self.matches(r)).cloned().collect()
        };

        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                for (field, direction) in &self.order {
                    let ordering = compare_values(a.get(field), b.get(field));
                    let ordering = match direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(page.slice(rows))
    }

    fn box_clone(&self) -> Box<dyn QueryDescriptor> {
        Box::new(self.clone())
    }
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string
/// - For same types, natural ordering
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let type_order = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };

            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                (Value::Number(a_n), Value::Number(b_n)) => {
                    let a_f = a_n.as_f64().unwrap_or(0.0);
                    let b_f = b_n.as_f64().unwrap_or(0.0);
                    a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                }
                (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                _ => Ordering::Equal,
            }
        }
    }
}

//! # Request Translator
//!
//! Turns a data source and a decoded page request into a response envelope.
//!
//! Both paths apply search, then sort, then pagination, so that
//! `records_filtered` counts the post-search, pre-pagination rows.
//!
//! Query-backed sources: ordering and search are restricted to the entity's
//! declared field names. A request column that names anything else is
//! dropped silently; the rest of the request still succeeds.
//!
//! In-memory sources: search applies to any searchable column, only the
//! first order entry is honored, and values compare as byte strings.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::observability::{clip, log_event, Event};

use super::errors::DataTablesResult;
use super::filter::{contains_ignore_case, Condition};
use super::params::{RequestParams, SortDirection, DEFAULT_PAGE_LENGTH};
use super::query::QueryDescriptor;
use super::response::DataTablesResponse;
use super::source::DataSource;
use super::transform::RowTransform;
use super::Row;

/// Translates page requests against a data source
#[derive(Debug, Clone, Copy)]
pub struct RequestTranslator {
    default_page_length: usize,
}

impl Default for RequestTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LENGTH)
    }
}

impl RequestTranslator {
    pub fn new(default_page_length: usize) -> Self {
        Self {
            default_page_length: default_page_length.max(1),
        }
    }

    pub fn default_page_length(&self) -> usize {
        self.default_page_length
    }

    /// Answer one page request. The source is never modified.
    pub fn process(
        &self,
        source: &DataSource,
        params: &RequestParams,
        transform: Option<&dyn RowTransform>,
    ) -> DataTablesResult<DataTablesResponse> {
        match source {
            DataSource::Query(query) => self.process_query(&**query, params, transform),
            DataSource::Rows(rows) => Ok(self.process_rows(rows, params, transform)),
        }
    }

    fn process_query(
        &self,
        base: &dyn QueryDescriptor,
        params: &RequestParams,
        transform: Option<&dyn RowTransform>,
    ) -> DataTablesResult<DataTablesResponse> {
        let records_total = base.count()?;

        let mut query = base.box_clone();
        apply_ordering(query.as_mut(), params);
        apply_searching(query.as_mut(), params);

        let records_filtered = query.count()?;

        let page = params.aligned_page(self.default_page_length);
        let rows = query.fetch(page)?;

        Ok(DataTablesResponse::new(
            params.draw,
            records_total,
            records_filtered,
            prepare_rows(rows, transform),
        ))
    }

    fn process_rows(
        &self,
        rows: &[Row],
        params: &RequestParams,
        transform: Option<&dyn RowTransform>,
    ) -> DataTablesResponse {
        let records_total = rows.len() as u64;

        let mut rows = search_rows(rows.to_vec(), params);
        order_rows(&mut rows, params);

        let records_filtered = rows.len() as u64;

        let page = params.exact_page(self.default_page_length);
        let rows = page.slice(rows);

        DataTablesResponse::new(
            params.draw,
            records_total,
            records_filtered,
            prepare_rows(rows, transform),
        )
    }
}

/// Apply every valid order entry, in request priority order.
///
/// Returns the number of sort keys applied.
pub fn apply_ordering(query: &mut dyn QueryDescriptor, params: &RequestParams) -> usize {
    let mut applied = 0;
    let mut rejected = FieldRejections::default();

    for order in &params.order {
        let Some(column) = params.column(order.column) else {
            continue;
        };
        if !column.orderable {
            continue;
        }
        if !query.has_field(&column.data) {
            rejected.record(&column.data);
            continue;
        }

        query.add_order_by(&column.data, order.dir);
        applied += 1;
    }

    rejected.report(Event::OrderFieldRejected, query.entity());
    applied
}

/// AND-compose an OR of substring matches over the searchable known fields.
///
/// Returns whether a condition was added.
pub fn apply_searching(query: &mut dyn QueryDescriptor, params: &RequestParams) -> bool {
    let Some(term) = params.search_value() else {
        return false;
    };

    let mut conditions = Vec::new();
    let mut rejected = FieldRejections::default();
    for column in params.columns.iter().filter(|c| c.searchable) {
        if query.has_field(&column.data) {
            conditions.push(Condition::like(column.data.as_str(), term));
        } else {
            rejected.record(&column.data);
        }
    }
    rejected.report(Event::SearchFieldRejected, query.entity());

    // No eligible column: no filter, rather than a filter matching nothing
    if conditions.is_empty() {
        return false;
    }

    query.and_filter_where(Condition::or(conditions));
    true
}

/// Keep rows where any searchable column's string value contains the term
pub fn search_rows(rows: Vec<Row>, params: &RequestParams) -> Vec<Row> {
    let Some(term) = params.search_value() else {
        return rows;
    };

    let fields: Vec<&str> = params
        .columns
        .iter()
        .filter(|c| c.searchable)
        .map(|c| c.data.as_str())
        .collect();

    rows.into_iter()
        .filter(|row| {
            fields.iter().any(|field| {
                row.get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| contains_ignore_case(text, term))
            })
        })
        .collect()
}

/// Stable single-key sort on the first order entry
pub fn order_rows(rows: &mut [Row], params: &RequestParams) {
    let Some(order) = params.order.first() else {
        return;
    };
    let Some(column) = params.column(order.column) else {
        return;
    };
    // The orderable flag binds on this path too, as on the query path
    if !column.orderable {
        return;
    }

    let field = column.data.as_str();
    rows.sort_by(|a, b| {
        let ordering = compare_bytes(a.get(field), b.get(field));
        match order.dir {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Request fields outside the allow-list, reported as one log line per request
#[derive(Debug, Default)]
struct FieldRejections<'a> {
    count: usize,
    first: Option<&'a str>,
}

impl<'a> FieldRejections<'a> {
    fn record(&mut self, field: &'a str) {
        self.count += 1;
        self.first.get_or_insert(field);
    }

    fn report(&self, event: Event, entity: &str) {
        let Some(first) = self.first else {
            return;
        };
        let count = self.count.to_string();
        log_event(
            event,
            &[("entity", entity), ("count", &count), ("first", clip(first))],
        );
    }
}

fn compare_bytes(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    sort_key(a).as_bytes().cmp(sort_key(b).as_bytes())
}

/// String form a value sorts by
fn sort_key(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(Value::Bool(true)) => Cow::Borrowed("1"),
        Some(other @ (Value::Array(_) | Value::Object(_))) => Cow::Owned(other.to_string()),
        Some(Value::Bool(false)) | Some(Value::Null) | None => Cow::Borrowed(""),
    }
}

/// Apply the row transform, or pass rows through unchanged
fn prepare_rows(rows: Vec<Row>, transform: Option<&dyn RowTransform>) -> Vec<Row> {
    match transform {
        Some(transform) => rows.into_iter().map(|row| transform.apply(row)).collect(),
        None => rows,
    }
}

//! # Request Parameter Decoding
//!
//! Decodes the grid widget's page request into `RequestParams`.
//!
//! Two encodings are accepted: the flat bracketed pairs the widget sends as a
//! query string or form body (`columns[0][data]=name`), and a JSON object with
//! the same structure. Decoding never fails on a malformed field; the field is
//! dropped or defaulted instead.

use std::collections::BTreeMap;

use serde_json::Value;

use super::errors::{DataTablesError, DataTablesResult};

/// Page length used when the request carries none
pub const DEFAULT_PAGE_LENGTH: usize = 10;

/// Highest column/order index accepted from a request
pub const MAX_COLUMN_INDEX: usize = 1024;

/// Sort direction for one order entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` in any case is descending, everything else ascending
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Global search term
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub value: String,
}

/// One requested sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParam {
    /// Index into `RequestParams::columns`
    pub column: usize,
    pub dir: SortDirection,
}

/// Client-side column declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnParam {
    pub data: String,
    pub searchable: bool,
    pub orderable: bool,
}

impl ColumnParam {
    pub fn new(data: impl Into<String>, searchable: bool, orderable: bool) -> Self {
        Self {
            data: data.into(),
            searchable,
            orderable,
        }
    }
}

/// Decoded page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    /// Echo token, 0 when absent or non-numeric
    pub draw: i64,

    /// Row offset, `None` when absent or empty
    pub start: Option<usize>,

    /// Page size, negative means "all rows"
    pub length: Option<i64>,

    pub search: Option<SearchParams>,

    pub order: Vec<OrderParam>,

    pub columns: Vec<ColumnParam>,
}

/// Rows to skip and take for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,

    /// `None` takes every remaining row
    pub limit: Option<usize>,
}

impl Page {
    /// Everything, unpaginated
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Apply to an already materialized sequence
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl RequestParams {
    /// Decode from bracketed key/value pairs (query string or form body)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = RequestParams::default();
        let mut search: Option<SearchParams> = None;
        let mut orders: BTreeMap<usize, PartialOrder> = BTreeMap::new();
        let mut columns: BTreeMap<usize, ColumnParam> = BTreeMap::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            let (base, segments) = split_key(key.as_ref());

            match (base, segments.as_slice()) {
                ("draw", []) => {
                    params.draw = parse_int_prefix(value).unwrap_or(0);
                }
                ("start", []) => {
                    params.start = parse_start(value);
                }
                ("length", []) => {
                    params.length = parse_int_prefix(value);
                }
                ("search", ["value"]) => {
                    search.get_or_insert_with(SearchParams::default).value = value.to_string();
                }
                ("order", [index, field]) => {
                    let Some(index) = parse_index(index) else {
                        continue;
                    };
                    let entry = orders.entry(index).or_default();
                    match *field {
                        "column" => entry.column = parse_int_prefix(value),
                        "dir" => entry.dir = SortDirection::parse(value),
                        _ => {}
                    }
                }
                ("columns", [index, field]) => {
                    let Some(index) = parse_index(index) else {
                        continue;
                    };
                    let column = columns.entry(index).or_default();
                    match *field {
                        "data" => column.data = value.to_string(),
                        "searchable" => column.searchable = value == "true",
                        "orderable" => column.orderable = value == "true",
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        params.search = search;
        params.order = orders.into_values().filter_map(PartialOrder::finish).collect();
        params.columns = dense_columns(columns);
        params
    }

    /// Decode from a JSON object with the same structure.
    ///
    /// Only a non-object body is rejected; each field is read on its own and
    /// falls back to its default when it has the wrong shape.
    pub fn from_json(value: &Value) -> DataTablesResult<Self> {
        let Some(body) = value.as_object() else {
            return Err(DataTablesError::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        };

        let search = body.get("search").and_then(Value::as_object).map(|s| SearchParams {
            value: s
                .get("value")
                .and_then(Scalar::from_value)
                .map(Scalar::into_text)
                .unwrap_or_default(),
        });

        let order = json_entries(body.get("order"))
            .filter_map(|entry| {
                let entry = entry.as_object()?;
                let column = Scalar::from_value(entry.get("column")?)?.as_int()?;
                let column = usize::try_from(column).ok().filter(|c| *c <= MAX_COLUMN_INDEX)?;
                Some(OrderParam {
                    column,
                    dir: entry
                        .get("dir")
                        .and_then(Value::as_str)
                        .map(SortDirection::parse)
                        .unwrap_or_default(),
                })
            })
            .collect();

        // Malformed entries stay as defaults so `columns[i]` keeps its index
        let columns = json_entries(body.get("columns"))
            .take(MAX_COLUMN_INDEX + 1)
            .map(|entry| {
                let flag = |name: &str| {
                    entry
                        .get(name)
                        .and_then(Scalar::from_value)
                        .is_some_and(|s| s.as_flag())
                };
                ColumnParam {
                    data: entry.get("data").map(column_data).unwrap_or_default(),
                    searchable: flag("searchable"),
                    orderable: flag("orderable"),
                }
            })
            .collect();

        let int = |name: &str| body.get(name).and_then(Scalar::from_value).and_then(|s| s.as_int());

        Ok(RequestParams {
            draw: int("draw").unwrap_or(0),
            start: int("start").map(|s| s.max(0) as usize),
            length: int("length"),
            search,
            order,
            columns,
        })
    }

    /// Non-empty global search term, if any
    pub fn search_value(&self) -> Option<&str> {
        self.search
            .as_ref()
            .map(|s| s.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Column declaration at `index`
    pub fn column(&self, index: usize) -> Option<&ColumnParam> {
        self.columns.get(index)
    }

    /// Effective page size; `None` disables pagination
    pub fn page_size(&self, default_length: usize) -> Option<usize> {
        match self.length {
            None | Some(0) => Some(default_length),
            Some(n) if n < 0 => None,
            Some(n) => Some(n as usize),
        }
    }

    /// Page aligned to a page boundary: index `floor(start / length)`
    pub fn aligned_page(&self, default_length: usize) -> Page {
        let Some(size) = self.page_size(default_length) else {
            return Page::all();
        };
        let index = match self.start {
            Some(start) if start > 0 => start / size,
            _ => 0,
        };
        Page::new(index * size, size)
    }

    /// Exact window `start..start + length`
    pub fn exact_page(&self, default_length: usize) -> Page {
        let offset = self.start.unwrap_or(0);
        match self.page_size(default_length) {
            Some(size) => Page::new(offset, size),
            None => Page {
                offset,
                limit: None,
            },
        }
    }
}

#[derive(Debug, Default)]
struct PartialOrder {
    column: Option<i64>,
    dir: SortDirection,
}

impl PartialOrder {
    fn finish(self) -> Option<OrderParam> {
        let column = usize::try_from(self.column?).ok()?;
        if column > MAX_COLUMN_INDEX {
            return None;
        }
        Some(OrderParam {
            column,
            dir: self.dir,
        })
    }
}

/// Fill index gaps so `columns[i]` keeps the client's numbering
fn dense_columns(columns: BTreeMap<usize, ColumnParam>) -> Vec<ColumnParam> {
    let len = columns.keys().next_back().map(|last| last + 1).unwrap_or(0);
    let mut dense = vec![ColumnParam::default(); len];
    for (index, column) in columns {
        dense[index] = column;
    }
    dense
}

/// Split `columns[0][data]` into `("columns", ["0", "data"])`
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let base = &key[..open];
    let mut segments = Vec::new();
    let mut rest = &key[open..];

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            break;
        };
        segments.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }

    (base, segments)
}

fn parse_index(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok().filter(|i| *i <= MAX_COLUMN_INDEX)
}

fn parse_start(value: &str) -> Option<usize> {
    if value.trim().is_empty() {
        return None;
    }
    Some(parse_int_prefix(value).unwrap_or(0).max(0) as usize)
}

/// Lenient integer conversion: whitespace, optional sign, leading digits
pub fn parse_int_prefix(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// ==================
// JSON Request Fields
// ==================

/// Elements of a JSON array; anything else has none
fn json_entries(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.as_slice())
        .unwrap_or_default()
        .iter()
}

/// Field name of a column; object-valued `data` names its `_` entry
fn column_data(value: &Value) -> String {
    let value = match value {
        Value::Object(map) => map.get("_").unwrap_or(&Value::Null),
        other => other,
    };
    Scalar::from_value(value)
        .map(Scalar::into_text)
        .unwrap_or_default()
}

/// Any JSON scalar the widget may send for a field
#[derive(Debug, Clone)]
enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// `None` for null, arrays and objects
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Scalar::Float(_) => None,
            Scalar::Bool(b) => Some(i64::from(*b)),
            Scalar::Text(s) => parse_int_prefix(s),
        }
    }

    fn as_flag(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Text(s) => s == "true",
            _ => false,
        }
    }

    fn into_text(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

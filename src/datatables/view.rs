//! # Table View
//!
//! Everything a renderer needs to draw the grid widget for a registration:
//! columns, table identity, extra attributes and the ajax endpoint.
//! No markup is produced here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::column::ColumnDef;
use super::registration::{HttpMethod, Registration};

/// Default CSS class of the table element
pub const DEFAULT_TABLE_CLASS: &str = "display";

/// Render-time options: `id`, `class`, any other key is an extra attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableOptions(BTreeMap<String, String>);

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    pub fn class(&self) -> Option<&str> {
        self.get("class")
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Options other than `id` and `class`
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "class")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Ajax settings handed to the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AjaxConfig {
    pub url: String,

    #[serde(rename = "type")]
    pub method: HttpMethod,
}

/// Serializable widget configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    pub table_id: String,
    pub table_class: String,
    pub attributes: BTreeMap<String, String>,
    pub processing: bool,
    pub server_side: bool,
    pub ajax: AjaxConfig,
    pub columns: Vec<ColumnDef>,
}

/// Render-time view over one registration
#[derive(Debug)]
pub struct TableView<'a> {
    registration: &'a Registration,
    columns: Vec<ColumnDef>,
    options: TableOptions,
}

impl<'a> TableView<'a> {
    pub fn new(registration: &'a Registration) -> Self {
        Self {
            registration,
            columns: Vec::new(),
            options: TableOptions::default(),
        }
    }

    /// Override the published columns; an empty list keeps them
    pub fn columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.columns = columns;
        self
    }

    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Endpoint URL carrying the registration handle
    pub fn endpoint_url(&self, endpoint_path: &str) -> String {
        let separator = if endpoint_path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}key={}",
            endpoint_path,
            separator,
            self.registration.handle()
        )
    }

    pub fn config(&self, endpoint_path: &str) -> TableConfig {
        let columns = if self.columns.is_empty() {
            self.registration.columns().to_vec()
        } else {
            self.columns.clone()
        };

        TableConfig {
            table_id: self
                .options
                .id()
                .map(str::to_string)
                .unwrap_or_else(|| self.registration.handle().to_string()),
            table_class: self
                .options
                .class()
                .unwrap_or(DEFAULT_TABLE_CLASS)
                .to_string(),
            attributes: self.options.attributes(),
            processing: true,
            server_side: true,
            ajax: AjaxConfig {
                url: self.endpoint_url(endpoint_path),
                method: self.registration.http_method(),
            },
            columns,
        }
    }
}

//! # DataTables
//!
//! Server-side adapter for the DataTables grid protocol.
//!
//! A caller registers a data source (a query descriptor or a list of rows)
//! and gets back a handle. Page requests carrying that handle are translated
//! into filtered, ordered, paginated responses of the form
//! `{draw, recordsTotal, recordsFiltered, data}`.
//!
//! ## Properties
//!
//! - `recordsFiltered <= recordsTotal`
//! - `data.len() <= length` when a page length applies
//! - Client field names only reach a query through the source's allow-list
//! - Registrations are scoped to the session that created them

pub mod column;
pub mod component;
pub mod errors;
pub mod filter;
pub mod params;
pub mod query;
pub mod registration;
pub mod response;
pub mod source;
pub mod store;
pub mod transform;
pub mod translator;
pub mod view;

/// One data row: field name to value, in insertion order
pub type Row = serde_json::Map<String, serde_json::Value>;

pub use column::ColumnDef;
pub use component::DataTables;
pub use errors::{DataTablesError, DataTablesResult};
pub use filter::Condition;
pub use params::{RequestParams, SortDirection};
pub use query::{MemoryQuery, MemoryTable, QueryDescriptor};
pub use registration::{Handle, HttpMethod, RegisterOptions, Registration, SessionId};
pub use response::{DataTablesResponse, EndpointResponse, ErrorResponse};
pub use source::{DataSource, SourceSpec, TableCatalog};
pub use store::{MemoryRegistrationStore, RegistrationStore};
pub use transform::{RowTransform, TransformRegistry, TransformSpec};
pub use translator::RequestTranslator;
pub use view::{TableConfig, TableOptions, TableView};

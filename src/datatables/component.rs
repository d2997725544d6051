//! # DataTables Component
//!
//! Entry point tying registration, storage and translation together.
//!
//! ```ignore
//! let datatables = DataTables::in_memory();
//! let registration = datatables.register(&session, DataSource::rows(rows), RegisterOptions::new())?;
//!
//! // later, per page request
//! let response = datatables.endpoint(&session, Some(registration.handle().as_str()), &params);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::observability::{log_event, Event};

use super::column::{derive_columns, ColumnDef};
use super::errors::{DataTablesError, DataTablesResult};
use super::params::RequestParams;
use super::registration::{Handle, RegisterOptions, Registration, SessionId};
use super::response::{DataTablesResponse, EndpointResponse};
use super::source::DataSource;
use super::store::{MemoryRegistrationStore, RegistrationStore};
use super::transform::{RowTransform, TransformRegistry};
use super::translator::RequestTranslator;

/// Registers data sources and answers page requests against them
pub struct DataTables {
    store: Arc<dyn RegistrationStore>,
    transforms: TransformRegistry,
    translator: RequestTranslator,
}

impl DataTables {
    pub fn new(store: Arc<dyn RegistrationStore>, transforms: TransformRegistry) -> Self {
        Self {
            store,
            transforms,
            translator: RequestTranslator::default(),
        }
    }

    /// In-process store, no transforms
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryRegistrationStore::new()),
            TransformRegistry::new(),
        )
    }

    /// Page length used when a request carries none
    pub fn with_page_length(mut self, length: usize) -> Self {
        self.translator = RequestTranslator::new(length);
        self
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    pub fn translator(&self) -> &RequestTranslator {
        &self.translator
    }

    /// Register a data source for `session`.
    ///
    /// Columns are derived from one sample row, after the row transform
    /// when one is set. An empty source yields no columns.
    pub fn register(
        &self,
        session: &SessionId,
        source: DataSource,
        options: RegisterOptions,
    ) -> DataTablesResult<Arc<Registration>> {
        match self.prepare(session, source, options) {
            Ok(registration) => {
                self.store.put(Arc::clone(&registration))?;

                let columns = registration.columns().len().to_string();
                log_event(
                    Event::RegistrationCreated,
                    &[
                        ("handle", &registration.handle().fingerprint()),
                        ("source", registration.source().kind()),
                        ("columns", &columns),
                    ],
                );
                Ok(registration)
            }
            Err(err) => {
                log_event(Event::RegistrationRejected, &[("reason", &err.to_string())]);
                Err(err)
            }
        }
    }

    fn prepare(
        &self,
        session: &SessionId,
        source: DataSource,
        options: RegisterOptions,
    ) -> DataTablesResult<Arc<Registration>> {
        if let DataSource::Query(query) = &source {
            if query.fields().is_empty() {
                return Err(DataTablesError::EmptyFieldAllowList(
                    query.entity().to_string(),
                ));
            }
        }

        let transform = options
            .transform
            .as_deref()
            .map(|id| self.resolve_transform(id))
            .transpose()?;

        let sample = source
            .sample()?
            .map(|row| match &transform {
                Some(transform) => transform.apply(row),
                None => row,
            });
        let columns = derive_columns(sample.as_ref());

        let handle = options.handle.clone().unwrap_or_else(Handle::generate);

        Ok(Arc::new(Registration::new(
            handle,
            session.clone(),
            source,
            columns,
            &options,
        )))
    }

    fn resolve_transform(&self, id: &str) -> DataTablesResult<Arc<dyn RowTransform>> {
        self.transforms
            .get(id)
            .ok_or_else(|| DataTablesError::UnknownTransform(id.to_string()))
    }

    /// Resolve the handle carried by a request
    pub fn lookup(
        &self,
        session: &SessionId,
        key: Option<&str>,
    ) -> DataTablesResult<Arc<Registration>> {
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(DataTablesError::MissingSessionKey)?;

        // A malformed key cannot name a registration
        let handle = Handle::parse(key).map_err(|_| DataTablesError::RegistrationNotFound)?;

        self.store
            .get(session, &handle)?
            .ok_or(DataTablesError::RegistrationNotFound)
    }

    /// Answer one page request for a resolved registration
    pub fn process(
        &self,
        registration: &Registration,
        params: &RequestParams,
    ) -> DataTablesResult<DataTablesResponse> {
        let transform = registration
            .transform()
            .map(|id| self.resolve_transform(id))
            .transpose()?;

        self.translator
            .process(registration.source(), params, transform.as_deref())
    }

    /// Lookup then process; every failure becomes the error envelope
    pub fn endpoint(
        &self,
        session: &SessionId,
        key: Option<&str>,
        params: &RequestParams,
    ) -> EndpointResponse {
        let started = Instant::now();

        let registration = match self.lookup(session, key) {
            Ok(registration) => registration,
            Err(err) => {
                log_event(Event::HandleUnresolved, &[("reason", &err.to_string())]);
                return EndpointResponse::from(err);
            }
        };

        let fingerprint = registration.handle().fingerprint();
        match self.process(&registration, params) {
            Ok(response) => {
                let elapsed = started.elapsed().as_micros().to_string();
                let filtered = response.records_filtered.to_string();
                log_event(
                    Event::RequestProcessed,
                    &[
                        ("handle", &fingerprint),
                        ("records_filtered", &filtered),
                        ("elapsed_us", &elapsed),
                    ],
                );
                EndpointResponse::from(response)
            }
            Err(err) => {
                log_event(
                    Event::DataSourceFailed,
                    &[("handle", &fingerprint), ("reason", &err.to_string())],
                );
                EndpointResponse::from(err)
            }
        }
    }

    /// Published columns of a registration
    pub fn columns(&self, session: &SessionId, key: Option<&str>) -> DataTablesResult<Vec<ColumnDef>> {
        Ok(self.lookup(session, key)?.columns().to_vec())
    }

    pub fn registrations(&self, session: &SessionId) -> DataTablesResult<Vec<Arc<Registration>>> {
        self.store.list(session)
    }

    pub fn unregister(&self, session: &SessionId, handle: &Handle) -> DataTablesResult<bool> {
        self.store.remove(session, handle)
    }

    /// Drop every registration of a session
    pub fn invalidate_session(&self, session: &SessionId) -> DataTablesResult<usize> {
        let dropped = self.store.invalidate_session(session)?;
        log_event(
            Event::SessionInvalidated,
            &[("registrations", &dropped.to_string())],
        );
        Ok(dropped)
    }
}

impl Default for DataTables {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for DataTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTables")
            .field("transforms", &self.transforms)
            .field("translator", &self.translator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatables::query::MemoryTable;
    use crate::datatables::transform::RenameFields;
    use crate::datatables::Row;
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn session() -> SessionId {
        SessionId::new("session-1")
    }

    #[test]
    fn test_register_derives_columns() {
        let datatables = DataTables::in_memory();
        let registration = datatables
            .register(
                &session(),
                DataSource::rows(vec![row(json!({"id": 1, "first_name": "Ann"}))]),
                RegisterOptions::new(),
            )
            .unwrap();

        assert_eq!(
            registration.columns(),
            &[
                ColumnDef::new("id", "Id"),
                ColumnDef::new("first_name", "First name")
            ]
        );
    }

    #[test]
    fn test_register_columns_follow_transform() {
        let mut transforms = TransformRegistry::new();
        transforms.register("rename", RenameFields::default().rename("first_name", "name"));
        let datatables = DataTables::new(Arc::new(MemoryRegistrationStore::new()), transforms);

        let registration = datatables
            .register(
                &session(),
                DataSource::rows(vec![row(json!({"first_name": "Ann"}))]),
                RegisterOptions::new().transform("rename"),
            )
            .unwrap();

        assert_eq!(registration.columns(), &[ColumnDef::new("name", "Name")]);
    }

    #[test]
    fn test_register_empty_source() {
        let datatables = DataTables::in_memory();
        let registration = datatables
            .register(&session(), DataSource::rows(Vec::new()), RegisterOptions::new())
            .unwrap();
        assert!(registration.columns().is_empty());
    }

    #[test]
    fn test_register_unknown_transform() {
        let datatables = DataTables::in_memory();
        let result = datatables.register(
            &session(),
            DataSource::rows(Vec::new()),
            RegisterOptions::new().transform("nope"),
        );
        assert!(matches!(result, Err(DataTablesError::UnknownTransform(_))));
    }

    #[test]
    fn test_register_query_requires_fields() {
        let table = Arc::new(MemoryTable::new("anything", Vec::new()));
        let datatables = DataTables::in_memory();

        let result = datatables.register(
            &session(),
            DataSource::query(table.query()),
            RegisterOptions::new(),
        );
        assert!(matches!(result, Err(DataTablesError::EmptyFieldAllowList(_))));
    }

    #[test]
    fn test_explicit_handle_replaces_previous() {
        let datatables = DataTables::in_memory();
        let handle = Handle::parse("users").unwrap();

        datatables
            .register(
                &session(),
                DataSource::rows(vec![row(json!({"a": 1}))]),
                RegisterOptions::new().handle(handle.clone()),
            )
            .unwrap();
        datatables
            .register(
                &session(),
                DataSource::rows(vec![row(json!({"b": 1}))]),
                RegisterOptions::new().handle(handle),
            )
            .unwrap();

        let columns = datatables.columns(&session(), Some("users")).unwrap();
        assert_eq!(columns, vec![ColumnDef::new("b", "B")]);
        assert_eq!(datatables.registrations(&session()).unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_errors() {
        let datatables = DataTables::in_memory();

        assert!(matches!(
            datatables.lookup(&session(), None),
            Err(DataTablesError::MissingSessionKey)
        ));
        assert!(matches!(
            datatables.lookup(&session(), Some("")),
            Err(DataTablesError::MissingSessionKey)
        ));
        assert!(matches!(
            datatables.lookup(&session(), Some("../../etc")),
            Err(DataTablesError::RegistrationNotFound)
        ));
        assert!(matches!(
            datatables.lookup(&session(), Some("missing")),
            Err(DataTablesError::RegistrationNotFound)
        ));
    }

    #[test]
    fn test_endpoint_unknown_handle_is_error_envelope() {
        let datatables = DataTables::in_memory();
        let response = datatables.endpoint(&session(), Some("missing"), &RequestParams::default());
        assert!(response.is_error());
    }

    #[test]
    fn test_other_session_cannot_resolve() {
        let datatables = DataTables::in_memory();
        let registration = datatables
            .register(&session(), DataSource::rows(Vec::new()), RegisterOptions::new())
            .unwrap();

        let other = SessionId::new("session-2");
        let response = datatables.endpoint(
            &other,
            Some(registration.handle().as_str()),
            &RequestParams::default(),
        );
        assert!(response.is_error());
    }

    #[test]
    fn test_invalidate_session() {
        let datatables = DataTables::in_memory();
        let registration = datatables
            .register(&session(), DataSource::rows(Vec::new()), RegisterOptions::new())
            .unwrap();

        assert_eq!(datatables.invalidate_session(&session()).unwrap(), 1);
        let response = datatables.endpoint(
            &session(),
            Some(registration.handle().as_str()),
            &RequestParams::default(),
        );
        assert!(response.is_error());
    }
}

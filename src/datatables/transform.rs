//! # Row Transforms
//!
//! A row transform reshapes each source row before it is sent to the client.
//! Registrations refer to transforms by string id; the functions themselves
//! live in a `TransformRegistry` owned by the process, so nothing executable
//! is ever stored with session state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Row;

/// Maps one source row to the row shape sent to the client
pub trait RowTransform: Send + Sync {
    fn apply(&self, row: Row) -> Row;
}

impl<F> RowTransform for F
where
    F: Fn(Row) -> Row + Send + Sync,
{
    fn apply(&self, row: Row) -> Row {
        self(row)
    }
}

/// Renames keys in place, leaving other keys untouched
#[derive(Debug, Clone, Default)]
pub struct RenameFields {
    renames: BTreeMap<String, String>,
}

impl RenameFields {
    pub fn new(renames: BTreeMap<String, String>) -> Self {
        Self { renames }
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }
}

impl RowTransform for RenameFields {
    fn apply(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(key, value)| match self.renames.get(&key) {
                Some(renamed) => (renamed.clone(), value),
                None => (key, value),
            })
            .collect()
    }
}

/// Keeps only the listed fields, in listed order
#[derive(Debug, Clone, Default)]
pub struct SelectFields {
    fields: Vec<String>,
}

impl SelectFields {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

impl RowTransform for SelectFields {
    fn apply(&self, row: Row) -> Row {
        self.fields
            .iter()
            .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
            .collect()
    }
}

/// Declarative transform, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformSpec {
    Rename { fields: BTreeMap<String, String> },
    Select { fields: Vec<String> },
}

impl TransformSpec {
    pub fn build(&self) -> Arc<dyn RowTransform> {
        match self {
            TransformSpec::Rename { fields } => Arc::new(RenameFields::new(fields.clone())),
            TransformSpec::Select { fields } => Arc::new(SelectFields::new(fields.clone())),
        }
    }
}

/// Transforms addressable by id
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn RowTransform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a transform under `id`
    pub fn register(&mut self, id: impl Into<String>, transform: impl RowTransform + 'static) {
        self.transforms.insert(id.into(), Arc::new(transform));
    }

    pub fn register_spec(&mut self, id: impl Into<String>, spec: &TransformSpec) {
        self.transforms.insert(id.into(), spec.build());
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn RowTransform>> {
        self.transforms.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transforms.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_rename_keeps_position() {
        let transform = RenameFields::default().rename("name", "full_name");
        let out = transform.apply(row(json!({"id": 1, "name": "ann", "age": 3})));

        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, vec!["id", "full_name", "age"]);
        assert_eq!(out["full_name"], "ann");
    }

    #[test]
    fn test_select_fields() {
        let transform = SelectFields::new(vec!["name".to_string(), "missing".to_string()]);
        let out = transform.apply(row(json!({"id": 1, "name": "ann"})));
        assert_eq!(out, row(json!({"name": "ann"})));
    }

    #[test]
    fn test_closure_transform() {
        let mut registry = TransformRegistry::new();
        registry.register("upper", |mut row: Row| {
            if let Some(Value::String(name)) = row.get_mut("name") {
                *name = name.to_uppercase();
            }
            row
        });

        let transform = registry.get("upper").unwrap();
        let out = transform.apply(row(json!({"name": "ann"})));
        assert_eq!(out["name"], "ANN");
        assert!(registry.get("lower").is_none());
    }

    #[test]
    fn test_spec_from_config() {
        let spec: TransformSpec =
            serde_json::from_value(json!({"type": "rename", "fields": {"a": "b"}})).unwrap();

        let mut registry = TransformRegistry::new();
        registry.register_spec("a_to_b", &spec);

        assert_eq!(registry.ids(), vec!["a_to_b"]);
        let out = registry.get("a_to_b").unwrap().apply(row(json!({"a": 1})));
        assert_eq!(out, row(json!({"b": 1})));
    }
}

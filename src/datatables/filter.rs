//! # Filter Conditions
//!
//! Predicate tree handed to a query descriptor's filter-AND composition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Row;

/// A filter condition over one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Case-insensitive substring match on a string field
    Like { field: String, value: String },

    /// Exact equality
    Eq { field: String, value: Value },

    /// Every condition holds
    And { conditions: Vec<Condition> },

    /// At least one condition holds
    Or { conditions: Vec<Condition> },
}

impl Condition {
    /// Create a case-insensitive substring condition
    pub fn like(field: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Like {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an equality condition
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Condition::Eq {
            field: field.into(),
            value,
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { conditions }
    }

    /// Check if a row satisfies this condition
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Condition::Like { field, value } => row
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| contains_ignore_case(text, value)),
            Condition::Eq { field, value } => row.get(field) == Some(value),
            Condition::And { conditions } => conditions.iter().all(|c| c.matches(row)),
            Condition::Or { conditions } => conditions.iter().any(|c| c.matches(row)),
        }
    }

    /// Field names referenced anywhere in the tree
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Condition::Like { field, .. } | Condition::Eq { field, .. } => vec![field.as_str()],
            Condition::And { conditions } | Condition::Or { conditions } => {
                conditions.iter().flat_map(Condition::fields).collect()
            }
        }
    }
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

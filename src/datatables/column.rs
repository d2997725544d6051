//! Column definitions published to the grid widget.

use serde::{Deserialize, Serialize};

use super::Row;

/// One published column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Field name in each data row
    pub data: String,

    /// Display label
    pub title: String,
}

impl ColumnDef {
    pub fn new(data: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            title: title.into(),
        }
    }

    /// Column titled after its field: `first_name` becomes `First name`
    pub fn from_field(field: &str) -> Self {
        Self::new(field, title_for(field))
    }
}

/// Columns for every key of the sample row, in key order
pub fn derive_columns(sample: Option<&Row>) -> Vec<ColumnDef> {
    sample
        .map(|row| row.keys().map(|k| ColumnDef::from_field(k)).collect())
        .unwrap_or_default()
}

fn title_for(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_titles() {
        assert_eq!(title_for("first_name"), "First name");
        assert_eq!(title_for("id"), "Id");
        assert_eq!(title_for("_private"), " private");
        assert_eq!(title_for(""), "");
    }

    #[test]
    fn test_derive_columns_follows_row_keys() {
        let row = json!({"id": 1, "created_at": "2024-01-01"});
        let columns = derive_columns(row.as_object());

        assert_eq!(
            columns,
            vec![
                ColumnDef::new("id", "Id"),
                ColumnDef::new("created_at", "Created at"),
            ]
        );
    }

    #[test]
    fn test_no_sample_no_columns() {
        assert!(derive_columns(None).is_empty());
    }
}

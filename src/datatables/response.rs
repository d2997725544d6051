//! # Response Envelopes
//!
//! Wire shapes returned to the grid widget.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::errors::DataTablesError;
use super::Row;

/// Page of data for one draw request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTablesResponse {
    /// Echo of the request's draw counter
    pub draw: i64,

    /// Source cardinality with no filter applied
    pub records_total: u64,

    /// Cardinality after search, before pagination
    pub records_filtered: u64,

    pub data: Vec<Row>,
}

impl DataTablesResponse {
    pub fn new(draw: i64, records_total: u64, records_filtered: u64, data: Vec<Row>) -> Self {
        Self {
            draw,
            records_total,
            records_filtered,
            data,
        }
    }
}

/// Error envelope; the client tells it apart by the absence of `data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl From<DataTablesError> for ErrorResponse {
    fn from(err: DataTablesError) -> Self {
        Self::new(err.to_string())
    }
}

/// Whatever the page endpoint answers with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EndpointResponse {
    Data(DataTablesResponse),
    Error(ErrorResponse),
}

impl EndpointResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, EndpointResponse::Error(_))
    }

    pub fn data(&self) -> Option<&DataTablesResponse> {
        match self {
            EndpointResponse::Data(response) => Some(response),
            EndpointResponse::Error(_) => None,
        }
    }
}

impl From<DataTablesResponse> for EndpointResponse {
    fn from(response: DataTablesResponse) -> Self {
        EndpointResponse::Data(response)
    }
}

impl From<DataTablesError> for EndpointResponse {
    fn from(err: DataTablesError) -> Self {
        EndpointResponse::Error(ErrorResponse::from(err))
    }
}

// Always 200: the widget reads `error` from the JSON body.
impl IntoResponse for EndpointResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_envelope_serialization() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        let response = DataTablesResponse::new(3, 10, 4, vec![row]);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["draw"], 3);
        assert_eq!(json["recordsTotal"], 10);
        assert_eq!(json["recordsFiltered"], 4);
        assert_eq!(json["data"][0]["id"], 1);
    }

    #[test]
    fn test_error_envelope_has_no_data() {
        let response = EndpointResponse::from(DataTablesError::RegistrationNotFound);
        assert!(response.is_error());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"error": "An error occurred or invalid session key."}));
        assert!(json.get("data").is_none());
    }
}

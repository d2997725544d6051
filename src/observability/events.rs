//! Observable events
//!
//! Events are explicit and typed; each carries its default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in aerogrid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Server lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// HTTP server bound and accepting requests
    Serving,
    /// Server stopped
    ShutdownComplete,

    // Registrations
    /// Registration stored under a handle
    RegistrationCreated,
    /// Registration attempt rejected
    RegistrationRejected,
    /// All registrations of a session dropped
    SessionInvalidated,

    // Page requests
    /// Page request translated and answered
    RequestProcessed,
    /// Handle missing or not found in the session
    HandleUnresolved,
    /// Order entry dropped: column not orderable or not a known field
    OrderFieldRejected,
    /// Search column dropped: not a known field
    SearchFieldRejected,
    /// Count or fetch against the data source failed
    DataSourceFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "AEROGRID_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::RegistrationCreated => "REGISTRATION_CREATED",
            Event::RegistrationRejected => "REGISTRATION_REJECTED",
            Event::SessionInvalidated => "SESSION_INVALIDATED",

            Event::RequestProcessed => "REQUEST_PROCESSED",
            Event::HandleUnresolved => "HANDLE_UNRESOLVED",
            Event::OrderFieldRejected => "ORDER_FIELD_REJECTED",
            Event::SearchFieldRejected => "SEARCH_FIELD_REJECTED",
            Event::DataSourceFailed => "DATA_SOURCE_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RequestProcessed => Severity::Trace,
            Event::RegistrationRejected
            | Event::HandleUnresolved
            | Event::OrderFieldRejected
            | Event::SearchFieldRejected => Severity::Warn,
            Event::DataSourceFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

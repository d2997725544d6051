//! Observability for aerogrid
//!
//! Structured JSON logging of typed events.
//!
//! # Usage
//!
//! ```ignore
//! use aerogrid::observability::{log_event, Event};
//!
//! log_event(Event::RegistrationCreated, &[("handle", &handle.fingerprint())]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

/// Longest request-supplied value copied into a log line
const MAX_LOGGED_VALUE: usize = 64;

/// Clip untrusted input before it is logged
pub fn clip(value: &str) -> &str {
    match value.char_indices().nth(MAX_LOGGED_VALUE) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::Serving, &[("addr", "127.0.0.1:0")]);
        log_event(Event::RequestProcessed, &[]);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("name"), "name");
        assert_eq!(clip(&"é".repeat(100)).chars().count(), MAX_LOGGED_VALUE);
    }
}

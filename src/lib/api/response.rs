//! This module declares the completion events a request can end with and
//! the ways they are reported.
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::{info, warn};

use super::SubmitError;

/// A response was received. Any status code counts, including errors.
#[derive(Debug)]
pub struct LoadEvent {
    pub url: String,
    pub status: StatusCode,
    /// The raw response body, read whole and never parsed. There is no size
    /// limit, so a large response is held in memory in full.
    pub body: String,
    pub dispatched_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// The request never produced a response.
#[derive(Debug)]
pub struct ErrorEvent {
    pub url: String,
    pub error: SubmitError,
    pub dispatched_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// The single terminal outcome of a dispatched request.
#[derive(Debug)]
pub enum Outcome {
    Load(LoadEvent),
    Error(ErrorEvent),
}

impl Outcome {
    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Load(event) => &event.url,
            Self::Error(event) => &event.url,
        }
    }

    /// Time between dispatching the request and its completion.
    pub fn elapsed(&self) -> chrono::Duration {
        let (dispatched_at, completed_at) = match self {
            Self::Load(event) => (event.dispatched_at, event.completed_at),
            Self::Error(event) => (event.dispatched_at, event.completed_at),
        };

        completed_at.signed_duration_since(dispatched_at)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(event) => {
                write!(f, "load: {} {}", event.url, event.status)?;

                if !event.body.is_empty() {
                    write!(f, "\n{}", event.body.trim_end())?;
                }

                Ok(())
            }
            Self::Error(event) => write!(f, "error: {} {}", event.url, event.error),
        }
    }
}

/// Receives the outcome of a dispatched request. Reporting consumes the
/// reporter, so every request is reported exactly once.
pub trait Report: Send + 'static {
    fn report(self, outcome: Outcome);
}

impl<F> Report for F
where
    F: FnOnce(Outcome) + Send + 'static,
{
    fn report(self, outcome: Outcome) {
        self(outcome)
    }
}

/// Writes every outcome to the log and then drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReport;

impl LogReport {
    pub fn log(&self, outcome: &Outcome) {
        let elapsed_ms = outcome.elapsed().num_milliseconds();

        match outcome {
            Outcome::Load(event) => info!(
                url = %event.url,
                status = %event.status,
                elapsed_ms,
                "request loaded"
            ),
            Outcome::Error(event) => warn!(
                url = %event.url,
                error = %event.error,
                elapsed_ms,
                "request failed"
            ),
        }
    }
}

impl Report for LogReport {
    fn report(self, outcome: Outcome) {
        self.log(&outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    /// Collects formatted log lines written by a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged(outcome: &Outcome) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || LogReport.log(outcome));

        let bytes = captured.0.lock().unwrap().clone();

        String::from_utf8(bytes).unwrap()
    }

    fn load(status: StatusCode, body: &str) -> Outcome {
        let now = Utc::now();

        Outcome::Load(LoadEvent {
            url: "http://localhost:8080/api/servers".to_string(),
            status,
            body: body.to_string(),
            dispatched_at: now,
            completed_at: now + chrono::Duration::milliseconds(25),
        })
    }

    #[test]
    fn load_display_includes_status_and_body() {
        let outcome = load(StatusCode::BAD_REQUEST, "Invalid server ip\n");

        assert_eq!(
            outcome.to_string(),
            "load: http://localhost:8080/api/servers 400 Bad Request\nInvalid server ip"
        );
        assert!(outcome.is_load());
        assert!(!outcome.is_error());
    }

    #[test]
    fn load_display_omits_empty_body() {
        let outcome = load(StatusCode::OK, "");

        assert_eq!(
            outcome.to_string(),
            "load: http://localhost:8080/api/servers 200 OK"
        );
    }

    #[test]
    fn elapsed_is_measured_from_dispatch() {
        let outcome = load(StatusCode::OK, "");

        assert_eq!(outcome.elapsed().num_milliseconds(), 25);
        assert_eq!(outcome.url(), "http://localhost:8080/api/servers");
    }

    #[test]
    fn loads_are_logged_at_info() {
        let output = logged(&load(StatusCode::NOT_FOUND, "missing"));

        assert!(output.contains("INFO"), "{output}");
        assert!(!output.contains("WARN"), "{output}");
        assert!(output.contains("request loaded"), "{output}");
        assert!(output.contains("status=404 Not Found"), "{output}");
    }

    #[test]
    fn transport_errors_are_logged_at_warn() {
        let now = Utc::now();
        let outcome = Outcome::Error(ErrorEvent {
            url: "http://localhost:8080/api/dims".to_string(),
            error: SubmitError::NoRuntime,
            dispatched_at: now,
            completed_at: now,
        });
        let output = logged(&outcome);

        assert!(output.contains("WARN"), "{output}");
        assert!(!output.contains("INFO"), "{output}");
        assert!(output.contains("request failed"), "{output}");
    }

    #[test]
    fn closures_are_reporters() {
        let (tx, rx) = std::sync::mpsc::channel();
        let reporter = move |outcome: Outcome| tx.send(outcome.is_load()).unwrap();

        reporter.report(load(StatusCode::CREATED, "{}"));

        assert!(rx.recv().unwrap());
    }
}

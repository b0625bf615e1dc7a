//! Request logging injected into the client.
//!
//! The client reports what it does through a [`RequestLogger`]. Nothing is
//! logged unless a logger is supplied; the default [`NoopLogger`] discards
//! every event.

mod transcript;

use std::fmt;

use log::Level;

pub use self::transcript::TranscriptLogger;

/// What happened during a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RequestIssued,
    ResponseSucceeded,
    TransportFailed,
    UnexpectedStatus,
    DecodeFailed,
}

impl EventKind {
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::RequestIssued | Self::ResponseSucceeded => Level::Info,
            Self::TransportFailed | Self::UnexpectedStatus | Self::DecodeFailed => Level::Error,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RequestIssued => "request_issued",
            Self::ResponseSucceeded => "response_succeeded",
            Self::TransportFailed => "transport_failed",
            Self::UnexpectedStatus => "unexpected_status",
            Self::DecodeFailed => "decode_failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured log event.
///
/// `body` holds the redacted request payload for [`EventKind::RequestIssued`]
/// and a truncated response body otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RequestEvent<'a> {
    pub kind: EventKind,
    pub endpoint: &'a str,
    pub operation: &'a str,
    pub status: Option<u16>,
    pub body: Option<&'a str>,
    pub error: Option<&'a str>,
}

impl<'a> RequestEvent<'a> {
    pub(crate) fn new(kind: EventKind, endpoint: &'a str, operation: &'a str) -> Self {
        Self {
            kind,
            endpoint,
            operation,
            status: None,
            body: None,
            error: None,
        }
    }

    #[must_use]
    pub(crate) fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub(crate) fn body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub(crate) fn error(mut self, error: &'a str) -> Self {
        self.error = Some(error);
        self
    }
}

/// Sink for client log events.
pub trait RequestLogger: Send + Sync {
    fn log(&self, event: &RequestEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl RequestLogger for NoopLogger {
    fn log(&self, _event: &RequestEvent<'_>) {}
}

/// Forwards events to the [`log`] facade under the `rawql` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLogger;

impl RequestLogger for FacadeLogger {
    fn log(&self, event: &RequestEvent<'_>) {
        let level = event.kind.level();
        if !log::log_enabled!(target: "rawql", level) {
            return;
        }
        let status = event
            .status
            .map_or_else(String::new, |s| format!(" status={s}"));
        let error = event.error.map_or_else(String::new, |e| format!(" error={e}"));
        let body = event.body.map_or_else(String::new, |b| format!(" body={b:?}"));
        log::log!(
            target: "rawql",
            level,
            "{} endpoint={} op={}{status}{error}{body}",
            event.kind,
            event.endpoint,
            event.operation,
        );
    }
}

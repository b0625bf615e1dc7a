//! Transcript logging for GraphQL requests.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::sync::Mutex;

use serde_json::json;

use super::{RequestEvent, RequestLogger};

/// Appends one JSON object per event to a file.
///
/// Useful for troubleshooting failed queries after the fact. Write failures
/// are reported through the `log` facade and otherwise ignored.
#[derive(Debug)]
pub struct TranscriptLogger {
    file: Mutex<BufWriter<File>>,
}

impl TranscriptLogger {
    /// Create (or truncate) the transcript at `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RequestLogger for TranscriptLogger {
    fn log(&self, event: &RequestEvent<'_>) {
        let line = json!({
            "event": event.kind.as_str(),
            "endpoint": event.endpoint,
            "operation": event.operation,
            "status": event.status,
            "body": event.body,
            "error": event.error,
        });
        let op = event.operation;
        match self.file.lock() {
            Ok(mut f) => {
                if let Err(e) = writeln!(f, "{line}") {
                    log::warn!("failed to write transcript for op={op}: {e}");
                    return;
                }
                if let Err(e) = f.flush() {
                    log::warn!("failed to flush transcript for op={op}: {e}");
                }
            }
            Err(e) => {
                log::warn!("failed to lock transcript for op={op}: {e}");
            }
        }
    }
}

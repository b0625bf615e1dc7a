//! Request and response types used by the GraphQL client.

use std::fmt;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::DataError;

/// A GraphQL query string.
#[derive(Debug, Clone)]
pub struct Query(String);

impl Query {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The URL every request is posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top-level GraphQL response envelope as received on the wire.
///
/// A `null` body decodes as an empty envelope.
#[derive(Debug, Default, Deserialize)]
pub(super) struct Envelope {
    #[serde(default)]
    pub(super) data: Option<Value>,
    #[serde(default)]
    pub(super) errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    pub(super) extensions: Option<Value>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Source position attached to a GraphQL error.
///
/// Servers are not trusted to send positive positions; values are kept as
/// received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Location {
    pub line: i64,
    pub column: i64,
}

/// A single entry of the `errors` array.
///
/// A missing or `null` message decodes as an empty string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphQLError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        let mut locations = self.locations.iter();
        if let Some(first) = locations.next() {
            write!(f, " (at {}:{}", first.line, first.column)?;
            for loc in locations {
                write!(f, ", {}:{}", loc.line, loc.column)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Result of a GraphQL call.
///
/// `status_code` and `raw_body` reflect exactly what the server sent. The
/// parsed fields are only populated for a `200 OK` response whose body
/// decoded as a GraphQL envelope.
#[derive(Debug, Clone, Default)]
pub struct GraphQLResponse {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub raw_body: Bytes,
    pub data: Option<Value>,
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<Value>,
}

impl GraphQLResponse {
    /// Response recorded when the server answered but the body was not parsed.
    pub(crate) fn unparsed(status_code: u16, headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            status_code,
            headers,
            raw_body,
            ..Self::default()
        }
    }

    /// Response recorded when no usable HTTP response arrived.
    pub(crate) fn sentinel(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }

    /// Whether the server reported any GraphQL errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All error messages joined with `, `.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The raw body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_body)
    }

    /// Deserialize `data` into `T`.
    ///
    /// Returns `Ok(None)` when the response carried no data.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] naming the JSON path at which `data` stopped
    /// matching `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DataError> {
        let Some(value) = &self.data else {
            return Ok(None);
        };
        serde_path_to_error::deserialize(value)
            .map(Some)
            .map_err(|e| {
                let path = e.path().to_string();
                DataError {
                    path: path.into_boxed_str(),
                    message: e.into_inner().to_string().into_boxed_str(),
                }
            })
    }
}

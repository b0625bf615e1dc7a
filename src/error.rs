//! Error types returned by the client.

use bytes::Bytes;
use thiserror::Error;

use crate::client::GraphQLResponse;
use crate::transport::TransportError;

/// Failure of a single `raw_request` call.
///
/// Variants that observed an HTTP exchange keep what was observed, so callers
/// can inspect the status and body of a failed call.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The request body could not be built. Nothing was sent.
    #[error("encoding request: {message}")]
    Encoding { message: Box<str> },
    /// The transport failed before a complete response was received.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Box<str>,
        response: Box<GraphQLResponse>,
        #[source]
        source: TransportError,
    },
    /// The server answered with a status other than `200 OK`.
    #[error("HTTP status {status_text} | body snippet: {snippet}")]
    HttpStatus {
        status_text: Box<str>,
        snippet: Box<str>,
        response: Box<GraphQLResponse>,
    },
    /// A `200 OK` body did not decode as a GraphQL envelope.
    ///
    /// The parsed response is discarded; only the status and body survive.
    #[error("malformed response at {path}: {message} | body snippet: {snippet}")]
    Decoding {
        status_code: u16,
        raw_body: Bytes,
        path: Box<str>,
        message: Box<str>,
        snippet: Box<str>,
    },
}

impl RequestError {
    /// The response object returned alongside this error, if any.
    ///
    /// Present for [`RequestError::Transport`] (sentinel status, empty body)
    /// and [`RequestError::HttpStatus`]; absent for encoding and decoding
    /// failures.
    #[must_use]
    pub fn response(&self) -> Option<&GraphQLResponse> {
        match self {
            Self::Transport { response, .. } | Self::HttpStatus { response, .. } => {
                Some(response.as_ref())
            }
            Self::Encoding { .. } | Self::Decoding { .. } => None,
        }
    }

    /// Consume the error, yielding the response object if one was returned.
    #[must_use]
    pub fn into_response(self) -> Option<GraphQLResponse> {
        match self {
            Self::Transport { response, .. } | Self::HttpStatus { response, .. } => Some(*response),
            Self::Encoding { .. } | Self::Decoding { .. } => None,
        }
    }

    /// HTTP status observed by the call, or the transport sentinel.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { response, .. } | Self::HttpStatus { response, .. } => {
                Some(response.status_code)
            }
            Self::Decoding { status_code, .. } => Some(*status_code),
            Self::Encoding { .. } => None,
        }
    }

    /// Raw body received from the server, when one was read.
    #[must_use]
    pub fn raw_body(&self) -> Option<&Bytes> {
        match self {
            Self::HttpStatus { response, .. } => Some(&response.raw_body),
            Self::Decoding { raw_body, .. } => Some(raw_body),
            Self::Encoding { .. } | Self::Transport { .. } => None,
        }
    }
}

/// `data` did not match the requested type.
#[derive(Error, Debug)]
#[error("unexpected data at {path}: {message}")]
pub struct DataError {
    pub path: Box<str>,
    pub message: Box<str>,
}

/// Client configuration could not be loaded or applied.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("loading configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: Box<str>,
        #[source]
        source: url::ParseError,
    },
    #[error("building HTTP client: {0}")]
    Transport(#[from] reqwest::Error),
}

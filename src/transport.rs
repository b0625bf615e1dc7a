//! HTTP transport capability injected into the client.
//!
//! The client never opens connections itself. It hands a fully serialised
//! body to a [`Transport`] and receives the status, headers and drained body
//! back. Connection pooling, TLS, proxies and authentication belong to the
//! transport.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;

/// Boxed error produced by a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A complete HTTP response with its body read into memory.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Failure to obtain a complete HTTP response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("sending request: {0}")]
    Send(#[source] BoxError),
    #[error("reading response body (status {status}): {source}")]
    Body {
        status: StatusCode,
        #[source]
        source: BoxError,
    },
    #[error("request cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl TransportError {
    /// Wrap an error raised before any response arrived.
    pub fn send(source: impl Into<BoxError>) -> Self {
        Self::Send(source.into())
    }

    /// Status received before the failure, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Body { status, .. } => Some(*status),
            Self::Send(_) | Self::Cancelled | Self::DeadlineExceeded => None,
        }
    }
}

/// Capability to POST a body to a URL.
///
/// Implementations must drain and release the response body before
/// resolving, whichever way the call ends.
pub trait Transport: Send + Sync {
    fn post(
        &self,
        url: &str,
        content_type: &'static str,
        body: Bytes,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

impl Transport for reqwest::Client {
    fn post(
        &self,
        url: &str,
        content_type: &'static str,
        body: Bytes,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        // Inherent `reqwest::Client::post`, not this method.
        let request = Self::post(self, url)
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .header(ACCEPT, HeaderValue::from_static(content_type))
            .body(body);
        async move {
            let response = request.send().await.map_err(TransportError::send)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body {
                    status,
                    source: Box::new(e),
                })?;
            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn post(
        &self,
        url: &str,
        content_type: &'static str,
        body: Bytes,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        (**self).post(url, content_type, body)
    }
}

//! GraphQL client implementation and request orchestration.

mod helpers;
mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::{ConfigError, RequestError};
use crate::logging::{EventKind, NoopLogger, RequestEvent, RequestLogger};
use crate::transport::{Transport, TransportResponse};

use self::helpers::{
    body_snippet, build_payload, decode_envelope, encode_payload, operation_label,
    payload_snippet,
};

pub use self::types::{Endpoint, GraphQLError, GraphQLResponse, Location, Query};


/// Content type of every request body.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Status code reported when the transport failed before any response.
pub const UNKNOWN_STATUS: u16 = 0;

/// Client for a single GraphQL endpoint.
///
/// Holds no per-call state, so one client can serve concurrent calls as long
/// as its transport can.
#[derive(Clone)]
pub struct Client<T = reqwest::Client> {
    transport: T,
    endpoint: Endpoint,
    logger: Arc<dyn RequestLogger>,
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Client<reqwest::Client> {
    /// Create a client backed by a default pooling `reqwest` client.
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        Self::with_transport(endpoint, reqwest::Client::new())
    }

    /// Create a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the endpoint is not an absolute URL or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self::with_transport(config.endpoint.as_str(), builder.build()?))
    }
}

impl<T: Transport> Client<T> {
    /// Create a client that posts through `transport`.
    pub fn with_transport(endpoint: impl Into<Endpoint>, transport: T) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            logger: Arc::new(NoopLogger),
        }
    }

    /// Report request events to `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: impl RequestLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Report request events to a shared logger.
    #[must_use]
    pub fn with_shared_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Post `query` with `variables` and decode the GraphQL envelope.
    ///
    /// `variables` must serialise to a JSON object; pass `()` for none.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Encoding`] if the body cannot be built. Nothing is
    ///   sent.
    /// - [`RequestError::Transport`] if no complete response arrived,
    ///   including deadline expiry and cancellation of `ctx`. The attached
    ///   response carries [`UNKNOWN_STATUS`] unless a status was received.
    /// - [`RequestError::HttpStatus`] for any status other than `200 OK`. The
    ///   attached response carries the status and raw body.
    /// - [`RequestError::Decoding`] if a `200 OK` body is not a GraphQL
    ///   envelope. No response is attached.
    pub async fn raw_request<V: Serialize>(
        &self,
        ctx: &CallContext,
        query: impl Into<Query>,
        variables: V,
    ) -> Result<GraphQLResponse, RequestError> {
        let query = query.into();
        let operation = operation_label(query.as_str());
        let payload = build_payload(query.as_str(), &variables)?;
        let body = encode_payload(&payload)?;
        let endpoint = self.endpoint.as_str();

        let payload_snip = payload_snippet(&payload);
        self.log(
            RequestEvent::new(EventKind::RequestIssued, endpoint, &operation).body(&payload_snip),
        );

        let sent = ctx
            .run(self.transport.post(endpoint, JSON_CONTENT_TYPE, body))
            .await
            .and_then(|res| res);
        let TransportResponse {
            status,
            headers,
            body,
        } = match sent {
            Ok(resp) => resp,
            Err(source) => {
                let status_code = source.status().map_or(UNKNOWN_STATUS, |s| s.as_u16());
                let message = source.to_string();
                self.log(
                    RequestEvent::new(EventKind::TransportFailed, endpoint, &operation)
                        .status(status_code)
                        .error(&message),
                );
                return Err(RequestError::Transport {
                    endpoint: endpoint.into(),
                    response: Box::new(GraphQLResponse::sentinel(status_code)),
                    source,
                });
            }
        };

        let status_code = status.as_u16();
        let snip = body_snippet(&body);
        if status != StatusCode::OK {
            let status_text = status.to_string();
            self.log(
                RequestEvent::new(EventKind::UnexpectedStatus, endpoint, &operation)
                    .status(status_code)
                    .body(&snip)
                    .error(&status_text),
            );
            return Err(RequestError::HttpStatus {
                status_text: status_text.into_boxed_str(),
                snippet: snip.into_boxed_str(),
                response: Box::new(GraphQLResponse::unparsed(status_code, headers, body)),
            });
        }

        let envelope = match decode_envelope(&body) {
            Ok(envelope) => envelope,
            Err((path, message)) => {
                let error = format!("{message} at {path}");
                self.log(
                    RequestEvent::new(EventKind::DecodeFailed, endpoint, &operation)
                        .status(status_code)
                        .body(&snip)
                        .error(&error),
                );
                return Err(RequestError::Decoding {
                    status_code,
                    raw_body: body,
                    path: path.into_boxed_str(),
                    message: message.into_boxed_str(),
                    snippet: snip.into_boxed_str(),
                });
            }
        };

        self.log(
            RequestEvent::new(EventKind::ResponseSucceeded, endpoint, &operation)
                .status(status_code),
        );
        Ok(GraphQLResponse {
            data: envelope.data,
            errors: envelope.errors.unwrap_or_default(),
            extensions: envelope.extensions,
            ..GraphQLResponse::unparsed(status_code, headers, body)
        })
    }

    fn log(&self, event: RequestEvent<'_>) {
        self.logger.log(&event);
    }
}

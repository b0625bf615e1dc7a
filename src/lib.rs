//! Minimal GraphQL-over-HTTP client.
//!
//! A [`Client`] posts a query and its variables to one endpoint and returns
//! the decoded GraphQL envelope together with the HTTP status and raw body.
//! Failed calls keep whatever the server sent so callers can inspect it:
//!
//! ```no_run
//! use rawql::{CallContext, Client};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), rawql::RequestError> {
//! let client = Client::new("https://api.example.com/graphql");
//! let ctx = CallContext::background();
//! match client.raw_request(&ctx, "query Me { me { id } }", ()).await {
//!     Ok(resp) => println!("{:?}", resp.data),
//!     Err(err) => {
//!         if let Some(resp) = err.response() {
//!             eprintln!("status {}: {}", resp.status_code, resp.body_text());
//!         }
//!     }
//! }
//! let _ = client
//!     .raw_request(&ctx, "query U($id: ID!) { user(id: $id) { name } }", json!({"id": "1"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod transport;

pub use client::{
    Client, Endpoint, GraphQLError, GraphQLResponse, Location, Query, UNKNOWN_STATUS,
};
pub use config::ClientConfig;
pub use context::{CallContext, CancelHandle};
pub use error::{ConfigError, DataError, RequestError};
pub use logging::{
    EventKind, FacadeLogger, NoopLogger, RequestEvent, RequestLogger, TranscriptLogger,
};
pub use transport::{Transport, TransportError, TransportResponse};

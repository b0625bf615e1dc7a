//! Test utilities for running a local GraphQL HTTP server.
//!
//! The server hands each request, with its body collected, to a shared
//! handler so tests can script responses and inspect what the client sent.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode, body::Incoming, server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use std::io::ErrorKind;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// Shared handler invoked for each request with its collected body.
pub type Handler = Arc<Mutex<Box<dyn Fn(&Request<Bytes>) -> Response<Full<Bytes>> + Send>>>;

/// Handle returned by [`start_server`] for shutting down the server.
pub struct ShutdownHandle {
    join: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl ShutdownHandle {
    /// Signal the server to stop and await shutdown.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.join.await;
    }
}

/// Start an HTTP/1 server on an ephemeral local port.
///
/// # Errors
///
/// Returns an error if the server fails to bind to a local port.
///
/// # Panics
///
/// Panics if the default response cannot be constructed.
#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! uses % internally"
)]
pub async fn start_server() -> Result<(SocketAddr, Handler, ShutdownHandle), std::io::Error> {
    let handler: Handler = Arc::new(Mutex::new(Box::new(|_req| {
        Response::builder()
            .status(404)
            .body(Full::from(Bytes::from_static(b"No handler")))
            .expect("failed to create default response")
    })));
    let handler_clone = handler.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, mut rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                res = listener.accept() => match res {
                    Ok((stream, _)) => {
                        let io = TokioIo::new(stream);
                        let h = handler_clone.clone();
                        let service = service_fn(move |req: Request<Incoming>| {
                            let h = h.clone();
                            async move {
                                let (parts, body) = req.into_parts();
                                let bytes = body.collect().await.map(|b| b.to_bytes()).unwrap_or_default();
                                let req = Request::from_parts(parts, bytes);
                                let f = h.lock().expect("lock handler in service");
                                let resp = (f)(&req);
                                Ok::<_, std::convert::Infallible>(resp)
                            }
                        });
                        tokio::spawn(async move {
                            let _ = http1::Builder::new().serve_connection(io, service).await;
                        });
                    }
                    Err(e) => {
                        eprintln!("accept error: {e}");
                        match e.kind() {
                            ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                            | ErrorKind::WouldBlock => {}
                            _ => break,
                        }
                    }
                },
                _ = &mut rx => break,
            }
        }
    });

    Ok((addr, handler, ShutdownHandle { join, stop: tx }))
}

/// Answer every request with `status` and `body`.
///
/// # Panics
///
/// Panics if the response cannot be built.
pub fn respond_with(handler: &Handler, status: StatusCode, body: &'static str) {
    *handler.lock().expect("lock handler") = Box::new(move |_req| {
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::from(Bytes::from_static(body.as_bytes())))
            .expect("build response")
    });
}

/// Answer every request with a GraphQL envelope whose `data` echoes the
/// request body.
///
/// # Panics
///
/// Panics if the request body is not JSON or the response cannot be built.
#[allow(dead_code, reason = "helper used in some tests only")]
pub fn echo_request(handler: &Handler) {
    *handler.lock().expect("lock handler") = Box::new(|req: &Request<Bytes>| {
        let sent: serde_json::Value =
            serde_json::from_slice(req.body()).expect("invalid JSON request body");
        let body = serde_json::json!({ "data": sent }).to_string();
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(Full::from(body))
            .expect("build response")
    });
}

/// Endpoint URL for a server started by [`start_server`].
#[must_use]
pub fn graphql_url(addr: SocketAddr) -> String {
    format!("http://{addr}/graphql")
}

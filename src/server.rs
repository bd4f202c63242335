//! HTTP surface: homepage, metrics and the ingestion endpoint.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info, warn};

use crate::dispatch::DispatchTable;
use crate::error::IngestError;
use crate::forward::Forwarder;
use crate::key::generate_key;
use crate::metrics::{self, Metrics};
use crate::storage::Storage;

static HOMEPAGE_HTML: &str = include_str!("homepage.html");

/// Process-wide state handed to every request.
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub dispatch: DispatchTable,
    pub forwarder: Forwarder,
    pub metrics: Arc<Metrics>,
    pub log_requests: bool,
}

/// Serves until `shutdown` resolves, then drains open connections.
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> Result<(), hyper::Error>
where
    F: Future<Output = ()>,
{
    let service = make_service_fn(move |conn: &AddrStream| {
        let state = state.clone();
        let remote = conn.remote_addr();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| routes(state.clone(), Some(remote), req)))
        }
    });
    let server = Server::try_bind(&addr)?.serve(service);
    info!("Starting webhook server on http://{}", server.local_addr());
    server.with_graceful_shutdown(shutdown).await
}

pub async fn routes(
    state: Arc<AppState>,
    remote: Option<SocketAddr>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path();
    let response = if path == "/" && req.method() == Method::GET {
        homepage()
    } else if path == "/metrics" {
        text(StatusCode::OK, metrics::CONTENT_TYPE, state.metrics.render())
    } else {
        match ingest(&state, remote, req).await {
            Ok(key) => plain(StatusCode::OK, format!("Webhook received and stored: {}\n", key)),
            Err(err) => plain(err.status(), format!("{}\n", err)),
        }
    };
    Ok(response)
}

/// Validates, persists and fans out one delivery. Returns the stored key.
pub async fn ingest(
    state: &AppState,
    remote: Option<SocketAddr>,
    req: Request<Body>,
) -> Result<String, IngestError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path();
    let remote = remote.map(|addr| addr.to_string()).unwrap_or_else(|| "-".to_owned());

    let body: Bytes = hyper::body::to_bytes(body).await.map_err(|err| {
        warn!("Error reading body from {}: {}", remote, err);
        IngestError::ReadBody(err)
    })?;

    if state.log_requests {
        info!("=== Incoming Request ===");
        info!("Method: {}", parts.method);
        info!("Path: {}", path);
        info!("Remote: {}", remote);
        info!("Headers:");
        for (name, value) in parts.headers.iter() {
            info!("  {}: {}", name, String::from_utf8_lossy(value.as_bytes()));
        }
        info!("Body: {}", String::from_utf8_lossy(&body));
        info!("========================");
    }

    // Only well-formedness matters; the parsed value is dropped.
    if let Err(err) = serde_json::from_slice::<serde_json::Value>(&body) {
        warn!("Invalid JSON from {}: {}", remote, err);
        return Err(IngestError::InvalidJson(err));
    }

    let key = generate_key(path, Utc::now());
    state.storage.store(&key, path, &body).await.map_err(|err| {
        error!("Failed to store webhook {}: {}", key, err);
        IngestError::Storage(err)
    })?;
    info!("Stored webhook: {} (path: {}, size: {} bytes)", key, path, body.len());

    let targets = state.dispatch.lookup(path);
    if !targets.is_empty() {
        // Dropping the handles detaches the tasks; the response does not wait.
        drop(
            state
                .forwarder
                .dispatch(targets, body, parts.headers.get(CONTENT_TYPE)),
        );
    }

    Ok(key)
}

fn homepage() -> Response<Body> {
    text(StatusCode::OK, "text/html; charset=utf-8", HOMEPAGE_HTML)
}

fn plain(status: StatusCode, body: String) -> Response<Body> {
    text(status, "text/plain; charset=utf-8", body)
}

fn text<B: Into<Body>>(status: StatusCode, content_type: &'static str, body: B) -> Response<Body> {
    let mut res = Response::new(body.into());
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection, and a
//! hand-rolled `(Method, path)` router. The whole public surface is JSON
//! with an `ok` field; transport status codes are secondary.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::finalize::Orchestrator;
use crate::routes;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            args,
            orchestrator,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Listening on http://{}", state.args.listen);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("{} {}", method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Single-token finalize
        (Method::GET, "/finalize") | (Method::POST, "/finalize") => {
            routes::handle_finalize(req, Arc::clone(&state)).await
        }

        // Admin backfill over an inclusive id range
        (Method::POST, "/admin/backfill") => {
            routes::handle_backfill(req, Arc::clone(&state)).await
        }

        // CORS preflight: the consumer web app calls this service directly
        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// Build a JSON response with CORS headers
pub fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let payload = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .body(Full::new(Bytes::from(payload)))
        .unwrap_or_default()
}

/// Build an `{ok: false, error}` envelope
pub fn error_response(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &serde_json::json!({ "ok": false, "error": error }),
    )
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("access-control-allow-origin", "*")
        .header("access-control-allow-methods", "GET, POST, OPTIONS")
        .header("access-control-allow-headers", "content-type, x-admin-token")
        .body(Full::new(Bytes::new()))
        .unwrap_or_default()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, &format!("no route for {}", path))
}

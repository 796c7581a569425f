//! HTTP server for predictions, metrics and health checks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bcdx_core::features::FEATURES;
use bcdx_core::record::FeatureRecord;
use bcdx_model::artifacts::Artifacts;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

use crate::metrics::MetricsRegistry;

/// Largest request accepted (headers plus body)
const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// How long a client may take to deliver its whole request
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Server state
pub struct ServerState {
    /// Loaded artifacts, read-only for the lifetime of the server
    pub artifacts: Arc<Artifacts>,
    /// Metrics registry
    pub metrics: Arc<MetricsRegistry>,
    /// Application status
    pub status: RwLock<AppStatus>,
    started: Instant,
}

/// Application status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    /// Starting up
    Starting,
    /// Serving requests
    Running,
    /// Shutting down
    ShuttingDown,
    /// Stopped
    Stopped,
}

impl ServerState {
    /// Create a new server state around loaded artifacts
    #[must_use]
    pub fn new(artifacts: Arc<Artifacts>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            artifacts,
            metrics,
            status: RwLock::new(AppStatus::Starting),
            started: Instant::now(),
        }
    }

    /// Set application status
    pub async fn set_status(&self, status: AppStatus) {
        let mut s = self.status.write().await;
        *s = status;
    }

    /// Get application status
    pub async fn get_status(&self) -> AppStatus {
        *self.status.read().await
    }

    /// Check if application is healthy
    pub async fn is_healthy(&self) -> bool {
        matches!(
            self.get_status().await,
            AppStatus::Running | AppStatus::Starting
        )
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status string
    pub status: &'static str,
    /// Application version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Classifier name
    pub model: String,
    /// Successful predictions served
    pub predictions: u64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// A parsed HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method, e.g. `GET`
    pub method: String,
    /// Path without query string
    pub path: String,
    /// Body text
    pub body: String,
}

/// Outcome of parsing the bytes received so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Headers or body still incomplete
    Partial,
    /// A complete request
    Complete(Request),
    /// Declared body exceeds the request size limit
    TooLarge,
}

impl Request {
    /// Parse a complete request from raw bytes.
    ///
    /// Returns [`Parsed::Partial`] until the headers and the full
    /// `Content-Length` body have arrived, and [`Parsed::TooLarge`] as soon
    /// as the declared length is over the limit.
    #[must_use]
    pub fn parse(raw: &[u8]) -> Parsed {
        let text = String::from_utf8_lossy(raw);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return Parsed::Partial;
        };

        let mut lines = head.lines();
        let Some(mut request_line) = lines.next().map(str::split_whitespace) else {
            return Parsed::Partial;
        };
        let (Some(method), Some(target)) = (request_line.next(), request_line.next()) else {
            return Parsed::Partial;
        };
        let path = target.split('?').next().unwrap_or(target).to_string();

        let content_length = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        if content_length > MAX_REQUEST_BYTES {
            return Parsed::TooLarge;
        }
        if body.len() < content_length {
            return Parsed::Partial;
        }

        Parsed::Complete(Self {
            method: method.to_string(),
            path,
            body: body.get(..content_length).unwrap_or(body).to_string(),
        })
    }
}

/// An HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Content type
    pub content_type: &'static str,
    /// Body text
    pub body: String,
}

impl Response {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#));
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn error(status: u16, message: impl ToString) -> Self {
        Self::json(
            status,
            &ErrorResponse {
                error: message.to_string(),
            },
        )
    }

    fn text(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/plain; version=0.0.4",
            body,
        }
    }

    /// Serialize status line, headers and body
    #[must_use]
    pub fn to_http(&self) -> String {
        let reason = match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            422 => "Unprocessable Entity",
            503 => "Service Unavailable",
            _ => "Internal Server Error",
        };
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason,
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

/// Route one request
pub async fn handle(state: &ServerState, request: &Request) -> Response {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => {
            let healthy = state.is_healthy().await;
            let health = HealthResponse {
                status: if healthy { "ok" } else { "unhealthy" },
                version: env!("CARGO_PKG_VERSION"),
                uptime_secs: state.started.elapsed().as_secs(),
                model: state.artifacts.classifier().name().to_string(),
                predictions: state.artifacts.stats().inference_count(),
            };
            Response::json(if healthy { 200 } else { 503 }, &health)
        }
        ("GET", "/metrics") => Response::text(200, state.metrics.encode()),
        ("GET", "/features") => Response::json(200, &FEATURES),
        ("POST", "/predict") => predict(state, &request.body),
        (_, "/health" | "/metrics" | "/features" | "/predict") => {
            Response::error(405, format!("{} not allowed", request.method))
        }
        _ => Response::error(404, format!("no route for {}", request.path)),
    }
}

fn predict(state: &ServerState, body: &str) -> Response {
    let record = match FeatureRecord::from_json(body) {
        Ok(record) => record,
        Err(e) => {
            state.metrics.record_error();
            return Response::error(400, e);
        }
    };

    match state.artifacts.diagnose(&record) {
        Ok(diagnosis) => {
            state.metrics.record_diagnosis(&diagnosis);
            Response::json(200, &diagnosis)
        }
        Err(e) => {
            state.metrics.record_error();
            let status = if e.is_input_error() { 422 } else { 500 };
            Response::error(status, e)
        }
    }
}

/// Read until a request is complete or over the limit. `Partial` means the
/// peer closed the connection first.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<Parsed> {
    let mut raw = Vec::with_capacity(4096);
    let mut buffer = [0u8; 4096];

    loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(Parsed::Partial);
        }
        raw.extend_from_slice(&buffer[..n]);

        match Request::parse(&raw) {
            Parsed::Partial if raw.len() > MAX_REQUEST_BYTES => return Ok(Parsed::TooLarge),
            Parsed::Partial => {}
            done => return Ok(done),
        }
    }
}

async fn serve_connection(
    state: Arc<ServerState>,
    mut socket: TcpStream,
    read_timeout: Duration,
) -> std::io::Result<()> {
    let response = match tokio::time::timeout(read_timeout, read_request(&mut socket)).await {
        Ok(parsed) => match parsed? {
            Parsed::Complete(request) => {
                tracing::debug!(method = %request.method, path = %request.path, "Request");
                handle(&state, &request).await
            }
            Parsed::TooLarge => Response::error(413, "request too large"),
            Parsed::Partial => return Ok(()),
        },
        Err(_) => Response::error(408, "request timed out"),
    };

    socket.write_all(response.to_http().as_bytes()).await?;
    socket.shutdown().await
}

/// Start the HTTP server. Artifacts are already loaded when this is called.
pub async fn start_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("HTTP server listening on port {}", port);
    state.set_status(AppStatus::Running).await;

    loop {
        let (socket, peer) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_connection(state, socket, READ_TIMEOUT).await {
                tracing::warn!(%peer, "Connection error: {}", e);
            }
        });
    }
}

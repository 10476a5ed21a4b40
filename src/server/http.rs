//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One task per
//! connection; all tasks share one [`AppState`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::fingerprint;
use crate::config::Args;
use crate::routes::{self, downloads::MAX_BODY_BYTES};
use crate::store::TokenStore;
use crate::tokens::TokenService;
use crate::types::WicketError;

const DOWNLOAD_PREFIX: &str = "/api/download/";

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Issuer and redeemer
    pub tokens: TokenService,
    /// Token record store, shared with the token service
    pub store: Arc<dyn TokenStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, tokens: TokenService, store: Arc<dyn TokenStore>) -> Self {
        Self {
            args,
            tokens,
            store,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), WicketError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Wicket listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - do not expose to the internet");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
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

/// Path safe to log: download tokens are replaced by their fingerprint
fn loggable_path(path: &str) -> String {
    match path.strip_prefix(DOWNLOAD_PREFIX) {
        Some(token) => format!("{}<{}>", DOWNLOAD_PREFIX, fingerprint(token)),
        None => path.to_string(),
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, loggable_path(&path));

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => routes::preflight_response(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(&state),

        (Method::GET, "/status") => routes::status_check(&state).await,

        (Method::POST, "/api/download-tokens") => {
            match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
                Ok(collected) => routes::handle_issue(&state, &collected.to_bytes()).await,
                Err(e) => routes::error_response(&WicketError::InvalidRequest(format!(
                    "Failed to read body: {}",
                    e
                ))),
            }
        }

        (Method::GET, p) if p.starts_with(DOWNLOAD_PREFIX) => {
            let token = &p[DOWNLOAD_PREFIX.len()..];
            routes::handle_download(&state, token, Some(addr.ip())).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggable_path_hides_token() {
        let logged = loggable_path("/api/download/eyJhbGciOiJIUzI1NiJ9.secret.sig");
        assert!(logged.starts_with(DOWNLOAD_PREFIX));
        assert!(!logged.contains("secret"));

        assert_eq!(loggable_path("/health"), "/health");
    }
}

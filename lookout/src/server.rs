use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming;
use hyper::header::ORIGIN;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use lookout_lib::config::ServerConfig;
use lookout_lib::http::{
    apply_cors, catch_panic, client_ip, error_for, error_response, json_response,
    parse_request_body, RespBody,
};
use lookout_lib::telemetry::HttpMetrics;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, info_span, warn, Instrument};

/// Fixed label set for the request metrics
fn route_label(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/whoami" => "/whoami",
        "/echo" => "/echo",
        _ => "other",
    }
}

async fn route(req: Request<Incoming>, peer: SocketAddr) -> Response<RespBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match path.as_str() {
        "/health" if method == Method::GET => json_response(&json!({"status": "healthy"})),
        "/whoami" if method == Method::GET => {
            json_response(&json!({"ip": client_ip(req.headers(), Some(peer))}))
        }
        "/echo" if method == Method::POST => match parse_request_body::<Value, _>(req).await {
            Ok(value) => json_response(&value),
            Err(e) => Err(e),
        },
        "/health" | "/whoami" | "/echo" => {
            Ok(error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"))
        }
        _ => Ok(error_response(StatusCode::NOT_FOUND, "not found")),
    };

    result.unwrap_or_else(|e| {
        warn!(%method, %path, error = %e, "request failed");
        error_for(&e)
    })
}

async fn handle(
    req: Request<Incoming>,
    peer: SocketAddr,
    allowed_origins: Arc<Vec<String>>,
    metrics: HttpMetrics,
) -> Result<Response<RespBody>, hyper::Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let label = route_label(req.uri().path());
    let origin = req.headers().get(ORIGIN).cloned();

    let span = info_span!("request", %method, route = label, ?peer);
    let mut resp = match catch_panic(route(req, peer).instrument(span)).await {
        Ok(resp) => resp,
        Err(resp) => {
            metrics.record_panic(label);
            resp
        }
    };

    apply_cors(origin.as_ref(), &allowed_origins, &mut resp);
    metrics.record_request(method.as_str(), resp.status().as_u16(), label, started.elapsed());
    Ok(resp)
}

/// Serve `/health`, `/whoami` and `/echo` until SIGINT or SIGTERM
pub async fn serve(
    cfg: ServerConfig,
    metrics: HttpMetrics,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    let addr = listener.local_addr()?;
    let allowed_origins = Arc::new(cfg.allowed_origins);

    info!(?addr, "HTTP server started");

    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGTERM handler: {e}")))?;
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| std::io::Error::other(format!("Failed to setup SIGINT handler: {e}")))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept error");
                        continue;
                    }
                };

                let allowed_origins = allowed_origins.clone();
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        handle(req, peer, allowed_origins.clone(), metrics.clone())
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "serve_connection error");
                    }
                });
            }
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_labels_are_bounded() {
        assert_eq!(route_label("/health"), "/health");
        assert_eq!(route_label("/echo"), "/echo");
        assert_eq!(route_label("/users/42"), "other");
    }
}

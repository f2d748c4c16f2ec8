//! HTTP surface over [`HashService`].
//!
//! Routes:
//!
//! - `POST /hash` with form field `password` returns the reserved ticket.
//! - `GET /hash/{ticket}` returns the placeholder or the finished digest.
//! - `GET /stats` returns the write statistics as JSON.
//! - `GET|POST /shutdown` begins draining.
//!
//! [`serve`] runs plain HTTP on a bound listener; [`serve_tls`] runs HTTPS
//! through rustls. Both stop only once the service has drained.

use std::{net::SocketAddr, path};

use anyhow::{Context, Result};
use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{error::ServiceError, service::HashService, store::Ticket};

#[derive(Debug, Deserialize)]
pub struct HashForm {
    password: Option<String>,
}

pub fn router(service: HashService) -> Router {
    Router::new()
        .route("/hash", get(missing_ticket).post(submit))
        .route("/hash/", get(missing_ticket).post(submit))
        .route("/hash/*ticket", get(lookup))
        .route("/stats", get(stats))
        .route("/stats/", get(stats))
        .route("/shutdown", get(shutdown).post(shutdown))
        .route("/shutdown/", get(shutdown).post(shutdown))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves requests until shutdown has begun and all deferred work is drained.
///
/// Reads keep working while draining so callers can collect their digests.
pub async fn serve(listener: TcpListener, service: HashService) -> Result<()> {
    let app = router(service.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { service.drained().await })
        .await
        .context("http server failed")
}

/// Loads a PEM certificate chain and private key for [`serve_tls`].
pub async fn load_tls(cert: &path::Path, key: &path::Path) -> Result<RustlsConfig> {
    // Fails only when a provider is already installed, which is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    RustlsConfig::from_pem_file(cert, key).await.with_context(|| {
        format!(
            "failed to load tls certificate {} and key {}",
            cert.display(),
            key.display()
        )
    })
}

/// HTTPS counterpart of [`serve`], with the same drain-then-stop behavior.
pub async fn serve_tls(
    addr: SocketAddr,
    tls: RustlsConfig,
    service: HashService,
) -> Result<()> {
    let app = router(service.clone());
    let handle = Handle::new();

    let stopper = handle.clone();
    tokio::spawn(async move {
        service.drained().await;
        stopper.graceful_shutdown(None);
    });

    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("https server failed")
}

async fn submit(
    State(service): State<HashService>,
    form: Result<Form<HashForm>, FormRejection>,
) -> Result<String, ServiceError> {
    // An unreadable form is treated the same as a missing field.
    let value = form
        .ok()
        .and_then(|Form(form)| form.password)
        .unwrap_or_default();
    let ticket = service.admit_write(&value).await?;
    Ok(format!("{ticket}\n"))
}

async fn missing_ticket() -> ServiceError {
    ServiceError::MissingTicket
}

async fn lookup(
    State(service): State<HashService>,
    Path(raw): Path<String>,
) -> Result<String, ServiceError> {
    let ticket = parse_ticket(&raw)?;
    let value = service.read(ticket).await?;
    Ok(format!("{value}\n"))
}

async fn stats(State(service): State<HashService>) -> impl IntoResponse {
    let snapshot = service.stats_snapshot();
    (
        [(header::CONTENT_TYPE, "application/json")],
        format!("{}\n", snapshot.to_json()),
    )
}

async fn shutdown(State(service): State<HashService>) -> &'static str {
    service.begin_shutdown();
    "goodbye!\n"
}

/// Parses the path segment after `/hash/`, tolerating one trailing slash.
fn parse_ticket(raw: &str) -> Result<Ticket, ServiceError> {
    let raw = raw.trim_start_matches('/');
    let raw = raw.strip_suffix('/').unwrap_or(raw);
    if raw.is_empty() {
        return Err(ServiceError::MissingTicket);
    }
    raw.parse().map_err(|_| ServiceError::BadTicket)
}

fn status_of(err: ServiceError) -> StatusCode {
    match err {
        ServiceError::InvalidInput | ServiceError::MissingTicket | ServiceError::BadTicket => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_of(self);
        info!(status = status.as_u16(), error = %self, "request failed");
        (status, format!("{}: {self}\n", status.as_u16())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_trailing_slash_tickets() {
        assert_eq!(parse_ticket("12"), Ok(12));
        assert_eq!(parse_ticket("12/"), Ok(12));
        assert_eq!(parse_ticket("/12"), Ok(12));
    }

    #[test]
    fn rejects_malformed_tickets() {
        assert_eq!(parse_ticket(""), Err(ServiceError::MissingTicket));
        assert_eq!(parse_ticket("/"), Err(ServiceError::MissingTicket));
        assert_eq!(parse_ticket("stuff"), Err(ServiceError::BadTicket));
        assert_eq!(parse_ticket("12/stuff"), Err(ServiceError::BadTicket));
        assert_eq!(parse_ticket("-1"), Err(ServiceError::BadTicket));
    }

    #[tokio::test]
    async fn missing_tls_files_fail_to_load() {
        let result = load_tls(
            path::Path::new("does-not-exist/server.crt"),
            path::Path::new("does-not-exist/server.key"),
        )
        .await;

        let err = result.err().expect("missing files must not load");
        assert!(err.to_string().contains("does-not-exist/server.crt"));
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(status_of(ServiceError::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ServiceError::ServiceUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

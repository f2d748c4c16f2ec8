use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use deferred_hash_api::{HashService, cli::Cli, http};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let service = HashService::new(cli.service_config());

    spawn_signal_listener(service.clone());

    let addr = cli.listen_addr();
    let result = match cli.tls_paths() {
        Some((cert, key)) => {
            let tls = http::load_tls(cert, key).await?;
            info!("server listening on https://{addr}");
            http::serve_tls(addr, tls, service).await
        }
        None => {
            if cli.cert.is_some() || cli.key.is_some() {
                warn!("both --cert and --key are required for https, serving plain http");
            }
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!("server listening on http://{}", listener.local_addr()?);
            http::serve(listener, service).await
        }
    };

    if let Err(err) = result {
        warn!("server exited with error: {err:?}");
        return Err(err);
    }

    info!("shutdown complete");
    Ok(())
}

/// Routes OS shutdown signals into the same path `/shutdown` uses.
fn spawn_signal_listener(service: HashService) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(signal, "caught signal");
        service.begin_shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(err) => {
            warn!(error = ?err, "failed to install SIGTERM handler");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        signal = wait_for_ctrl_c() => signal,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to install ctrl-c handler");
        // Without a handler only /shutdown can stop the server.
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

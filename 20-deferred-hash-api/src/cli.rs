use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

use crate::service::ServiceConfig;

const HTTP_PORT: u16 = 8080;
const HTTPS_PORT: u16 = 443;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address the server binds to.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port the server binds to. Defaults to 8080, or 443 when serving TLS.
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds to wait before a submitted value is digested.
    #[arg(long, default_value_t = 5)]
    pub delay_secs: u64,

    /// PEM certificate chain. Serves HTTPS when given together with `--key`.
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// PEM private key. Serves HTTPS when given together with `--cert`.
    #[arg(long)]
    pub key: Option<PathBuf>,
}

impl Cli {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            delay: Duration::from_secs(self.delay_secs),
        }
    }

    /// True only when both a certificate and a key were given.
    pub fn is_tls(&self) -> bool {
        self.tls_paths().is_some()
    }

    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        let default_port = if self.is_tls() { HTTPS_PORT } else { HTTP_PORT };
        SocketAddr::new(self.host, self.port.unwrap_or(default_port))
    }
}

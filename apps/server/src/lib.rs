//! Event registration HTTP server.
//!
//! [`ServerBuilder::build`] connects the store, applies slice migrations and
//! initializes the slices; [`Server::run`] serves the API until SIGINT/SIGTERM.
//!
//! ```no_run
//! use evreg_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder().port(5001).build().await?.run().await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use evreg::domain::config::{ApiConfig, DatabaseConfig, SslConfig};
use evreg::kernel::server::ApiState;
use evreg_database::Database;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Collects configuration for a [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Overrides `server.port`.
    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    /// Prepares everything [`Server::run`] needs.
    ///
    /// # Errors
    /// * TLS certificate or key files are missing.
    /// * The store is unreachable or rejects the credentials.
    /// * A migration fails, or an applied migration script was edited.
    /// * The registration slice rejects its settings (e.g. zero default seats).
    pub async fn build(self) -> Result<Server> {
        if let Some(ssl) = &self.cfg.server.ssl {
            check_tls_files(ssl)?;
        }

        let db = connect(&self.cfg.database).await?;
        let slices = evreg::init(&self.cfg, &db)
            .map_err(|e| anyhow!("Feature initialization failed: {e}"))?;

        let state = ApiState::builder()
            .config(self.cfg)
            .db(db)
            .register_slices(slices)
            .build()
            .context("Failed to assemble API state")?;

        info!(slices = ?state.slice_names().collect::<Vec<_>>(), "Server ready");
        Ok(Server { state })
    }
}

async fn connect(cfg: &DatabaseConfig) -> Result<Database> {
    let mut builder = Database::builder().url(&cfg.url).session(&cfg.namespace, &cfg.database);
    if let Some(creds) = &cfg.credentials {
        builder = builder.auth(&creds.username, &creds.password);
    }

    builder
        .migrations(evreg::migrations())
        .init()
        .await
        .with_context(|| format!("Failed to open database at {}", cfg.url))
}

fn check_tls_files(ssl: &SslConfig) -> Result<()> {
    for (what, path) in [("certificate", &ssl.cert), ("key", &ssl.key)] {
        if !path.exists() {
            anyhow::bail!("TLS {what} not found at: {}", path.display());
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if ssl.key.metadata()?.permissions().mode() & 0o077 != 0 {
            warn!(key = %ssl.key.display(), "TLS private key is readable by group or others");
        }
    }
    Ok(())
}

/// A built server; call [`Server::run`] to start serving.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Binds the configured address and serves until a shutdown signal arrives.
    ///
    /// # Errors
    /// Binding fails or the TLS material cannot be loaded.
    pub async fn run(self) -> Result<()> {
        let server_cfg = self.state.config.server.clone();
        let address = SocketAddr::new(server_cfg.address, server_cfg.port);
        let app = self.app().into_make_service();

        let handle = Handle::<SocketAddr>::new();
        tokio::spawn(drain_on_signal(handle.clone()));

        match &server_cfg.ssl {
            Some(ssl) => {
                let tls = RustlsConfig::from_pem_file(&ssl.cert, &ssl.key)
                    .await
                    .context("Failed to load TLS certificates")?;
                info!("Listening on https://{address}");
                axum_server::bind_rustls(address, tls)
                    .handle(handle)
                    .serve(app)
                    .await
                    .context("HTTPS server failed")?;
            },
            None => {
                info!("Listening on http://{address}");
                axum_server::bind(address).handle(handle).serve(app).await.context("HTTP server failed")?;
            },
        }

        info!("Server stopped");
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }

    /// Registration routes, `/health` and `/api` docs behind the trace and CORS layers.
    #[must_use]
    pub fn app(&self) -> Router {
        router::init(self.state.clone())
    }
}

async fn drain_on_signal(handle: Handle<SocketAddr>) {
    match shutdown_signal().await {
        Ok(()) => {
            info!(grace = ?SHUTDOWN_GRACE, "Shutdown requested, draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        },
        Err(e) => error!("Cannot listen for shutdown signals: {e:#}"),
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}

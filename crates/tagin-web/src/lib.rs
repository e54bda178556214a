//! HTTP dashboard for the tagin station.
//!
//! Serves the single-page dashboard, the latest-arrival JSON it polls, and
//! the form endpoint administrators use to register cards. The dashboard
//! page itself is a static file shipped with the station's resources.
//!
//! # Example Usage
//!
//! ```no_run
//! use tagin_station::Station;
//! use tagin_storage::{MemberRegistry, RegistryConfig};
//! use tagin_web::{WebConfig, serve};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = MemberRegistry::open(RegistryConfig::new("tag-users.csv")).await?;
//! let station = Station::with_registry(registry);
//!
//! let config = WebConfig::new("0.0.0.0:2000", "template/tagin.html");
//! serve(&config, station).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod routes;

pub use error::{WebError, WebResult};
pub use routes::AppState;

use axum::Router;
use std::path::PathBuf;
use tagin_core::constants::DASHBOARD_PAGE;
use tagin_station::Station;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "localhost:2000";

/// Configuration for the dashboard server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind, `host:port`
    pub bind_addr: String,

    /// Dashboard page served at `/`
    pub page_path: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            page_path: PathBuf::from(DASHBOARD_PAGE),
        }
    }
}

impl WebConfig {
    pub fn new(bind_addr: impl Into<String>, page_path: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            page_path: page_path.into(),
        }
    }
}

/// Build the complete application with request tracing.
pub fn app(config: &WebConfig, station: Station) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(station, config.page_path.clone()))
}

/// Bind the configured address.
///
/// # Errors
///
/// Returns [`WebError::Bind`] if the address cannot be bound.
pub async fn bind(config: &WebConfig) -> WebResult<TcpListener> {
    TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| WebError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })
}

/// Serve the dashboard on an already bound listener until the process exits.
///
/// # Errors
///
/// Returns an I/O error if the server stops unexpectedly.
pub async fn serve_on(listener: TcpListener, config: &WebConfig, station: Station) -> WebResult<()> {
    let local = listener.local_addr()?;
    info!(addr = %local, page = %config.page_path.display(), "Dashboard listening");
    axum::serve(listener, app(config, station).into_make_service()).await?;
    Ok(())
}

/// Bind and serve the dashboard.
///
/// # Errors
///
/// Returns an error if binding fails or the server stops unexpectedly.
pub async fn serve(config: &WebConfig, station: Station) -> WebResult<()> {
    let listener = bind(config).await?;
    serve_on(listener, config, station).await
}

//! Server runtime
//!
//! [`ServerHandle`] owns the whole lifecycle: database connection and
//! migrations, bootstrap admin, REST API and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::database::init_database_with_migrations;
use crate::interfaces::http::{create_api_router, AppState};
use crate::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use crate::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Options for starting the service.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup.
    pub auto_migrate: bool,
    /// Create the configured admin when the user table is empty.
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

/// Handle to a running service.
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub config: AppConfig,
    /// Address the API is bound to (useful when the configured port is 0)
    pub local_addr: std::net::SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownSignal,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, BoxError> {
        let app_cfg = opts.config;

        info!("Starting bike rental service...");

        // The global recorder can only be installed once per process.
        use std::sync::OnceLock;
        static PROM_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
            OnceLock::new();
        let prometheus_handle = match PROM_HANDLE.get() {
            Some(handle) => handle.clone(),
            None => {
                let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
                    .install_recorder()?;
                info!("Prometheus metrics recorder installed");
                PROM_HANDLE.get_or_init(|| handle).clone()
            }
        };

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig {
            url: app_cfg.database.url.clone(),
        };
        info!("Database: {}", db_config.url);
        let db = if opts.auto_migrate {
            init_database_with_migrations(&db_config).await?
        } else {
            init_database(&db_config).await?
        };

        // ── Repositories & services ────────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        let jwt_config = JwtConfig {
            secret: app_cfg.security.jwt_secret.clone(),
            expiration_hours: app_cfg.security.jwt_expiration_hours,
            issuer: "bike-rental".to_string(),
        };
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );

        let state = AppState::new(
            repos.clone(),
            jwt_config,
            app_cfg.security.password_hash_cost,
        );

        if opts.create_default_admin {
            let admin = &app_cfg.admin;
            if let Err(e) = state
                .user_service
                .ensure_admin(&admin.username, &admin.email, &admin.password)
                .await
            {
                error!("Failed to create admin user: {}", e);
            }
        }

        // ── REST API server ────────────────────────────────────
        let shutdown = ShutdownSignal::new();
        let api_router = create_api_router(state, prometheus_handle);

        let listener = tokio::net::TcpListener::bind(app_cfg.api_address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.shutdown.clone()));
    }

    /// Wait for the API to stop, bounded by `server.shutdown_timeout`, then
    /// close the database.
    pub async fn wait(self) {
        self.shutdown.wait().await;

        let timeout = Duration::from_secs(self.config.server.shutdown_timeout);
        info!("Waiting up to {}s for in-flight requests...", timeout.as_secs());
        match tokio::time::timeout(timeout, self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => warn!("Graceful shutdown timed out after {}s", timeout.as_secs()),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("Bike rental service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        self.wait().await;
    }
}

/// Initialize tracing from the logging section. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminConfig, DatabaseSection, SecurityConfig, ServerConfig};

    #[tokio::test]
    async fn starts_serves_health_and_shuts_down() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                shutdown_timeout: 5,
            },
            database: DatabaseSection {
                url: "sqlite::memory:".into(),
            },
            security: SecurityConfig {
                password_hash_cost: 4,
                ..Default::default()
            },
            admin: AdminConfig::default(),
            ..Default::default()
        };

        let handle = ServerHandle::start(ServerOptions {
            config,
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(handle.repos.users().count_users().await.unwrap(), 1);

        let mut stream = tokio::net::TcpStream::connect(handle.local_addr).await.unwrap();
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");

        tokio::time::timeout(Duration::from_secs(10), handle.shutdown())
            .await
            .unwrap();
    }
}

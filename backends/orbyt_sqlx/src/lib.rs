pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::SqlitePool;

use config::{CloudinaryConfig, Config};
use utils::identity::{FirebaseIdentity, IdentityProvider};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub identity: Arc<dyn IdentityProvider>,
    pub cloudinary: Arc<CloudinaryConfig>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(app_state: &AppState) -> SqlitePool {
        app_state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<dyn IdentityProvider> {
    fn from_ref(app_state: &AppState) -> Arc<dyn IdentityProvider> {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for Arc<CloudinaryConfig> {
    fn from_ref(app_state: &AppState) -> Arc<CloudinaryConfig> {
        app_state.cloudinary.clone()
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .context("failed to open the database")?;
    db::prepare_db(&pool)
        .await
        .context("failed to apply the schema")?;

    let identity = FirebaseIdentity::new(&config.firebase.project_id, &config.firebase.api_key);

    let state = AppState {
        pool,
        identity: Arc::new(identity),
        cloudinary: Arc::new(config.cloudinary.clone()),
    };

    let app = routes::generate_routes(state, &config)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(err) => log::error!("Failed to listen for Ctrl+C: {}", err),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                log::error!("Failed to install the terminate handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

mod config;
mod db;
mod error;
mod handler;
mod middleware;
mod model;
mod password;
mod route;
mod schema;
mod session;
mod store;
mod view;

use anyhow::Context;
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::AnyPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, DatabaseBackend},
    session::SessionSettings,
    store::{TodoStore, UserStore},
};

// Struct representing the application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) todos: TodoStore,
    pub(crate) users: UserStore,
    pub(crate) cookie_key: Key,
    pub(crate) session: SessionSettings,
    pub(crate) auth_required: bool,
}

impl AppState {
    pub fn new(
        pool: AnyPool,
        backend: DatabaseBackend,
        cookie_key: Key,
        session: SessionSettings,
        auth_required: bool,
    ) -> Self {
        Self {
            todos: TodoStore::new(pool.clone(), backend),
            users: UserStore::new(pool, backend),
            cookie_key,
            session,
            auth_required,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

// Entry point of the application
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(?config, "configuration loaded");

    let pool = db::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    db::migrate(&pool, config.database.backend)
        .await
        .context("failed to create the database schema")?;

    let cookie_key = match &config.session_secret {
        Some(secret) => Key::from(secret.as_slice()),
        None => {
            warn!("SESSION_SECRET is not set; sessions will not survive a restart");
            Key::generate()
        }
    };

    let session = SessionSettings {
        max_age_secs: config.session_max_age_secs,
        secure: !config.insecure_cookie,
    };

    password::warm_up();

    let app_state = AppState::new(
        pool,
        config.database.backend,
        cookie_key,
        session,
        config.auth_required,
    );
    let app = route::create_router(app_state);

    info!(addr = %config.bind_addr, auth_required = config.auth_required, "server started");

    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

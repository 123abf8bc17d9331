use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::PgPool;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use events_server::config::{Config, ConfigError, ServerConfig};
use events_server::db::{Database, DbError};
use events_server::lifecycle::{shutdown_signal, Server, ServerError};
use events_server::repository::PgEventRepository;
use events_server::routes::create_routes;
use events_server::state::AppState;

const DEFAULT_LOG_FILTER: &str = "events_server=info,tower_http=info";

#[derive(Debug, Error)]
enum StartupError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("database connection failed")]
    Database(#[from] DbError),

    #[error("server error")]
    Server(#[from] ServerError),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    let database: Arc<Database> = Arc::new(Database::new());
    let pool = database.connect(&config.database).await?;

    let result = serve(config.server, pool, Arc::clone(&database)).await;

    database.close().await;
    result
}

async fn serve(
    config: ServerConfig,
    pool: PgPool,
    database: Arc<Database>,
) -> Result<(), StartupError> {
    let state = AppState::new(PgEventRepository::new(pool), database);
    let router = create_routes(state, &config);

    let server = Server::bind(config, router).await?;
    let mut running = server.start();

    // Whichever finishes first decides the path; the other is dropped
    let listener_exit = tokio::select! {
        result = running.wait() => Some(result),
        () = shutdown_signal() => None,
    };

    match listener_exit {
        Some(result) => result?,
        None => running.shutdown().await?,
    }

    Ok(())
}

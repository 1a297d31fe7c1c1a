use anyhow::Result;
use sqlx::migrate::Migrator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod chat;
mod config;
mod error;
mod middleware;
mod models;
mod profiles;
mod proxy;
mod repositories;
mod reviews;
mod routes;
mod state;
#[cfg(test)]
mod testing;
mod trips;

use common::cache::RedisPool;
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};

use crate::{
    config::AppConfig, middleware::JwtVerifier, proxy::ProxyService,
    repositories::PgRepository, state::AppState,
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Roam API service");

    let config = AppConfig::load()?;

    // Initialize database connection pool
    let pool = init_pool(&DatabaseConfig::from(&config.database)).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;

    let cache = match config.redis.redis_config() {
        Some(redis_config) => Some(RedisPool::new(&redis_config).await?),
        None => {
            warn!("Redis is not configured; proxy responses will not be cached");
            None
        }
    };

    let app_state = AppState {
        repository: Arc::new(PgRepository::new(pool)),
        proxy: ProxyService::new(config.proxy.clone(), cache.clone())?,
        cache,
        jwt: JwtVerifier::from_config(&config.auth)?,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Roam API listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

//! Vidlearn - a video learning platform

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidlearn::{
    api::{self, AppState},
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidlearn=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vidlearn...");

    // Load configuration
    let config_path = std::env::var("VIDLEARN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yml"));
    let config = Config::load_with_env(&config_path)?;
    config.validate()?;
    tracing::info!("Configuration loaded from {}", config_path.display());

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    let pending = db::migrations::pending_count(&pool).await?;
    if pending > 0 {
        tracing::info!("{} pending migration(s)", pending);
    }
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database ready ({} migrations applied)", applied);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let admin = config.admin.clone();

    // Build application state
    let state = AppState::new(pool, config)?;

    if let Some(admin) = admin {
        match state.auth.bootstrap_admin(&admin).await {
            Ok(Some(user)) => tracing::info!("Created admin account {}", user.email),
            Ok(None) => tracing::debug!("Admin account already present"),
            Err(e) => tracing::warn!("Could not create admin account: {}", e),
        }
    }

    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

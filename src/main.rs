use std::sync::Arc;

use lostfound_api::config::Config;
use lostfound_api::db::create_pool;
use lostfound_api::routes::{router, AppState};
use lostfound_api::services::{AuthService, ItemsService};
use lostfound_api::storage::LocalImageStore;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lostfound_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting lostfound-api server...");
    tracing::info!("Connecting to database...");

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connection established");

    let store = LocalImageStore::new(&config.upload_dir).await?;
    let upload_dir = store.root().to_path_buf();
    tracing::info!("Serving uploads from {}", upload_dir.display());

    let state = AppState {
        items: ItemsService::new(pool.clone(), Arc::new(store)),
        auth: AuthService::new(pool, config.jwt_secret.clone()),
        jwt_secret: config.jwt_secret.clone(),
    };

    let app = router(state, &upload_dir);

    let addr = config.server_addr();
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use travel::auth::StubCredentialsProvider;
use travel::config::AppConfig;
use travel::error::AppError;
use travel::routes::create_router;
use travel::services::storage::FileKeyValueStore;
use travel::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;

    let store = FileKeyValueStore::new(config.data_root.clone());
    store.ensure_structure().await?;
    info!("storing trips under {}", store.root().display());

    let state = AppState::new(
        config.clone(),
        Arc::new(store),
        Arc::new(StubCredentialsProvider),
    );

    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,travel=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

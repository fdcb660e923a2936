use std::{net::SocketAddr, sync::Arc, time::Duration};

use bizchat_api::{build_router, state::AppState};
use bizchat_config::Settings;
use bizchat_db::{DocumentStore, MongoStore, connect, ensure_indexes};
use bizchat_services::{ClaudeCompletion, CompletionService};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "bizchat_api=debug,bizchat_services=debug,bizchat_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting bizchat API on {}:{}", settings.app.host, settings.app.port);
    if settings.ai.api_key.is_none() {
        warn!("No AI API key configured; chat replies will fail until one is set");
    }

    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;

    let store: Arc<dyn DocumentStore> = Arc::new(MongoStore::new(
        db,
        Duration::from_secs(settings.database.op_timeout_secs),
    ));
    let completion: Arc<dyn CompletionService> = Arc::new(ClaudeCompletion::new(&settings.ai));

    let app_state = AppState::new(store, settings.clone(), completion)?;
    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

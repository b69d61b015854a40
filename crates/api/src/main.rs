use clinscribe_api::{build_router, state::AppState};
use clinscribe_config::Settings;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clinscribe=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let db = clinscribe_db::connect(&settings.database).await?;
    clinscribe_db::indexes::ensure_indexes(&db).await?;

    let state = AppState::new(&db, settings);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "clinscribe API listening");

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

use clinscribe_config::DatabaseSettings;
use mongodb::{Client, Database};
use tracing::info;

/// Connects to MongoDB and returns a handle to the configured database.
pub async fn connect(settings: &DatabaseSettings) -> mongodb::error::Result<Database> {
    let client = Client::with_uri_str(&settings.uri).await?;
    let db = client.database(&settings.database);

    // Ping so an unreachable cluster fails at startup, not on first request
    db.run_command(bson::doc! { "ping": 1 }).await?;
    info!(database = %settings.database, "Connected to MongoDB");

    Ok(db)
}

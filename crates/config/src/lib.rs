use serde::Deserialize;

/// Top-level application settings.
///
/// Loaded from (lowest to highest precedence): built-in defaults, an
/// optional `config/default.toml`, and `CLINSCRIBE_`-prefixed environment
/// variables (`CLINSCRIBE_DATABASE__URI`, `CLINSCRIBE_SERVER__PORT`, …).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub transcription: TranscriptionSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub uri: String,
    pub database: String,
}

/// Settings for the external transcription + structuring backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Hard wall-clock ceiling for a single transcription call, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.uri", "mongodb://localhost:27017")?
            .set_default("database.database", "clinscribe")?
            .set_default("transcription.base_url", "http://localhost:8000")?
            // 10 minutes: multi-file encounters routinely take several
            // minutes of backend processing.
            .set_default("transcription.timeout_secs", 600)?
            .set_default("auth.jwt_secret", "dev-secret-change-me")?
            .set_default("auth.token_ttl_secs", 86400)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("CLINSCRIBE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

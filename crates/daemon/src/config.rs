//! Daemon configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `WAITROOM_*` environment variables (`__` between sections,
//! e.g. `WAITROOM_QUEUE__MAX_CONCURRENT_USERS=10`).

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use waitroom_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use waitroom_core::domain::capacity::{
    DEFAULT_ESTIMATED_SERVICE_TIME_SECONDS, DEFAULT_MAX_CONCURRENT_USERS,
    DEFAULT_TICK_INTERVAL_SECS, DEFAULT_TIMEOUT_MINUTES,
};
use waitroom_core::domain::Capacity;
use waitroom_infra_token::DEFAULT_TOKEN_TTL_HOURS;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "WAITROOM_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "waitroom.toml";
const ENV_PREFIX: &str = "WAITROOM";
const DEFAULT_DB_PATH: &str = "~/.waitroom/waitroom.db";
const MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub queue: Capacity,
    pub database: DatabaseSettings,
    pub rpc: RpcSettings,
    pub token: TokenSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub path: String,
}

impl DatabaseSettings {
    /// sqlx URL with `~` expanded (`:memory:` maps to an in-memory database)
    pub fn url(&self) -> String {
        if self.path == MEMORY_DB {
            return "sqlite::memory:".to_string();
        }
        waitroom_infra_sqlite::database_url(&self.expanded_path())
    }

    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).into_owned()
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_DB
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSettings {
    pub ttl_hours: u64,
}

/// Load settings from file + environment
pub fn load() -> Result<Settings> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let builder = defaults()?
        .add_source(File::with_name(&path).required(explicit.is_some()))
        .add_source(environment());

    finish(builder).with_context(|| format!("Failed to load configuration (file: {})", path))
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let builder = Config::builder()
        .set_default("queue.max_concurrent_users", DEFAULT_MAX_CONCURRENT_USERS as i64)?
        .set_default("queue.timeout_minutes", DEFAULT_TIMEOUT_MINUTES as i64)?
        .set_default(
            "queue.estimated_service_time_seconds",
            DEFAULT_ESTIMATED_SERVICE_TIME_SECONDS as i64,
        )?
        .set_default("queue.tick_interval_secs", DEFAULT_TICK_INTERVAL_SECS as i64)?
        .set_default("database.path", DEFAULT_DB_PATH)?
        .set_default("rpc.host", DEFAULT_RPC_HOST)?
        .set_default("rpc.port", DEFAULT_RPC_PORT as i64)?
        .set_default("token.ttl_hours", DEFAULT_TOKEN_TTL_HOURS as i64)?;
    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;

    settings
        .queue
        .validate()
        .context("Invalid [queue] settings")?;
    if settings.token.ttl_hours == 0 {
        anyhow::bail!("token.ttl_hours must be > 0");
    }

    Ok(settings)
}

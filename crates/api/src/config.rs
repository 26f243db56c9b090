//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::UserId;
use domain::User;
use fulfillment::LifecycleConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS` (default `10`), `DATABASE_ACQUIRE_TIMEOUT_SECS` (default `5`)
/// - `REQUEST_TIMEOUT_SECS` (default `30`)
/// - `NOTIFY_TIMEOUT_MS` (default `2000`)
/// - `SOFT_DELETE_RELEASES_STOCK` (default `true`)
/// - `BOOTSTRAP_ADMIN_ID`, `BOOTSTRAP_ADMIN_EMAIL`: seed admin, only when both are set
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_acquire_timeout: Duration,
    pub request_timeout: Duration,
    pub notify_timeout: Duration,
    pub soft_delete_releases_stock: bool,
    pub bootstrap_admin_id: Option<UserId>,
    pub bootstrap_admin_email: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| read_var(&lookup, key);

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
                Some(format) if format == "json" => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: var("DATABASE_URL"),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_acquire_timeout: parse_var(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.database_acquire_timeout),
            request_timeout: parse_var(&lookup, "REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            notify_timeout: parse_var(&lookup, "NOTIFY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.notify_timeout),
            soft_delete_releases_stock: parse_var(&lookup, "SOFT_DELETE_RELEASES_STOCK")
                .unwrap_or(defaults.soft_delete_releases_stock),
            bootstrap_admin_id: parse_var(&lookup, "BOOTSTRAP_ADMIN_ID"),
            bootstrap_admin_email: var("BOOTSTRAP_ADMIN_EMAIL"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            soft_delete_releases_stock: self.soft_delete_releases_stock,
            notify_timeout: self.notify_timeout,
        }
    }

    /// The seed administrator, if both its id and email are configured.
    pub fn bootstrap_admin(&self) -> Option<User> {
        match (self.bootstrap_admin_id, &self.bootstrap_admin_email) {
            (Some(id), Some(email)) => Some(User::bootstrap_admin(id, email.trim())),
            _ => None,
        }
    }
}

fn read_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    read_var(lookup, key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            database_acquire_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            notify_timeout: Duration::from_millis(2000),
            soft_delete_releases_stock: true,
            bootstrap_admin_id: None,
            bootstrap_admin_email: None,
        }
    }
}

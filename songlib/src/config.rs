//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` and can be set with `-f` or `SONGLIB_CONFIG`.
//!
//! ## Loading Priority
//!
//! Sources are merged in this order (later sources override earlier ones):
//!
//! 1. **YAML config file**
//! 2. **`SONGLIB_`-prefixed variables**, with `__` separating nested keys
//!    (`SONGLIB_DATABASE__POOL__MAX_CONNECTIONS=20`)
//! 3. **Plain deployment variables**, kept for existing `.env` files:
//!
//! | Variable            | Key                  |
//! |---------------------|----------------------|
//! | `PORT`              | `port`               |
//! | `DOMAIN_NAME`       | `domain`             |
//! | `DEBUG`             | `debug`              |
//! | `DB_HOST`           | `database.host`      |
//! | `DB_PORT`           | `database.port`      |
//! | `DB_USER`           | `database.user`      |
//! | `DB_PSWD`           | `database.password`  |
//! | `DB_NAME`           | `database.name`      |
//! | `DATABASE_URL`      | `database.url`       |
//! | `EXTERNAL_API_ADDR` | `lookup.base_url`    |
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use songlib::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use crate::lookup::LookupConfig;
use anyhow::bail;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::{str::FromStr, time::Duration};
use url::Url;

/// Plain environment variables and the configuration keys they set
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "port"),
    ("DOMAIN_NAME", "domain"),
    ("DEBUG", "debug"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PSWD", "database.password"),
    ("DB_NAME", "database.name"),
    ("DATABASE_URL", "database.url"),
    ("EXTERNAL_API_ADDR", "lookup.base_url"),
];

/// Simple CLI args
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SONGLIB_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Log at debug level (same as `debug: true` in the config file)
    #[arg(long)]
    pub debug: bool,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Public host name of the service, used in the API documentation
    pub domain: String,
    /// Raise the default log level to `debug`
    pub debug: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    pub database: DatabaseConfig,
    pub lookup: LookupConfig,
    pub cors: CorsConfig,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_secs > 0).then(|| Duration::from_secs(self.max_lifetime_secs))
    }
}

/// PostgreSQL connection settings.
///
/// Either give a full `url`, or the individual parts. User and password have no defaults.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "optional_scalar_string")]
    pub user: Option<String>,
    #[serde(deserialize_with = "optional_scalar_string", skip_serializing)]
    pub password: Option<String>,
    /// Database name; created on startup when missing and `create_if_missing` is set
    #[serde(deserialize_with = "scalar_string")]
    pub name: String,
    /// Full connection string, takes precedence over the individual parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub create_if_missing: bool,
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: None,
            password: None,
            name: "postgres".to_string(),
            url: None,
            create_if_missing: true,
            pool: PoolSettings::default(),
        }
    }
}

const REDACTED: &str = "<redacted>";

/// Password-free rendering of a connection string; unparsable strings are hidden entirely.
fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some(REDACTED));
            }
            url.to_string()
        }
        Err(_) => REDACTED.to_string(),
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("name", &self.name)
            .field("url", &self.url.as_deref().map(redact_database_url))
            .field("create_if_missing", &self.create_if_missing)
            .field("pool", &self.pool)
            .finish()
    }
}

impl DatabaseConfig {
    /// Options for connecting to the service database
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return Ok(PgConnectOptions::from_str(url)?);
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name);
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Options for the `postgres` maintenance database on the same server, used to create the
    /// service database
    pub fn maintenance_options(&self) -> anyhow::Result<PgConnectOptions> {
        Ok(self.connect_options()?.database("postgres"))
    }

    /// Name of the database the service connects to
    pub fn database_name(&self) -> anyhow::Result<String> {
        let options = self.connect_options()?;
        Ok(options.get_database().unwrap_or(&self.name).to_string())
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600),
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard", serialize_with = "serialize_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn serialize_wildcard<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("*")
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Environment values are parsed as numbers or booleans when they look like one, so a password
/// of `12345` arrives as an integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::String(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Uint(u) => u.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Scalar>::deserialize(deserializer).map(|value| value.map(String::from))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            domain: "localhost".to_string(),
            debug: false,
            enable_otel_export: false,
            database: DatabaseConfig::default(),
            lookup: LookupConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;
        config.debug |= args.debug;

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> anyhow::Result<()> {
        let db = &self.database;
        if db.url.is_none() {
            if db.user.as_deref().is_none_or(str::is_empty) {
                bail!("Config validation: database user is not set. Set DB_USER or database.user, or provide database.url.");
            }
            if db.password.is_none() {
                bail!(
                    "Config validation: database password is not set. Set DB_PSWD or database.password, or provide database.url."
                );
            }
            if db.name.trim().is_empty() {
                bail!("Config validation: database name cannot be empty.");
            }
        }

        if db.pool.max_connections == 0 {
            bail!("Config validation: database.pool.max_connections must be at least 1.");
        }

        if db.pool.min_connections > db.pool.max_connections {
            bail!(
                "Config validation: database.pool.min_connections ({}) cannot be greater than max_connections ({})",
                db.pool.min_connections,
                db.pool.max_connections
            );
        }

        if self.lookup.timeout.is_zero() {
            bail!("Config validation: lookup.timeout must be greater than zero.");
        }

        if self.cors.allowed_origins.is_empty() {
            bail!("Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.");
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let figment = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("SONGLIB_").split("__"));

        LEGACY_ENV_KEYS.iter().fold(figment, |figment, &(var, key)| {
            figment.merge(Env::raw().only(&[var]).map(move |_| key.into()))
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

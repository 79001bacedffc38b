use std::env;

use auth::LockoutPolicy;
use chrono::Duration;
use config::builder::DefaultState;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Required when `storage.backend = "postgres"`
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Token signing and lifetimes. Lifetimes are in milliseconds.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Base64-encoded HMAC key
    pub secret: String,
    pub expiration: i64,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    pub expiration: i64,
}

impl JwtConfig {
    pub fn access_lifetime(&self) -> Duration {
        Duration::milliseconds(self.expiration)
    }

    pub fn refresh_lifetime(&self) -> Duration {
        Duration::milliseconds(self.refresh.expiration)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    #[serde(rename = "max-login-attempts", default = "default_max_login_attempts")]
    pub max_login_attempts: u32,

    #[serde(
        rename = "account-lock-duration-minutes",
        default = "default_lock_duration_minutes"
    )]
    pub account_lock_duration_minutes: i64,
}

fn default_max_login_attempts() -> u32 {
    LockoutPolicy::DEFAULT_MAX_ATTEMPTS
}

fn default_lock_duration_minutes() -> i64 {
    LockoutPolicy::DEFAULT_LOCK_MINUTES
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: default_max_login_attempts(),
            account_lock_duration_minutes: default_lock_duration_minutes(),
        }
    }
}

impl SecurityConfig {
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::from_minutes(self.max_login_attempts, self.account_lock_duration_minutes)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Where principals are persisted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let builder = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(environment());

        Self::build(builder)
    }

    fn build(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Config = builder.build()?.try_deserialize()?;

        if config.jwt.expiration <= 0 || config.jwt.refresh.expiration <= 0 {
            return Err(ConfigError::Message(
                "jwt.expiration and jwt.refresh.expiration must be positive".to_string(),
            ));
        }

        if config.security.max_login_attempts == 0 {
            return Err(ConfigError::Message(
                "security.max-login-attempts must be at least 1".to_string(),
            ));
        }

        let lock_minutes = config.security.account_lock_duration_minutes;
        if !(1..=LockoutPolicy::MAX_LOCK_MINUTES).contains(&lock_minutes) {
            return Err(ConfigError::Message(format!(
                "security.account-lock-duration-minutes must be between 1 and {}",
                LockoutPolicy::MAX_LOCK_MINUTES
            )));
        }

        Ok(config)
    }
}

/// Unprefixed environment source: `SECTION__KEY` maps to `section.key`.
fn environment() -> Environment {
    Environment::default().separator("__")
}

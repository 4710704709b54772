use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{DigestAlgorithm, TokenSpec, MAX_PAYLOAD_SIZE};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// In-memory stores are used when absent (development only)
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub max_age_secs: u64,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub cookie_secret_key: String,
    pub admin_secret_key: String,
    /// Empty disables start-token checks
    pub start_secret_key: String,
    pub token_digest: DigestAlgorithm,
    pub token_payload_size: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingSecret(&'static str),

    #[error("DATABASE_URL is required in {0:?}")]
    MissingDatabase(Environment),

    #[error("RELAY_TIMEOUT_MS must be greater than zero")]
    InvalidRelayTimeout,

    #[error("TOKEN_PAYLOAD_SIZE must be between 1 and {0}")]
    InvalidTokenPayload(usize),
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("cookie_secret_key", &redact(&self.cookie_secret_key))
            .field("admin_secret_key", &redact(&self.admin_secret_key))
            .field("start_secret_key", &redact(&self.start_secret_key))
            .field("token_digest", &self.token_digest)
            .field("token_payload_size", &self.token_payload_size)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl SecurityConfig {
    pub fn token_spec(&self) -> TokenSpec {
        let spec = TokenSpec::new(self.token_digest);
        match self.token_payload_size {
            Some(size) => spec.with_payload_size(size),
            None => spec,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("CAPTAIN_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("CAPTAIN_DEBUG") {
            self.server.debug = parse_flag(&v).unwrap_or(self.server.debug);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            if !v.is_empty() {
                self.session.cookie_name = v;
            }
        }
        if let Ok(v) = env::var("SESSION_COOKIE_DOMAIN") {
            self.session.cookie_domain = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SESSION_COOKIE_SECURE") {
            self.session.cookie_secure = parse_flag(&v).unwrap_or(self.session.cookie_secure);
        }
        if let Ok(v) = env::var("SESSION_MAX_AGE_SECS") {
            self.session.max_age_secs = v.parse().unwrap_or(self.session.max_age_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("COOKIE_SECRET_KEY") {
            self.security.cookie_secret_key = v;
        }
        if let Ok(v) = env::var("ADMIN_SECRET_KEY") {
            self.security.admin_secret_key = v;
        }
        if let Ok(v) = env::var("START_SECRET_KEY") {
            self.security.start_secret_key = v;
        }
        if let Ok(v) = env::var("TOKEN_DIGEST") {
            self.security.token_digest = v.parse().unwrap_or(self.security.token_digest);
        }
        if let Ok(v) = env::var("TOKEN_PAYLOAD_SIZE") {
            self.security.token_payload_size = v.parse().ok().filter(|n| *n > 0);
        }

        // Relay overrides
        if let Ok(v) = env::var("RELAY_TIMEOUT_MS") {
            self.relay.timeout_ms = v.parse().unwrap_or(self.relay.timeout_ms);
        }

        self
    }

    /// Refuse configurations that would run without secrets
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.cookie_secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("COOKIE_SECRET_KEY"));
        }
        if self.security.admin_secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("ADMIN_SECRET_KEY"));
        }
        if self.database.url.is_none() && self.environment != Environment::Development {
            return Err(ConfigError::MissingDatabase(self.environment));
        }
        if self.relay.timeout_ms == 0 {
            return Err(ConfigError::InvalidRelayTimeout);
        }
        if let Some(size) = self.security.token_payload_size {
            if size == 0 || size > MAX_PAYLOAD_SIZE {
                return Err(ConfigError::InvalidTokenPayload(MAX_PAYLOAD_SIZE));
            }
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 8081,
                debug: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            session: SessionConfig {
                cookie_name: "session-key".to_string(),
                cookie_domain: None,
                cookie_secure: false,
                max_age_secs: 24 * 3600,
            },
            security: SecurityConfig {
                cookie_secret_key: String::new(),
                admin_secret_key: String::new(),
                start_secret_key: String::new(),
                token_digest: DigestAlgorithm::Sha1,
                token_payload_size: None,
            },
            relay: RelayConfig { timeout_ms: 10_000 },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 8081,
                debug: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            session: SessionConfig {
                cookie_name: "session-key".to_string(),
                cookie_domain: None,
                cookie_secure: true,
                max_age_secs: 24 * 3600,
            },
            security: SecurityConfig {
                cookie_secret_key: String::new(),
                admin_secret_key: String::new(),
                start_secret_key: String::new(),
                token_digest: DigestAlgorithm::Sha1,
                token_payload_size: None,
            },
            relay: RelayConfig { timeout_ms: 5_000 },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 8081,
                debug: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            session: SessionConfig {
                cookie_name: "session-key".to_string(),
                cookie_domain: None,
                cookie_secure: true,
                max_age_secs: 24 * 3600,
            },
            security: SecurityConfig {
                cookie_secret_key: String::new(),
                admin_secret_key: String::new(),
                start_secret_key: String::new(),
                token_digest: DigestAlgorithm::Sha1,
                token_payload_size: None,
            },
            relay: RelayConfig { timeout_ms: 5_000 },
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing")]
    MissingVariable(String),
    #[error("Failed to parse environment variable {variable}: {message}")]
    ParseError { variable: String, message: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub workers: WorkerConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Seconds readiness stays red before in-flight requests are cut
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
}

impl RedisConfig {
    /// Build the connection URL the redis crate understands
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Rolling failed-login threshold before lockout
    pub max_login_failures: u64,
    /// Rolling window in minutes for failure accounting and the lock
    pub login_window_minutes: i64,
    /// Comma-separated allowlist of service UUIDs; empty = allow all
    pub service_allowlist: Vec<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Master toggle for all background workers
    pub enabled: bool,
    /// Outbox publisher poll interval in seconds
    pub outbox_poll_secs: u64,
    /// Sanction expiry sweep interval in seconds
    pub sanction_sweep_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            variable: name.to_string(),
            message: e.to_string(),
        })
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv();

        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8080")?,
            workers: env::var("SERVER_WORKERS")
                .ok()
                .map(|v| {
                    v.parse().map_err(|e: std::num::ParseIntError| {
                        ConfigError::ParseError {
                            variable: "SERVER_WORKERS".to_string(),
                            message: e.to_string(),
                        }
                    })
                })
                .transpose()?,
            shutdown_grace_secs: parse_var("SHUTDOWN_GRACE_SECS", "30")?,
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            min_connections: parse_var("DATABASE_MIN_CONNECTIONS", "1")?,
        };

        let redis = RedisConfig {
            host: env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("REDIS_PORT", "6379")?,
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            db: parse_var("REDIS_DB", "0")?,
        };

        let service_allowlist = env::var("SERVICE_REGISTRY_ALLOW")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|e: uuid::Error| ConfigError::ParseError {
                        variable: "SERVICE_REGISTRY_ALLOW".to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let auth = AuthConfig {
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?,
            max_login_failures: parse_var("LOGIN_MAX_FAILURES", "5")?,
            login_window_minutes: parse_var("LOGIN_WINDOW_MINUTES", "15")?,
            service_allowlist,
        };

        let workers = WorkerConfig {
            enabled: parse_var("WORKERS_ENABLED", "true")?,
            outbox_poll_secs: parse_var("OUTBOX_POLL_SECS", "1")?,
            sanction_sweep_secs: parse_var("SANCTION_SWEEP_SECS", "60")?,
        };

        let cors = CorsConfig {
            allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            },
        };

        Ok(ApiConfig {
            server,
            database,
            redis,
            auth,
            workers,
            cors,
            logging,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.url.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidConfig(
                "JWT_SECRET must be at least 16 characters".to_string(),
            ));
        }

        if self.auth.max_login_failures == 0 {
            return Err(ConfigError::InvalidConfig(
                "Login failure threshold must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ApiConfig {
        ApiConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: None,
                shutdown_grace_secs: 30,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/girok".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                host: "127.0.0.1".to_string(),
                port: 6379,
                password: None,
                db: 0,
            },
            auth: AuthConfig {
                jwt_secret: "a-long-enough-test-secret".to_string(),
                max_login_failures: 5,
                login_window_minutes: 15,
                service_allowlist: vec![],
            },
            workers: WorkerConfig {
                enabled: true,
                outbox_poll_secs: 1,
                sanction_sweep_secs: 60,
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    #[test]
    fn test_validation() {
        let mut config = base_config();
        assert!(config.validate().is_ok());

        config.server.port = 0;
        assert!(config.validate().is_err());

        config = base_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        config = base_config();
        config.auth.max_login_failures = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redis_url() {
        let mut config = base_config();
        assert_eq!(config.redis.url(), "redis://127.0.0.1:6379/0");

        config.redis.password = Some("hunter2".to_string());
        config.redis.db = 2;
        assert_eq!(config.redis.url(), "redis://:hunter2@127.0.0.1:6379/2");
    }

    #[test]
    fn test_server_address() {
        let config = base_config();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_lockout_defaults() {
        let config = base_config();
        assert_eq!(config.auth.max_login_failures, 5);
        assert_eq!(config.auth.login_window_minutes, 15);
    }
}

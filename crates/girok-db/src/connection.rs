//! Database connection management

use crate::error::{DbError, DbResult};
use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaOrmConnection};
use std::time::Duration;

/// Type alias for the pooled database connection
pub type DatabaseConnection = SeaOrmConnection;

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl PoolConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

/// Establish a pooled database connection
pub async fn establish_connection(config: &PoolConfig) -> DbResult<DatabaseConnection> {
    let mut connect_options = ConnectOptions::new(config.url.clone());

    connect_options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    tracing::info!("Establishing database connection");

    let connection = Database::connect(connect_options)
        .await
        .map_err(DbError::from)?;

    tracing::info!("Database connection established");
    Ok(connection)
}

/// Test database connectivity with a ping
pub async fn test_connection(connection: &DatabaseConnection) -> DbResult<()> {
    connection.ping().await.map_err(DbError::from)?;
    Ok(())
}

/// Close the connection pool gracefully
pub async fn close_connection(connection: DatabaseConnection) -> DbResult<()> {
    connection.close().await.map_err(DbError::from)?;
    tracing::info!("Database connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::new("postgres://localhost/girok".to_string());

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout_secs, 30);
    }
}

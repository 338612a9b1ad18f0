use crate::error::DbError;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use std::io;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Interval between attempts to reach the database at startup.
const CONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// How long a request may wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to open the connection pool.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// PostgreSQL connection string.
    pub dsn: String,
    /// Reported to Postgres as `application_name`.
    pub application_name: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Seconds to keep retrying before giving up.
    pub connect_retries: u64,
}

/// Reachability probe used by the `/health` endpoint.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health(&self) -> Result<(), DbError>;
}

/// The shared connection pool plus the bounds it was opened with.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    min_connections: u32,
}

/// One connection attempt that never outlives a tick.
async fn probe(options: &PgConnectOptions) -> Result<(), sqlx::Error> {
    let connection = tokio::time::timeout(CONNECT_INTERVAL, PgConnection::connect_with(options))
        .await
        .map_err(|_| {
            sqlx::Error::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "connection attempt timed out",
            ))
        })??;

    if let Err(e) = connection.close().await {
        tracing::debug!(error = %e, "Cannot close probe connection");
    }
    Ok(())
}

impl Database {
    /// Opens the connection pool, retrying once a second until
    /// `connect_retries` seconds have passed.
    ///
    /// Each tick probes with a single connection bounded by the tick interval,
    /// so a refused or hanging server costs one tick per attempt. The pool is
    /// built after the first successful probe.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, DbError> {
        let options = PgConnectOptions::from_str(&config.dsn)
            .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?
            .application_name(&config.application_name);

        let pool_options = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT);

        let deadline = Duration::from_secs(config.connect_retries);
        let mut attempts: u32 = 0;
        let mut last_error = None;

        let connecting = async {
            let mut ticker = tokio::time::interval(CONNECT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                attempts += 1;
                tracing::info!(attempt = attempts, "Trying to connect to the database");

                match probe(&options).await {
                    Ok(()) => match pool_options.clone().connect_with(options.clone()).await {
                        Ok(pool) => return pool,
                        Err(e) => last_error = Some(e),
                    },
                    Err(e) => last_error = Some(e),
                }
                if let Some(e) = &last_error {
                    tracing::warn!(attempt = attempts, error = %e, "Database connection attempt failed");
                }
            }
        };

        let outcome = tokio::time::timeout(deadline, connecting).await;
        match outcome {
            Ok(pool) => {
                tracing::info!(attempts, "Connected to the database");
                Ok(Self {
                    pool,
                    min_connections: config.min_connections,
                })
            }
            Err(_) => Err(DbError::ConnectionTimeout {
                seconds: config.connect_retries,
                attempts,
                last_error,
            }),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies every pending migration under `./migrations`.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        tracing::info!("Applying migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    /// Closes every pooled connection, giving up after `grace`.
    pub async fn close(&self, grace: Duration) {
        tracing::info!("Closing database");
        if tokio::time::timeout(grace, self.pool.close()).await.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Timed out waiting for database connections to close"
            );
        }
    }
}

#[async_trait]
impl HealthCheck for Database {
    async fn health(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Unreachable)?;

        let size = self.pool.size();
        if size < self.min_connections {
            return Err(DbError::PoolBelowMinimum {
                size,
                min: self.min_connections,
            });
        }

        Ok(())
    }
}

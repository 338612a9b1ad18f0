//! # Zeus Database Crate
//!
//! Everything that talks to PostgreSQL: the connection pool, the error
//! classifier and the transactional user repository.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** SQL and driver details stay inside this crate. Callers see
//!   `UserRepository` and a small `DbError` taxonomy.
//! - **Classify once:** every `sqlx::Error` is mapped onto `DbError` at the
//!   repository boundary (`From<sqlx::Error>`), so callers branch on kinds such
//!   as `NoRows` or `IntegrityViolation` instead of driver codes.
//! - **Pooled or transactional:** a `PgUserRepository` runs on the pool or on
//!   an open transaction; `transaction` hands the closure a repository bound to
//!   a serializable transaction that commits on success and rolls back on error
//!   or panic.
//!
//! ## Public API
//!
//! - `Database`: opens the pool with bounded retries, health checks, closes.
//! - `PgUserRepository` / `UserRepository`: user persistence.
//! - `classify` / `DbError`: the error taxonomy.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{ConnectionConfig, Database, HealthCheck};
pub use error::{DbError, classify};
pub use repository::{PgUserRepository, UserRepository};

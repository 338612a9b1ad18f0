use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use thiserror::Error;

/// SQLSTATE class for integrity constraint violations (unique, foreign key,
/// not null, check, exclusion).
const INTEGRITY_CONSTRAINT_VIOLATION_CLASS: &str = "23";

static SQLSTATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(SQLSTATE ([0-9A-Z]{5})\)").expect("SQLSTATE pattern is valid")
});

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database connection configuration: {0}")]
    ConnectionConfigError(String),

    #[error("Cannot connect to the database within {seconds}s ({attempts} attempts)")]
    ConnectionTimeout {
        seconds: u64,
        attempts: u32,
        #[source]
        last_error: Option<sqlx::Error>,
    },

    #[error("Database unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("Database pool size {size} is below the minimum of {min}")]
    PoolBelowMinimum { size: u32, min: u32 },

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("No rows in result set")]
    NoRows(#[source] sqlx::Error),

    #[error("Integrity constraint violation (SQLSTATE {code})")]
    IntegrityViolation {
        code: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Cannot begin transaction: {0}")]
    BeginFailure(#[source] sqlx::Error),

    #[error("Cannot commit transaction: {0}")]
    CommitFailure(#[source] sqlx::Error),

    #[error("Cannot rollback transaction: {0}")]
    RollbackFailure(#[source] sqlx::Error),

    #[error("The transaction has already finished")]
    TransactionClosed,

    #[error("Database query failed: {0}")]
    Query(#[source] sqlx::Error),
}

impl DbError {
    /// The query matched zero rows where exactly one was expected.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, DbError::NoRows(_))
    }

    /// A unique, foreign key, not null or check constraint rejected the write.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, DbError::IntegrityViolation { .. })
    }
}

/// Every driver error goes through [`classify`], so `?` at the repository
/// boundary is the one place errors get interpreted.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        classify(err)
    }
}

/// Maps a driver error onto the storage taxonomy.
///
/// Unrecognised errors are passed through as [`DbError::Query`] with the
/// original error as their source.
pub fn classify(err: sqlx::Error) -> DbError {
    if matches!(err, sqlx::Error::RowNotFound) {
        return DbError::NoRows(err);
    }

    match sqlstate(&err).map(Cow::into_owned) {
        Some(code) if code.starts_with(INTEGRITY_CONSTRAINT_VIOLATION_CLASS) => {
            DbError::IntegrityViolation { code, source: err }
        }
        _ => DbError::Query(err),
    }
}

/// The vendor error code, from the driver when it exposes one, otherwise from
/// the `(SQLSTATE xxxxx)` suffix in the error text.
fn sqlstate(err: &sqlx::Error) -> Option<Cow<'_, str>> {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return Some(code);
        }
    }

    let text = err.to_string();
    SQLSTATE_PATTERN
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .map(|code| Cow::Owned(code.as_str().to_owned()))
}

use crate::error::DbError;
use async_trait::async_trait;
use core_types::User;
use futures::FutureExt;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Storage operations on users, independent of the connection they run on.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts `user` and returns the row as stored.
    async fn create(&self, user: &User) -> Result<User, DbError>;

    /// Fetches the active user with `id`. Zero rows is [`DbError::NoRows`].
    async fn get_by_id(&self, id: Uuid) -> Result<User, DbError>;

    /// Active users whose username contains `username`, oldest first.
    async fn list(&self, username: &str) -> Result<Vec<User>, DbError>;

    /// Runs `f` atomically against a repository bound to one transaction.
    ///
    /// The transaction commits when `f` returns `Ok`. It rolls back when `f`
    /// returns `Err`, which is handed back unchanged so callers can still
    /// branch on its kind, or panics, in which case the panic is resumed after
    /// the rollback. Calling `transaction` on a repository that is already
    /// bound to a transaction joins it.
    async fn transaction<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(Self) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + fmt::Display + Send;
}

type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// What a repository runs its queries on.
#[derive(Clone)]
enum Connection {
    /// A connection checked out of the pool per query.
    Pool(PgPool),
    /// An open transaction shared by every repository inside one
    /// [`PgUserRepository::transaction`] block. `None` once it has finished.
    Transaction(SharedTransaction),
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Pool(pool) => f.debug_tuple("Pool").field(pool).finish(),
            Connection::Transaction(_) => f.write_str("Transaction"),
        }
    }
}

impl Connection {
    async fn fetch_one<'q, O>(&self, query: QueryAs<'q, Postgres, O, PgArguments>) -> Result<O, DbError>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        match self {
            Connection::Pool(pool) => Ok(query.fetch_one(pool).await?),
            Connection::Transaction(shared) => {
                let mut guard = shared.lock().await;
                let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
                Ok(query.fetch_one(&mut **tx).await?)
            }
        }
    }

    async fn fetch_all<'q, O>(&self, query: QueryAs<'q, Postgres, O, PgArguments>) -> Result<Vec<O>, DbError>
    where
        O: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        match self {
            Connection::Pool(pool) => Ok(query.fetch_all(pool).await?),
            Connection::Transaction(shared) => {
                let mut guard = shared.lock().await;
                let tx = guard.as_mut().ok_or(DbError::TransactionClosed)?;
                Ok(query.fetch_all(&mut **tx).await?)
            }
        }
    }
}

/// PostgreSQL implementation of [`UserRepository`].
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    connection: Connection,
}

impl PgUserRepository {
    /// Creates a repository that checks connections out of `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            connection: Connection::Pool(pool),
        }
    }

    /// Whether this repository is bound to an open transaction.
    pub fn in_transaction(&self) -> bool {
        matches!(self.connection, Connection::Transaction(_))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, username, age, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, username, age, created_at, updated_at, deleted_at
            "#,
        )
        .bind(user.id)
        .bind(user.name.clone())
        .bind(user.username.clone())
        .bind(user.age)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at);

        self.connection.fetch_one(query).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, DbError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, age, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id);

        self.connection.fetch_one(query).await
    }

    async fn list(&self, username: &str) -> Result<Vec<User>, DbError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, username, age, created_at, updated_at, deleted_at
            FROM users
            WHERE username LIKE '%' || $1 || '%' AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(username.to_owned());

        self.connection.fetch_all(query).await
    }

    /// Opens a serializable, read-write transaction.
    ///
    /// Bookkeeping failures surface as [`DbError::BeginFailure`],
    /// [`DbError::RollbackFailure`] or [`DbError::CommitFailure`].
    async fn transaction<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(Self) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + fmt::Display + Send,
    {
        let pool = match &self.connection {
            Connection::Pool(pool) => pool,
            Connection::Transaction(_) => return f(self.clone()).await,
        };

        let mut tx = pool.begin().await.map_err(DbError::BeginFailure)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE, READ WRITE")
            .execute(&mut *tx)
            .await
            .map_err(DbError::BeginFailure)?;

        let shared: SharedTransaction = Arc::new(Mutex::new(Some(tx)));
        let scoped = Self {
            connection: Connection::Transaction(Arc::clone(&shared)),
        };

        let outcome = AssertUnwindSafe(f(scoped)).catch_unwind().await;
        let tx = shared.lock().await.take().ok_or(DbError::TransactionClosed)?;

        match outcome {
            Err(panic) => {
                if let Err(e) = tx.rollback().await {
                    tracing::error!(error = %e, "Cannot rollback transaction after panic");
                }
                std::panic::resume_unwind(panic)
            }
            Ok(Err(err)) => {
                if let Err(e) = tx.rollback().await {
                    tracing::error!(error = %err, "Error within a transaction");
                    return Err(DbError::RollbackFailure(e).into());
                }
                tracing::debug!(error = %err, "Rolled back transaction");
                Err(err)
            }
            Ok(Ok(value)) => {
                tx.commit().await.map_err(DbError::CommitFailure)?;
                Ok(value)
            }
        }
    }
}

//! In-memory [`UserRepository`] double for use-case tests.

use async_trait::async_trait;
use core_types::User;
use database::{DbError, UserRepository, classify};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Query,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUsers {
    rows: Arc<Mutex<Vec<User>>>,
    inserts: Arc<AtomicUsize>,
    transactions: Arc<AtomicUsize>,
    failure: Option<Failure>,
}

impl InMemoryUsers {
    pub fn with(rows: Vec<User>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
            ..Self::default()
        }
    }

    pub fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<User> {
        self.rows.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), DbError> {
        match self.failure {
            Some(Failure::Query) => Err(classify(sqlx::Error::Protocol(
                "connection reset by peer".to_string(),
            ))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, user: &User) -> Result<User, DbError> {
        self.check()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.is_active() && u.username == user.username) {
            return Err(classify(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint \"users_username_key\" (SQLSTATE 23505)"
                    .to_string(),
            )));
        }
        rows.push(user.clone());
        Ok(user.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, DbError> {
        self.check()?;
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.is_active() && u.id == id)
            .cloned()
            .ok_or_else(|| classify(sqlx::Error::RowNotFound))
    }

    async fn list(&self, username: &str) -> Result<Vec<User>, DbError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_active() && u.username.contains(username))
            .cloned()
            .collect())
    }

    /// Restores the rows as they were before `f` when it fails.
    async fn transaction<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(Self) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + fmt::Display + Send,
    {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.all();

        let outcome = f(self.clone()).await;
        if outcome.is_err() {
            *self.rows.lock().unwrap() = snapshot;
        }
        outcome
    }
}

use crate::exception;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Minimum age for a user to exist.
pub const USER_MIN_AGE: i32 = 18;

/// A registered user. Mirrors a row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a new, not yet persisted, user with a fresh time-ordered id.
    ///
    /// Timestamps are truncated to microseconds, the precision Postgres stores,
    /// so the value read back compares equal to this one.
    pub fn new(name: impl Into<String>, username: impl Into<String>, age: i32) -> Self {
        let now = Utc::now().trunc_subsecs(6);

        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            username: username.into(),
            age,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

exception! {
    /// The user is younger than [`USER_MIN_AGE`].
    pub USER_BELOW_AGE = (400, "ERR_USER_BELOW_AGE");

    /// Another active user already owns the username.
    pub EXISTING_USERNAME = (400, "ERR_EXISTING_USERNAME");

    /// No active user has the requested id.
    pub USER_NOT_EXISTS = (400, "ERR_USER_NOT_EXISTS");
}

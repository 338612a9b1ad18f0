use async_trait::async_trait;
use core_types::{EXISTING_USERNAME, Exception, GENERIC, USER_BELOW_AGE, USER_MIN_AGE, User};
use database::UserRepository;

#[async_trait]
pub trait CreatorUseCase: Send + Sync {
    /// Registers a new user. The username must not belong to another active user.
    async fn create(&self, name: String, username: String, age: i32) -> Result<User, Exception>;
}

/// Creates users through a [`UserRepository`].
#[derive(Debug, Clone)]
pub struct Creator<R> {
    users: R,
}

impl<R: UserRepository> Creator<R> {
    pub fn new(users: R) -> Self {
        Self { users }
    }
}

#[async_trait]
impl<R: UserRepository> CreatorUseCase for Creator<R> {
    async fn create(&self, name: String, username: String, age: i32) -> Result<User, Exception> {
        if age < USER_MIN_AGE {
            return Err(USER_BELOW_AGE.raise("Cannot create user underaged"));
        }

        let user = User::new(name, username, age);

        let stored = self
            .users
            .transaction(|users| async move { users.create(&user).await })
            .await;

        match stored {
            Ok(created) => {
                tracing::debug!(user_id = %created.id, "Created user");
                Ok(created)
            }
            Err(err) if err.is_integrity_violation() => {
                Err(EXISTING_USERNAME.wrap(err, "Cannot create user with existing username"))
            }
            Err(err) => Err(GENERIC.wrap(err, "Cannot create user")),
        }
    }
}

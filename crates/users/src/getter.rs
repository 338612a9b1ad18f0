use async_trait::async_trait;
use core_types::{Exception, GENERIC, USER_NOT_EXISTS, User};
use database::UserRepository;
use uuid::Uuid;

#[async_trait]
pub trait GetterUseCase: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<User, Exception>;

    /// Active users whose username contains `username`. An empty filter
    /// matches everyone.
    async fn list(&self, username: &str) -> Result<Vec<User>, Exception>;
}

/// Reads users through a [`UserRepository`].
#[derive(Debug, Clone)]
pub struct Getter<R> {
    users: R,
}

impl<R: UserRepository> Getter<R> {
    pub fn new(users: R) -> Self {
        Self { users }
    }
}

#[async_trait]
impl<R: UserRepository> GetterUseCase for Getter<R> {
    async fn get_by_id(&self, id: Uuid) -> Result<User, Exception> {
        self.users.get_by_id(id).await.map_err(|err| {
            if err.is_no_rows() {
                USER_NOT_EXISTS.wrap(err, "Cannot get a user with that id")
            } else {
                GENERIC.wrap(err, "Cannot get user")
            }
        })
    }

    async fn list(&self, username: &str) -> Result<Vec<User>, Exception> {
        self.users
            .list(username)
            .await
            .map_err(|err| GENERIC.wrap(err, "Cannot list users"))
    }
}

//! Request and response bodies of the user API.

use core_types::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

core_types::exception! {
    /// The request could not be bound or failed validation.
    pub INVALID_REQUEST = (400, "ERR_INVALID_REQUEST");
}

/// `POST /v1/user`
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(custom(function = "validate_required_age"))]
    pub age: i32,
}

/// A zero age counts as missing.
fn validate_required_age(age: i32) -> Result<(), ValidationError> {
    if age == 0 {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

/// `GET /v1/user/:id`
#[derive(Debug, Deserialize, Validate)]
pub struct GetUserRequest {
    pub id: Uuid,
}

/// `GET /v1/user?username=`
#[derive(Debug, Deserialize, Validate)]
pub struct ListUsersRequest {
    #[validate(length(min = 1))]
    pub username: String,
}

/// The public view of a [`User`]. Timestamps stay server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub age: i32,
}

impl From<User> for UserPayload {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            age: user.age,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserPayload,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self { user: user.into() }
    }
}

/// Always serializes `users` as an array, empty when nothing matched.
#[derive(Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<UserPayload>,
}

impl From<Vec<User>> for UsersResponse {
    fn from(users: Vec<User>) -> Self {
        Self {
            users: users.into_iter().map(UserPayload::from).collect(),
        }
    }
}

//! Types shared by every layer: the `User` model and the exception envelope.

pub mod exception;
pub mod user;

// Re-export the core types to provide a clean public API.
pub use exception::{Exception, ExceptionKind, Origin, GENERIC};
pub use user::{User, EXISTING_USERNAME, USER_BELOW_AGE, USER_MIN_AGE, USER_NOT_EXISTS};

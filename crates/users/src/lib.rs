//! User use cases: the business rules between the HTTP handlers and storage.
//!
//! Use cases speak [`Exception`](core_types::Exception) to their callers and
//! [`UserRepository`](database::UserRepository) to storage.

pub mod creator;
pub mod getter;

#[cfg(test)]
mod testing;

pub use creator::{Creator, CreatorUseCase};
pub use getter::{Getter, GetterUseCase};

//! The uniform error envelope returned by use cases and rendered by the web server.
//!
//! Every error kind is declared once with the [`exception!`](crate::exception!)
//! macro. The declaration path becomes the kind's [`Origin`], so two kinds
//! compare equal only when they come from the same declaration, no matter
//! what message code or cause they carry.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::error::Error as StdError;
use std::fmt;

/// Identifies the declaration site of an exception kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin(&'static str);

impl Origin {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Declares one or more [`ExceptionKind`] constants.
///
/// ```ignore
/// exception! {
///     /// The user is younger than the minimum age.
///     pub USER_BELOW_AGE = (400, "ERR_USER_BELOW_AGE");
/// }
/// ```
#[macro_export]
macro_rules! exception {
    ($($(#[$meta:meta])* $vis:vis $name:ident = ($status:expr, $code:expr);)+) => {
        $(
            $(#[$meta])*
            $vis const $name: $crate::exception::ExceptionKind =
                $crate::exception::ExceptionKind::declare(
                    $crate::exception::Origin::new(concat!(module_path!(), "::", stringify!($name))),
                    $status,
                    $code,
                );
        )+
    };
}

/// A declared error kind: origin, transport status and stable message code.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionKind {
    origin: Origin,
    status: u16,
    code: &'static str,
}

impl ExceptionKind {
    /// Use the [`exception!`](crate::exception!) macro instead, it fills in the origin.
    #[doc(hidden)]
    pub const fn declare(origin: Origin, status: u16, code: &'static str) -> Self {
        Self {
            origin,
            status,
            code,
        }
    }

    /// Raises this kind with a note describing what failed.
    pub fn raise(self, note: impl Into<String>) -> Exception {
        Exception {
            kind: self,
            cause: Some(anyhow::Error::msg(note.into())),
        }
    }

    /// Raises this kind wrapping `cause`, annotated with `note`.
    pub fn wrap<E>(self, cause: E, note: impl Into<String>) -> Exception
    where
        E: Into<anyhow::Error>,
    {
        Exception {
            kind: self,
            cause: Some(cause.into().context(note.into())),
        }
    }

    pub const fn origin(&self) -> Origin {
        self.origin
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl PartialEq for ExceptionKind {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
    }
}

impl Eq for ExceptionKind {}

/// An occurrence of an [`ExceptionKind`], optionally carrying the cause chain.
///
/// The cause is for server-side logging only; serialization exposes nothing
/// but the message code.
#[derive(Debug)]
pub struct Exception {
    kind: ExceptionKind,
    cause: Option<anyhow::Error>,
}

impl Exception {
    /// Re-wraps this exception around a new cause, keeping its kind.
    pub fn wrap<E>(self, cause: E, note: impl Into<String>) -> Self
    where
        E: Into<anyhow::Error>,
    {
        self.kind.wrap(cause, note)
    }

    /// Whether this exception was raised from `kind`.
    pub fn is(&self, kind: &ExceptionKind) -> bool {
        self.kind == *kind
    }

    pub const fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub const fn origin(&self) -> Origin {
        self.kind.origin
    }

    pub const fn status(&self) -> u16 {
        self.kind.status
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }
}

impl From<ExceptionKind> for Exception {
    fn from(kind: ExceptionKind) -> Self {
        Self { kind, cause: None }
    }
}

impl PartialEq for Exception {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl PartialEq<ExceptionKind> for Exception {
    fn eq(&self, other: &ExceptionKind) -> bool {
        self.kind == *other
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.code)
    }
}

impl StdError for Exception {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

impl Serialize for Exception {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Exception", 1)?;
        state.serialize_field("message", self.kind.code)?;
        state.end()
    }
}

exception! {
    /// Anything that does not fit a more specific kind.
    pub GENERIC = (500, "ERR_GENERIC");
}

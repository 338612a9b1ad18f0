use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or did not deserialize into [`Settings`](crate::Settings).
    #[error("Cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

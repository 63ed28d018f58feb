use crate::config::ConfigError;

/// Everything the tournament core can fail with.
///
/// The first five variants are caller mistakes and are meant to be shown to
/// the user. The rest are infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Username `{0}` is already taken")]
    AlreadyExists(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Administrator role required")]
    Forbidden,

    #[error("Could not access storage")]
    Storage(#[from] sqlx::Error),

    #[error("Could not migrate database")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Could not hash credential")]
    Credential(#[from] argon2::Error),

    #[error("Blocking task failed")]
    Join(#[from] tokio::task::JoinError),

    #[error("Invalid configuration")]
    Config(#[from] ConfigError),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error stems from bad input rather than a broken backend.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists(_)
                | Self::InvalidCredentials
                | Self::Validation(_)
                | Self::NotFound(_)
                | Self::Forbidden
        )
    }
}

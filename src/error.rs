use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    /// Required backend configuration is absent or malformed.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The task store could not be queried.
    #[error("Task backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A single terminal write failed (out of bounds, closed output).
    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    #[error("Invalid task record: {0}")]
    InvalidTaskRecord(String),
}

impl Error {
    /// Errors that must abort before (or out of) the refresh loop.
    ///
    /// Everything else is absorbed per tick or per instruction.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::BackendUnavailable(_) | Error::RenderFailure(_) | Error::InvalidTaskRecord(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

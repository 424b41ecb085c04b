use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::internal(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::internal(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failures of the key-value substrate.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read storage file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write storage file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize storage: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage writer stopped")]
    WriterStopped,
}

/// Failures of the account registry. The validation variants are shown
/// inline on the auth forms.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Please fill in every field")]
    MissingFields,

    #[error("Username must be at least {0} characters")]
    UsernameTooShort(usize),

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Username or email is already registered")]
    AlreadyRegistered,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("stored value under {key} is corrupted: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Whether the message belongs next to the form rather than in the logs.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Corrupted { .. } | Self::Storage(_))
    }
}

/// Failures of the per-user record store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no user is signed in")]
    NoCurrentUser,

    #[error("stored value under {key} is corrupted: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the outbound HTTP facade.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Status {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

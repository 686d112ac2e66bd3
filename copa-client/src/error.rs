//! Error types for the CoPA client.

use thiserror::Error;

/// Failures that happen before a response body was obtained.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Channel has not been started")]
    NotStarted,

    #[error("Channel has been stopped")]
    Stopped,

    #[error("Channel failed to start and is no longer usable")]
    Unusable,

    #[error("Failed to initialize HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Request to {url} failed: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::Send {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// The remote error categories a server can report in an error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    Api,
    Permission,
    NotPracticable,
    Internal,
}

impl RemoteErrorKind {
    pub const ALL: [RemoteErrorKind; 4] = [
        RemoteErrorKind::Api,
        RemoteErrorKind::Permission,
        RemoteErrorKind::NotPracticable,
        RemoteErrorKind::Internal,
    ];

    /// Discriminator the server puts in the `type` field of an error envelope.
    pub fn tag(self) -> &'static str {
        match self {
            RemoteErrorKind::Api => "APIException",
            RemoteErrorKind::Permission => "PermissionException",
            RemoteErrorKind::NotPracticable => "RequestNotPracticableException",
            RemoteErrorKind::Internal => "InternalErrorException",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub(crate) fn into_error(self, message: String) -> ExchangeError {
        match self {
            RemoteErrorKind::Api => ExchangeError::Api(message),
            RemoteErrorKind::Permission => ExchangeError::Permission(message),
            RemoteErrorKind::NotPracticable => ExchangeError::NotPracticable(message),
            RemoteErrorKind::Internal => ExchangeError::Internal(message),
        }
    }
}

/// Outcome of a failed typed exchange.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("Unexpected response from server: {0}")]
    Protocol(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Request not practicable: {0}")]
    NotPracticable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ExchangeError {
    /// The remote category, if the server reported this failure.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            ExchangeError::Api(_) => Some(RemoteErrorKind::Api),
            ExchangeError::Permission(_) => Some(RemoteErrorKind::Permission),
            ExchangeError::NotPracticable(_) => Some(RemoteErrorKind::NotPracticable),
            ExchangeError::Internal(_) => Some(RemoteErrorKind::Internal),
            _ => None,
        }
    }

    /// Server-supplied message of a remote error.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ExchangeError::Api(msg)
            | ExchangeError::Permission(msg)
            | ExchangeError::NotPracticable(msg)
            | ExchangeError::Internal(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ExchangeError::Transport(_))
    }
}

/// Errors raised while loading client settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Settings file not found: {0}")]
    NotFound(String),

    #[error("Invalid settings: {0}")]
    Invalid(#[from] config::ConfigError),
}

pub type TransportResult<T> = Result<T, TransportError>;

pub type ExchangeResult<T> = Result<T, ExchangeError>;

use crate::config::ConfigError;
use crate::infrastructure::cache::CacheError;
use chatsockets::SocketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-success HTTP status
    #[error("Bad API response from {url} (status {status}): {body}")]
    BadApiResponse {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Client is already authenticated")]
    AlreadyAuthenticated,

    #[error("Chat is already active")]
    ChatAlreadyActive,

    #[error("Chat is not active")]
    ChatNotActive,

    #[error("Client is not authenticated")]
    NotAuthenticated,

    /// A response lacked a field the client depends on
    #[error("Missing field in response: {0}")]
    MissingField(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Token cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chat socket error: {0}")]
    Socket(SocketError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SocketError> for ClientError {
    fn from(err: SocketError) -> Self {
        match err {
            SocketError::AlreadyActive => ClientError::ChatAlreadyActive,
            SocketError::NotActive => ClientError::ChatNotActive,
            other => ClientError::Socket(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

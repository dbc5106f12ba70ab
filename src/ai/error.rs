use reqwest::StatusCode;

/// Everything that can end a send early.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Chat backend error {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// An `error` field sent by the backend inside a well-formed object.
    #[error("{0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unreadable response: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("A response is already streaming in this conversation")]
    Busy,
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

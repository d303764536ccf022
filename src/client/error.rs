use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error body. Display is `CODE: message`, so
    /// callers can match on the code inside the text.
    #[error("{code}: {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Server error code, when the server sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => Some(code),
            _ => None,
        }
    }
}

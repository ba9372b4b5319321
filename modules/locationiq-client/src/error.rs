use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocationIqError>;

#[derive(Debug, Error)]
pub enum LocationIqError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query rejected: {0}")]
    InvalidQuery(String),
}

impl From<reqwest::Error> for LocationIqError {
    fn from(err: reqwest::Error) -> Self {
        LocationIqError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for LocationIqError {
    fn from(err: serde_json::Error) -> Self {
        LocationIqError::Parse(err.to_string())
    }
}

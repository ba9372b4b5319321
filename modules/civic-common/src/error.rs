use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CivicError {
    #[error("Unknown issue status: {0}")]
    UnknownStatus(String),
}

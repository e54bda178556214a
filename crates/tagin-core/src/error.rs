use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Identifier errors
    #[error("Invalid card id: {0}")]
    InvalidCardId(String),

    #[error("Invalid card UID: {0}")]
    InvalidUid(String),

    // Record errors
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),
}

pub type Result<T> = std::result::Result<T, Error>;

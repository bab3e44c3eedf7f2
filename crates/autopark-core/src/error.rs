use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid plate: {0}")]
    InvalidPlate(String),

    #[error("Invalid slot id: {0}")]
    InvalidSlotId(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid money amount: {0}")]
    InvalidAmount(String),
}

pub type Result<T> = std::result::Result<T, Error>;

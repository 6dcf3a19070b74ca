use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParcelError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Background task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ParcelError>;

impl<T> From<std::sync::PoisonError<T>> for ParcelError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl From<std::io::Error> for ParcelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ParcelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

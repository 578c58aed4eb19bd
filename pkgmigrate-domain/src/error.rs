use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildFileError {
    #[error("malformed build file at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

impl BuildFileError {
    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }
}

use thiserror::Error;

/// Why a raw message was refused before it reached the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    Empty,
    #[error("Message too long. Maximum {max} characters.")]
    TooLong { len: usize, max: usize },
}

/// Warnings a session hands back instead of a reply.
///
/// Both variants are recovered locally: nothing is appended to history and
/// the host is expected to show the message and let the user try again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{reason}")]
    RateLimited { reason: String, retry_after_secs: u64 },
}

impl ChatError {
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ChatError::RateLimited { retry_after_secs, .. } => Some(*retry_after_secs),
            ChatError::Validation(_) => None,
        }
    }
}

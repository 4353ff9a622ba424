//! Common result and error types for sigil.

/// The standard result type for fallible top-level operations.
///
/// `Err` indicates an unrecoverable failure of the tool itself. Problems with
/// the inputs (such as malformed class files) are reported through the
/// diagnostic sink and the operation still returns `Ok`.
pub type SigilResult<T> = Result<T, InternalError>;

/// An unrecoverable error that aborts the current command.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

//! Caster error types

/// Convenience result alias for caster operations.
pub type Result<T> = std::result::Result<T, CastError>;

/// Error type for caster operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// Chunk size of zero was given at construction
    InvalidChunkSize,
    /// Configuration mutation or reader registration attempted after the
    /// pump has started
    AlreadyStarted,
    /// The reader failed to accept a chunk within the reader timeout and
    /// was evicted from delivery
    ReaderEvicted,
}

impl std::fmt::Display for CastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CastError::InvalidChunkSize => {
                write!(f, "chunk size must be greater than zero")
            }
            CastError::AlreadyStarted => {
                write!(
                    f,
                    "cannot reconfigure or add readers once reading has started"
                )
            }
            CastError::ReaderEvicted => {
                write!(f, "reader evicted: chunk not accepted within the timeout")
            }
        }
    }
}

impl std::error::Error for CastError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert!(CastError::InvalidChunkSize.to_string().contains("zero"));
        assert!(CastError::AlreadyStarted.to_string().contains("started"));
        assert!(CastError::ReaderEvicted.to_string().contains("evicted"));
    }
}

//! Caster configuration

use std::time::Duration;

/// Default size (in bytes) of each chunk read from the source.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default number of chunks queued per reader before the pump blocks.
pub const DEFAULT_BACKLOG_DEPTH: usize = 10;

/// Default duration the pump waits for a slow reader before evicting it.
pub const DEFAULT_READER_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`ReadCaster`](crate::ReadCaster).
///
/// All fields are fixed once the pump starts; mutators on the caster are
/// rejected after the first read.
#[derive(Debug, Clone)]
pub struct CasterConfig {
    /// Bytes per read call to the source. Must be nonzero; construction
    /// of the caster fails otherwise.
    pub chunk_size: usize,

    /// Chunks each reader's inbox may hold before the pump blocks
    /// delivering to it. A value of 0 is treated as 1 (tokio's bounded
    /// channels have no rendezvous mode).
    pub backlog_depth: usize,

    /// How long the pump waits for a reader to accept one chunk before
    /// evicting it.
    pub reader_timeout: Duration,
}

impl Default for CasterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            backlog_depth: DEFAULT_BACKLOG_DEPTH,
            reader_timeout: DEFAULT_READER_TIMEOUT,
        }
    }
}

impl CasterConfig {
    /// Set the chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the backlog depth
    pub fn backlog_depth(mut self, depth: usize) -> Self {
        self.backlog_depth = depth;
        self
    }

    /// Set the reader timeout
    pub fn reader_timeout(mut self, timeout: Duration) -> Self {
        self.reader_timeout = timeout;
        self
    }

    /// Inbox capacity actually used per reader.
    pub(crate) fn effective_backlog(&self) -> usize {
        self.backlog_depth.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CasterConfig::default();

        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.backlog_depth, DEFAULT_BACKLOG_DEPTH);
        assert_eq!(config.reader_timeout, DEFAULT_READER_TIMEOUT);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CasterConfig::default()
            .chunk_size(25)
            .backlog_depth(5)
            .reader_timeout(Duration::from_secs(10));

        assert_eq!(config.chunk_size, 25);
        assert_eq!(config.backlog_depth, 5);
        assert_eq!(config.reader_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_backlog_clamped() {
        let config = CasterConfig::default().backlog_depth(0);

        assert_eq!(config.effective_backlog(), 1);
    }
}

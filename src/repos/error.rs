/**
 * Responsibility
 * - What the snapshot store reports upward (I/O vs. malformed content)
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

use thiserror::Error;

/// Fatal startup conditions. Anything surfaced here is printed and the
/// process exits with status 1 (spec.md §6).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("failed to bind UDP socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

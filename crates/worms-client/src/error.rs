use thiserror::Error;

/// Fatal client conditions. Each one is printed and the process exits with
/// status 1 (spec.md §4.5, §6): a malformed server is not something the
/// bridge can recover from mid-session.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("failed to resolve or connect to game server: {0}")]
    GameServerConnect(std::io::Error),

    #[error("failed to resolve or connect to gui at {host}:{port}: {source}")]
    GuiConnect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server sent PIXEL at ({x}, {y}) outside board bounds ({maxx}, {maxy})")]
    PixelOutOfBounds { x: u32, y: u32, maxx: u32, maxy: u32 },

    #[error("server referenced player_number {player_number} but only {known} names are known")]
    UnknownPlayerNumber { player_number: u8, known: usize },

    #[error("gui connection closed")]
    GuiClosed,

    #[error("game server connection closed")]
    GameServerClosed,
}

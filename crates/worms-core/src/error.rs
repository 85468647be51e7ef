use thiserror::Error;

/// A malformed client→server datagram. All variants are handled by silently
/// dropping the datagram — this type exists to let the decoder explain
/// itself to callers that want to log at `trace`/`debug` level.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientMsgDecodeError {
    #[error("datagram length {0} outside [13, 33]")]
    BadLength(usize),
    #[error("turn_direction {0} not in {{0,1,2}}")]
    BadTurnDirection(u8),
    #[error("player name byte {0:#04x} outside [33,126]")]
    BadNameByte(u8),
}

/// A single event record failed to decode from a server→client datagram.
/// `CrcMismatch` tells the caller to stop parsing the rest of the datagram;
/// `UnknownType` tells the caller to skip this record and keep going;
/// the remaining variants indicate a known event type with a malformed
/// body, which is a protocol violation the caller should treat as fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("crc32 mismatch")]
    CrcMismatch,
    #[error("unknown event type {0}")]
    UnknownType(u8),
    #[error("truncated event record")]
    Truncated,
    #[error("NEW_GAME player name missing NUL terminator")]
    UnterminatedName,
    #[error("NEW_GAME player name is not valid UTF-8/ASCII")]
    InvalidName,
}

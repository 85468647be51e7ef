pub mod codec;
pub mod error;
pub mod events;
pub mod player;
pub mod rng;
pub mod round;

pub use error::{ClientMsgDecodeError, EventDecodeError};
pub use events::{Event, EventBody};
pub use player::{PlayerRecord, TurnDirection};
pub use rng::Rng;
pub use round::Round;

/// Fixed outgoing-datagram ceiling, in bytes. Events are never split across
/// two datagrams; a new datagram starts whenever the next event would push
/// the current one past this limit.
pub const MTU: usize = 550;

/// Inclusive byte-length bounds of a client→server datagram (fixed 13-byte
/// prefix plus a 0–20 byte player name).
pub const MIN_CLIENT_MSG_LEN: usize = 13;
pub const MAX_CLIENT_MSG_LEN: usize = 33;

/// Player names are 0–20 ASCII bytes drawn from this inclusive range.
pub const PLAYER_NAME_MIN_BYTE: u8 = 33;
pub const PLAYER_NAME_MAX_BYTE: u8 = 126;
pub const PLAYER_NAME_MAX_LEN: usize = 20;

/// Returns `true` if `name` is a valid (possibly empty, i.e. observer) player
/// name: at most [`PLAYER_NAME_MAX_LEN`] bytes, each within
/// `[PLAYER_NAME_MIN_BYTE, PLAYER_NAME_MAX_BYTE]`.
pub fn player_name_valid(name: &[u8]) -> bool {
    name.len() <= PLAYER_NAME_MAX_LEN
        && name
            .iter()
            .all(|&b| (PLAYER_NAME_MIN_BYTE..=PLAYER_NAME_MAX_BYTE).contains(&b))
}

//! Wire codec: big-endian, length-prefixed, CRC-32-verified. See spec.md §4.1.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ClientMsgDecodeError, EventDecodeError};
use crate::events::Event;
use crate::player::TurnDirection;
use crate::{MAX_CLIENT_MSG_LEN, MIN_CLIENT_MSG_LEN, MTU, player_name_valid};

/// One client→server datagram: `session_id | turn_direction |
/// next_expected_event_no | player_name`. An empty `player_name` designates
/// a pure observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub session_id: u64,
    pub turn_direction: TurnDirection,
    pub next_expected_event_no: u32,
    pub player_name: String,
}

impl ClientMessage {
    pub fn is_observer(&self) -> bool {
        self.player_name.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13 + self.player_name.len());
        out.write_u64::<BigEndian>(self.session_id).unwrap();
        out.write_u8(self.turn_direction.to_wire()).unwrap();
        out.write_u32::<BigEndian>(self.next_expected_event_no).unwrap();
        out.extend_from_slice(self.player_name.as_bytes());
        out
    }
}

/// Parses a client→server datagram. Rejects on length outside [13, 33],
/// an out-of-range `turn_direction`, or a name byte outside [33,126] — all
/// per spec.md §4.1, and all handled by the caller as a silent drop.
pub fn decode_client_datagram(buf: &[u8]) -> Result<ClientMessage, ClientMsgDecodeError> {
    if buf.len() < MIN_CLIENT_MSG_LEN || buf.len() > MAX_CLIENT_MSG_LEN {
        return Err(ClientMsgDecodeError::BadLength(buf.len()));
    }

    let session_id = (&buf[0..8]).read_u64::<BigEndian>().unwrap();
    let turn_byte = buf[8];
    let turn_direction =
        TurnDirection::from_wire(turn_byte).ok_or(ClientMsgDecodeError::BadTurnDirection(turn_byte))?;
    let next_expected_event_no = (&buf[9..13]).read_u32::<BigEndian>().unwrap();
    let name_bytes = &buf[13..];

    if !player_name_valid(name_bytes) {
        let bad = name_bytes
            .iter()
            .find(|&&b| !(33..=126).contains(&b))
            .copied()
            .unwrap_or(0);
        return Err(ClientMsgDecodeError::BadNameByte(bad));
    }

    // player_name_valid already checked the byte range, so this is valid
    // ASCII and therefore valid UTF-8.
    let player_name = std::str::from_utf8(name_bytes).unwrap().to_string();

    Ok(ClientMessage {
        session_id,
        turn_direction,
        next_expected_event_no,
        player_name,
    })
}

/// Splits `events` into server→client datagrams, each prefixed with
/// `game_id` and at most [`MTU`] bytes. A new datagram starts whenever
/// appending the next event would exceed the limit; events are never
/// fragmented across datagrams. Returns an empty vec if `events` is empty
/// — an empty "drain" is a no-op, not an empty datagram.
pub fn segment_events(game_id: u32, events: &[Event]) -> Vec<Vec<u8>> {
    if events.is_empty() {
        return Vec::new();
    }

    let mut datagrams = Vec::new();
    let mut current = Vec::with_capacity(MTU);
    current.write_u32::<BigEndian>(game_id).unwrap();

    for event in events {
        let mut encoded = Vec::new();
        event.encode(&mut encoded);
        if current.len() + encoded.len() > MTU && current.len() > 4 {
            datagrams.push(current);
            current = Vec::with_capacity(MTU);
            current.write_u32::<BigEndian>(game_id).unwrap();
        }
        current.extend_from_slice(&encoded);
    }
    datagrams.push(current);
    datagrams
}

/// A decoded server→client datagram: the `game_id` prefix and every event
/// successfully parsed before parsing stopped (on CRC mismatch) or ran out
/// of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDatagram {
    pub game_id: u32,
    pub events: Vec<Event>,
}

/// Parses a server→client datagram per spec.md §4.1: reads `game_id`, then
/// repeatedly decodes events. On CRC mismatch, stops parsing the remainder
/// of the datagram (the tail is silently dropped). On unknown event type,
/// skips that record and continues. Known types with malformed bodies are
/// surfaced as an error to the caller (protocol violation).
pub fn decode_server_datagram(buf: &[u8]) -> Result<ServerDatagram, EventDecodeError> {
    if buf.len() < 4 {
        return Ok(ServerDatagram {
            game_id: 0,
            events: Vec::new(),
        });
    }
    let game_id = (&buf[0..4]).read_u32::<BigEndian>().unwrap();
    let mut rest = &buf[4..];
    let mut events = Vec::new();

    while !rest.is_empty() {
        match Event::decode(rest) {
            Ok((event, consumed)) => {
                events.push(event);
                rest = &rest[consumed..];
            },
            Err(EventDecodeError::CrcMismatch) => break,
            Err(EventDecodeError::UnknownType(_)) => {
                // Skip this record: recover its length the same way
                // Event::decode did, from the 4-byte length prefix.
                if rest.len() < 4 {
                    break;
                }
                let len = (&rest[0..4]).read_u32::<BigEndian>().unwrap() as usize;
                let total = len + 8;
                if rest.len() < total {
                    break;
                }
                rest = &rest[total..];
            },
            Err(other) => return Err(other),
        }
    }

    Ok(ServerDatagram { game_id, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn client_message_round_trip() {
        let msg = ClientMessage {
            session_id: 0xDEADBEEF_CAFEBABE,
            turn_direction: TurnDirection::Left,
            next_expected_event_no: 42,
            player_name: "alice".to_string(),
        };
        let encoded = msg.encode();
        let decoded = decode_client_datagram(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn client_message_observer_round_trip() {
        let msg = ClientMessage {
            session_id: 1,
            turn_direction: TurnDirection::Straight,
            next_expected_event_no: 0,
            player_name: String::new(),
        };
        let encoded = msg.encode();
        assert_eq!(encoded.len(), MIN_CLIENT_MSG_LEN);
        let decoded = decode_client_datagram(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rejects_too_short() {
        let buf = vec![0u8; 12];
        assert_eq!(
            decode_client_datagram(&buf),
            Err(ClientMsgDecodeError::BadLength(12))
        );
    }

    #[test]
    fn rejects_too_long() {
        let buf = vec![0u8; 34];
        assert_eq!(
            decode_client_datagram(&buf),
            Err(ClientMsgDecodeError::BadLength(34))
        );
    }

    #[test]
    fn rejects_bad_turn_direction() {
        let mut buf = vec![0u8; 13];
        buf[8] = 3;
        assert_eq!(
            decode_client_datagram(&buf),
            Err(ClientMsgDecodeError::BadTurnDirection(3))
        );
    }

    #[test]
    fn rejects_bad_name_byte() {
        let mut buf = vec![0u8; 14];
        buf[8] = 0;
        buf[13] = b' '; // 0x20, below the 33 floor
        assert_eq!(
            decode_client_datagram(&buf),
            Err(ClientMsgDecodeError::BadNameByte(b' '))
        );
    }

    #[test]
    fn segmentation_never_exceeds_mtu() {
        let events: Vec<Event> = (0..200)
            .map(|i| Event::pixel(i, (i % 250) as u8, i, i))
            .collect();
        let datagrams = segment_events(7, &events);
        for dg in &datagrams {
            assert!(dg.len() <= MTU, "datagram of {} bytes exceeds MTU", dg.len());
        }
    }

    #[test]
    fn segmentation_preserves_event_order_and_game_id() {
        let events: Vec<Event> = (0..50).map(|i| Event::pixel(i, 0, i, i)).collect();
        let datagrams = segment_events(3, &events);
        let mut seen = Vec::new();
        for dg in &datagrams {
            let parsed = decode_server_datagram(dg).unwrap();
            assert_eq!(parsed.game_id, 3);
            seen.extend(parsed.events);
        }
        assert_eq!(seen, events);
    }

    #[test]
    fn empty_drain_produces_no_datagrams() {
        assert!(segment_events(1, &[]).is_empty());
    }

    #[test]
    fn crc_mismatch_truncates_remaining_events_in_datagram() {
        let events = vec![Event::pixel(0, 0, 1, 1), Event::pixel(1, 0, 2, 2)];
        let datagrams = segment_events(1, &events);
        let mut dg = datagrams.into_iter().next().unwrap();
        // Corrupt a byte inside the first event's body.
        dg[8] ^= 0xFF;
        let parsed = decode_server_datagram(&dg).unwrap();
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn unknown_event_type_is_skipped_not_fatal() {
        let mut buf = Vec::new();
        buf.write_u32::<BigEndian>(1).unwrap(); // game_id

        let mut unknown = Vec::new();
        unknown.write_u32::<BigEndian>(0).unwrap(); // event_no
        unknown.write_u8(7).unwrap(); // unknown type, empty body
        let len = (unknown.len() - 4) as u32 + 4 - 4; // event_no(4)+type(1) = 5
        let mut framed = Vec::new();
        framed.write_u32::<BigEndian>(5).unwrap();
        framed.extend_from_slice(&unknown[0..5]);
        let crc = crc32fast::hash(&framed);
        framed.write_u32::<BigEndian>(crc).unwrap();
        let _ = len;
        buf.extend_from_slice(&framed);

        let valid = Event::pixel(1, 0, 9, 9);
        valid.encode(&mut buf);

        let parsed = decode_server_datagram(&buf).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0], valid);
    }

    proptest! {
        #[test]
        fn client_message_round_trip_prop(
            session_id: u64,
            turn in 0u8..3,
            next_expected: u32,
            name_len in 0usize..=20,
        ) {
            let player_name: String = (0..name_len)
                .map(|i| (33 + (i as u8 * 7) % (126 - 33 + 1)) as char)
                .collect();
            let msg = ClientMessage {
                session_id,
                turn_direction: TurnDirection::from_wire(turn).unwrap(),
                next_expected_event_no: next_expected,
                player_name,
            };
            let encoded = msg.encode();
            let decoded = decode_client_datagram(&encoded).unwrap();
            prop_assert_eq!(decoded, msg);
        }
    }
}

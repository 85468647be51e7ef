//! Protocol state machine translating server events into GUI text lines and
//! GUI key lines into outgoing turn directions. Kept free of any socket I/O
//! so it can be driven and tested without a network. See spec.md §4.5.

use worms_core::codec::{ClientMessage, ServerDatagram};
use worms_core::player::TurnDirection;
use worms_core::EventBody;

use crate::error::ClientError;

/// Maps a GUI input line (without its trailing newline) to a turn direction,
/// or `None` if the line is unrecognized and should leave the current
/// direction unchanged.
pub fn gui_line_to_turn(line: &str) -> Option<TurnDirection> {
    match line {
        "LEFT_KEY_DOWN" => Some(TurnDirection::Left),
        "RIGHT_KEY_DOWN" => Some(TurnDirection::Right),
        "LEFT_KEY_UP" | "RIGHT_KEY_UP" => Some(TurnDirection::Straight),
        _ => None,
    }
}

/// Tracks the state the bridge must remember across server datagrams:
/// the currently captured game, and the event cursor.
#[derive(Debug, Default)]
pub struct Bridge {
    session_id: u64,
    turn_direction: TurnDirection,
    player_name: String,
    next_expected_event_no: u32,
    captured: Option<CapturedGame>,
}

#[derive(Debug, Clone)]
struct CapturedGame {
    game_id: u32,
    maxx: u32,
    maxy: u32,
    names: Vec<String>,
}

impl Bridge {
    pub fn new(session_id: u64, player_name: String) -> Self {
        Self {
            session_id,
            turn_direction: TurnDirection::Straight,
            player_name,
            next_expected_event_no: 0,
            captured: None,
        }
    }

    pub fn set_turn_direction(&mut self, turn_direction: TurnDirection) {
        self.turn_direction = turn_direction;
    }

    pub fn keep_alive_message(&self) -> ClientMessage {
        ClientMessage {
            session_id: self.session_id,
            turn_direction: self.turn_direction,
            next_expected_event_no: self.next_expected_event_no,
            player_name: self.player_name.clone(),
        }
    }

    /// Applies one parsed server datagram, returning the GUI text lines it
    /// produces (each already ending in `\n`). Returns an error if the
    /// server sent a malformed reference — the caller should then terminate.
    pub fn apply_server_datagram(&mut self, datagram: &ServerDatagram) -> Result<String, ClientError> {
        let mut out = String::new();

        for event in &datagram.events {
            if let EventBody::NewGame { maxx, maxy, player_names } = &event.body {
                self.next_expected_event_no = 0;
                self.captured = Some(CapturedGame {
                    game_id: datagram.game_id,
                    maxx: *maxx,
                    maxy: *maxy,
                    names: player_names.clone(),
                });
            }

            if let EventBody::Pixel { x, y, .. } = &event.body {
                if let Some(captured) = &self.captured {
                    if *x >= captured.maxx || *y >= captured.maxy {
                        return Err(ClientError::PixelOutOfBounds {
                            x: *x,
                            y: *y,
                            maxx: captured.maxx,
                            maxy: captured.maxy,
                        });
                    }
                }
            }

            if let EventBody::Pixel { player_number, .. } | EventBody::PlayerEliminated { player_number } =
                &event.body
            {
                if let Some(captured) = &self.captured {
                    if *player_number as usize >= captured.names.len() {
                        return Err(ClientError::UnknownPlayerNumber {
                            player_number: *player_number,
                            known: captured.names.len(),
                        });
                    }
                }
            }

            self.next_expected_event_no = self.next_expected_event_no.max(event.event_no + 1);
            if self
                .captured
                .as_ref()
                .map(|c| c.game_id != datagram.game_id)
                .unwrap_or(false)
            {
                self.next_expected_event_no = 0;
            }

            if matches!(event.body, EventBody::GameOver) {
                self.next_expected_event_no = 0;
            } else if let Some(line) = self.to_gui_line(&event.body) {
                out.push_str(&line);
                out.push('\n');
            }
        }

        Ok(out)
    }

    fn to_gui_line(&self, body: &EventBody) -> Option<String> {
        let captured = self.captured.as_ref()?;
        match body {
            EventBody::NewGame { maxx, maxy, player_names } => {
                let mut line = format!("NEW_GAME {maxx} {maxy}");
                for name in player_names {
                    line.push(' ');
                    line.push_str(name);
                }
                Some(line)
            },
            EventBody::Pixel { player_number, x, y } => {
                let name = captured.names.get(*player_number as usize)?;
                Some(format!("PIXEL {x} {y} {name}"))
            },
            EventBody::PlayerEliminated { player_number } => {
                let name = captured.names.get(*player_number as usize)?;
                Some(format!("PLAYER_ELIMINATED {name}"))
            },
            EventBody::GameOver => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worms_core::Event;

    fn datagram(game_id: u32, events: Vec<Event>) -> ServerDatagram {
        ServerDatagram { game_id, events }
    }

    #[test]
    fn gui_lines_map_to_expected_directions() {
        assert_eq!(gui_line_to_turn("LEFT_KEY_DOWN"), Some(TurnDirection::Left));
        assert_eq!(gui_line_to_turn("RIGHT_KEY_DOWN"), Some(TurnDirection::Right));
        assert_eq!(gui_line_to_turn("LEFT_KEY_UP"), Some(TurnDirection::Straight));
        assert_eq!(gui_line_to_turn("RIGHT_KEY_UP"), Some(TurnDirection::Straight));
        assert_eq!(gui_line_to_turn("GARBAGE"), None);
    }

    #[test]
    fn new_game_resets_cursor_and_produces_gui_line() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let dg = datagram(7, vec![Event::new_game(0, 640, 480, vec!["alice".into(), "bob".into()])]);
        let out = bridge.apply_server_datagram(&dg).unwrap();
        assert_eq!(out, "NEW_GAME 640 480 alice bob\n");
        assert_eq!(bridge.next_expected_event_no, 1);
    }

    #[test]
    fn pixel_resolves_name_from_captured_roster() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let new_game = Event::new_game(0, 640, 480, vec!["alice".into(), "bob".into()]);
        let pixel = Event::pixel(1, 1, 10, 20);
        let dg = datagram(7, vec![new_game, pixel]);
        let out = bridge.apply_server_datagram(&dg).unwrap();
        assert!(out.contains("PIXEL 10 20 bob\n"));
        assert_eq!(bridge.next_expected_event_no, 2);
    }

    #[test]
    fn game_over_emits_no_line_and_resets_cursor() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let new_game = Event::new_game(0, 640, 480, vec!["alice".into()]);
        let over = Event::game_over(1);
        let dg = datagram(7, vec![new_game, over]);
        let out = bridge.apply_server_datagram(&dg).unwrap();
        assert!(!out.contains("GAME_OVER"));
        assert_eq!(bridge.next_expected_event_no, 0);
    }

    #[test]
    fn pixel_out_of_bounds_is_fatal() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let new_game = Event::new_game(0, 10, 10, vec!["alice".into()]);
        let bad_pixel = Event::pixel(1, 0, 50, 50);
        let dg = datagram(7, vec![new_game, bad_pixel]);
        assert!(matches!(
            bridge.apply_server_datagram(&dg),
            Err(ClientError::PixelOutOfBounds { .. })
        ));
    }

    #[test]
    fn unknown_player_number_is_fatal() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let new_game = Event::new_game(0, 10, 10, vec!["alice".into()]);
        let bad_eliminated = Event::player_eliminated(1, 9);
        let dg = datagram(7, vec![new_game, bad_eliminated]);
        assert!(matches!(
            bridge.apply_server_datagram(&dg),
            Err(ClientError::UnknownPlayerNumber { .. })
        ));
    }

    #[test]
    fn game_id_mismatch_resets_cursor() {
        let mut bridge = Bridge::new(1, "alice".to_string());
        let dg1 = datagram(7, vec![Event::new_game(0, 10, 10, vec!["alice".into()])]);
        bridge.apply_server_datagram(&dg1).unwrap();
        bridge.next_expected_event_no = 5;

        // A later datagram from a different game_id than captured, with an
        // event that doesn't re-establish NEW_GAME, must reset the cursor.
        let dg2 = datagram(8, vec![Event::pixel(3, 0, 1, 1)]);
        // captured.game_id is still 7 here, so this datagram's game_id (8)
        // mismatches and the cursor resets to 0 even though event_no=3 would
        // otherwise have advanced it to 4.
        let _ = bridge.apply_server_datagram(&dg2);
        assert_eq!(bridge.next_expected_event_no, 0);
    }

    #[test]
    fn keep_alive_message_reflects_current_state() {
        let mut bridge = Bridge::new(42, "alice".to_string());
        bridge.set_turn_direction(TurnDirection::Right);
        let msg = bridge.keep_alive_message();
        assert_eq!(msg.session_id, 42);
        assert_eq!(msg.turn_direction, TurnDirection::Right);
        assert_eq!(msg.player_name, "alice");
    }
}

use std::collections::BTreeMap;

use worms_core::player::{PlayerRecord, TurnDirection};
use worms_core::round::Round;
use worms_core::{Event, Rng};

/// Validated round parameters (spec.md §4.4).
#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    pub turning_speed: u32,
    pub rounds_per_sec: u32,
    pub width: u32,
    pub height: u32,
    pub seed: u32,
}

impl EngineParams {
    pub const TURNING_SPEED_RANGE: std::ops::RangeInclusive<u32> = 1..=90;
    pub const ROUNDS_PER_SEC_RANGE: std::ops::RangeInclusive<u32> = 1..=250;
    pub const WIDTH_RANGE: std::ops::RangeInclusive<u32> = 16..=1920;
    pub const HEIGHT_RANGE: std::ops::RangeInclusive<u32> = 16..=1080;
}

/// The tick-driven round lifecycle and worm simulation (spec.md §4.4). Owns
/// the current [`Round`] and the map of non-observer players by name; only
/// the single-threaded server loop may reach into this type.
pub struct GameEngine {
    params: EngineParams,
    rng: Rng,
    round: Round,
    players: BTreeMap<String, PlayerRecord>,
    ready_count: u32,
}

impl GameEngine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            rng: Rng::new(params.seed),
            round: Round::lobby(params.width, params.height),
            players: BTreeMap::new(),
            ready_count: 0,
        }
    }

    pub fn round_id(&self) -> u32 {
        self.round.round_id
    }

    pub fn round_started(&self) -> bool {
        self.round.started
    }

    pub fn log_len(&self) -> u32 {
        self.round.log.len() as u32
    }

    pub fn missing_since(&self, k: u32) -> &[Event] {
        self.round.log.missing_since(k)
    }

    pub fn drain_pending(&mut self) -> Vec<Event> {
        self.round.log.drain_pending().to_vec()
    }

    pub fn tick_period_ms(&self) -> u64 {
        1000 / self.params.rounds_per_sec as u64
    }

    /// Registers a non-observer participant if not already tracked. A
    /// reconnecting name mid-round is rejected by the participant table
    /// before this is reached (spec.md §9 Open Question resolution), so
    /// this is always safe to call for a genuinely new name.
    pub fn register_player(&mut self, name: &str) {
        self.players
            .entry(name.to_string())
            .or_insert_with(|| PlayerRecord::new(name.to_string()));
    }

    /// During an active round, a disconnected player is only flagged: their
    /// worm keeps simulating on its last turn direction until it dies
    /// naturally, and the roster collapses disconnected entries at
    /// `generate_game_over` (spec.md §3's "collapses disconnected players"
    /// happens at GAME_OVER). Before a round has started there is no
    /// GAME_OVER to collapse at, so the entry is removed outright here —
    /// otherwise a participant that times out in the lobby without ever
    /// readying up would sit in `players` forever, and since a round only
    /// starts once every registered non-observer is ready
    /// (`maybe_start_round`), that ghost entry would permanently prevent
    /// any round from starting.
    pub fn mark_disconnected(&mut self, name: &str) {
        if self.round.started {
            if let Some(player) = self.players.get_mut(name) {
                player.disconnected = true;
            }
        } else if let Some(player) = self.players.remove(name) {
            if player.ready {
                self.ready_count -= 1;
            }
        }
    }

    /// Applies an incoming turn direction for a named (non-observer) player,
    /// marking them ready the first time they send a non-straight turn
    /// since the last round ended. Returns `true` if the round should now
    /// be checked for a start (readiness state changed).
    pub fn apply_turn(&mut self, name: &str, turn: TurnDirection) {
        if let Some(player) = self.players.get_mut(name) {
            player.turn_direction = turn;
            if !self.round.started && !turn.is_straight() && !player.ready {
                player.ready = true;
                self.ready_count += 1;
            }
        }
    }

    /// A round starts when every non-observer participant is ready and
    /// there are at least two of them. Returns `true` if a round was
    /// started (the caller must then broadcast the drained log to all
    /// endpoints).
    pub fn maybe_start_round(&mut self) -> bool {
        if self.round.started {
            return false;
        }
        if self.ready_count >= 2 && self.ready_count as usize == self.players.len() {
            self.start_round();
            true
        } else {
            false
        }
    }

    fn start_round(&mut self) {
        let round_id = self.rng.next_u32();
        self.round = Round::new(round_id, self.params.width, self.params.height);

        // Snapshot ready_count into the live player count before zeroing —
        // spec.md §9's resolution of the "reset-before-or-after-snapshot"
        // ambiguity in the source.
        let playing_count = self.ready_count;
        self.ready_count = 0;

        let mut names: Vec<String> = self.players.keys().cloned().collect();
        names.sort();

        self.round
            .log
            .append(Event::new_game(0, self.params.width, self.params.height, names.clone()));

        let mut playing = playing_count;
        for (number, name) in names.iter().enumerate() {
            let player = self.players.get_mut(name).unwrap();
            player.number = number as u8;
            player.ready = false;
            player.playing = true;

            let x = (self.rng.next_u32() % self.params.width) as f64 + 0.5;
            let y = (self.rng.next_u32() % self.params.height) as f64 + 0.5;
            player.heading = self.rng.next_u32() % 360;
            player.x = x;
            player.y = y;

            let (cx, cy) = (x as u32, y as u32);
            if self.round.board.is_painted(cx, cy) {
                player.playing = false;
                playing -= 1;
                self.round
                    .log
                    .append(Event::player_eliminated(0, player.number));
            } else {
                self.round.board.paint(cx, cy);
                self.round
                    .log
                    .append(Event::pixel(0, player.number, cx, cy));
            }
        }

        if playing <= 1 {
            self.generate_game_over();
        }
    }

    fn generate_game_over(&mut self) {
        self.round.started = false;
        self.ready_count = 0;
        for player in self.players.values_mut() {
            player.playing = false;
        }
        self.round.log.append(Event::game_over(0));
        self.players.retain(|_, p| !p.disconnected);
    }

    /// Advances the simulation by one tick if the round is active. Returns
    /// `true` if any events were appended (the caller should broadcast).
    pub fn tick(&mut self) -> bool {
        if !self.round.started {
            return false;
        }

        let turning_speed = self.params.turning_speed;
        let log_len_before = self.round.log.len();

        let mut names: Vec<String> = self
            .players
            .iter()
            .filter(|(_, p)| p.playing)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort_by_key(|n| self.players[n].number);

        for name in &names {
            let player = self.players.get_mut(name).unwrap();
            match player.turn_direction {
                TurnDirection::Right => {
                    player.heading = (player.heading + turning_speed) % 360;
                },
                TurnDirection::Left => {
                    player.heading = (player.heading + 360 - turning_speed % 360) % 360;
                },
                TurnDirection::Straight => {},
            }

            let (prev_cx, prev_cy) = (player.x as u32, player.y as u32);
            let rad = (player.heading as f64).to_radians();
            player.x += rad.cos();
            player.y += rad.sin();

            let new_cx = if player.x >= 0.0 { player.x as u32 } else { u32::MAX };
            let new_cy = if player.y >= 0.0 { player.y as u32 } else { u32::MAX };

            if new_cx == prev_cx && new_cy == prev_cy {
                continue;
            }

            let off_board = !self.round.board.in_bounds(new_cx, new_cy);
            let collided = !off_board && self.round.board.is_painted(new_cx, new_cy);

            if off_board || collided {
                player.playing = false;
                self.round
                    .log
                    .append(Event::player_eliminated(0, player.number));
            } else {
                self.round.board.paint(new_cx, new_cy);
                self.round.log.append(Event::pixel(0, player.number, new_cx, new_cy));
            }
        }

        if self.playing_total() <= 1 {
            self.generate_game_over();
        }

        self.round.log.len() > log_len_before
    }

    fn playing_total(&self) -> usize {
        self.players.values().filter(|p| p.playing).count()
    }
}

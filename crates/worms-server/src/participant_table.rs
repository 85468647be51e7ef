use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Maximum number of simultaneously registered endpoints. Additional
/// unknown endpoints are silently dropped until eviction makes room.
pub const MAX_PARTICIPANTS: usize = 25;

/// How long a participant may stay silent before `sweep` evicts it.
pub const PARTICIPANT_TIMEOUT: Duration = Duration::from_secs(2);

/// What the caller should do with the datagram that produced this result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Unknown endpoint at capacity, or a stale/impersonating datagram.
    Drop,
    /// First datagram from this endpoint (or a session bump that
    /// re-admitted it). `superseded_name` carries the previous player name
    /// at this endpoint, if any, so the engine can flag it disconnected.
    NewParticipant { superseded_name: Option<String> },
    /// A known endpoint refreshing its liveness timer.
    ExistingParticipant,
}

#[derive(Debug, Clone)]
struct Entry {
    session_id: u64,
    player_name: String,
    last_rx: Instant,
}

/// Endpoint-keyed participant registry. Keyed by `SocketAddr` rather than a
/// connection handle, since UDP offers no session of its own; `SocketAddr`'s
/// `Ord` gives us the ordered-map-over-normalized-address behavior spec.md
/// §9 asks for without hand-rolling IPv6 comparison.
#[derive(Debug, Default)]
pub struct ParticipantTable {
    entries: BTreeMap<SocketAddr, Entry>,
}

impl ParticipantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.entries.keys().copied()
    }

    /// `true` if some entry other than `endpoint` already owns the given
    /// non-empty name. Enforces spec.md §3's "one entry per non-empty player
    /// name during an active round" invariant: two distinct endpoints must
    /// never be allowed to drive the same player name, since there is no
    /// authentication to disambiguate them (spec.md §1 Non-goals).
    fn name_taken_elsewhere(&self, name: &str, endpoint: SocketAddr) -> bool {
        !name.is_empty()
            && self
                .entries
                .iter()
                .any(|(&addr, entry)| addr != endpoint && entry.player_name == name)
    }

    /// Applies one incoming datagram's identity to the table. See spec.md
    /// §4.2 for the full contract.
    pub fn dispatch(
        &mut self,
        endpoint: SocketAddr,
        session_id: u64,
        player_name: &str,
        now: Instant,
    ) -> Action {
        match self.entries.get(&endpoint) {
            None => {
                if self.entries.len() >= MAX_PARTICIPANTS {
                    return Action::Drop;
                }
                if self.name_taken_elsewhere(player_name, endpoint) {
                    return Action::Drop;
                }
                self.entries.insert(
                    endpoint,
                    Entry {
                        session_id,
                        player_name: player_name.to_string(),
                        last_rx: now,
                    },
                );
                Action::NewParticipant {
                    superseded_name: None,
                }
            },
            Some(entry) if session_id == entry.session_id => {
                if entry.player_name != player_name {
                    Action::Drop
                } else {
                    self.entries.get_mut(&endpoint).unwrap().last_rx = now;
                    Action::ExistingParticipant
                }
            },
            Some(entry) if session_id > entry.session_id => {
                if self.name_taken_elsewhere(player_name, endpoint) {
                    return Action::Drop;
                }
                let superseded_name = if entry.player_name.is_empty() {
                    None
                } else {
                    Some(entry.player_name.clone())
                };
                self.entries.insert(
                    endpoint,
                    Entry {
                        session_id,
                        player_name: player_name.to_string(),
                        last_rx: now,
                    },
                );
                Action::NewParticipant { superseded_name }
            },
            Some(_) => Action::Drop,
        }
    }

    /// Removes entries whose `last_rx` is older than [`PARTICIPANT_TIMEOUT`].
    /// Returns the (non-empty) player names of evicted entries, which the
    /// caller must mark disconnected in the engine.
    pub fn sweep(&mut self, now: Instant) -> Vec<String> {
        let mut evicted_names = Vec::new();
        self.entries.retain(|_, entry| {
            let alive = now.duration_since(entry.last_rx) < PARTICIPANT_TIMEOUT;
            if !alive && !entry.player_name.is_empty() {
                evicted_names.push(entry.player_name.clone());
            }
            alive
        });
        evicted_names
    }
}

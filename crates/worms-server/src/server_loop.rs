use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use worms_core::codec::{decode_client_datagram, segment_events};

use crate::engine::{EngineParams, GameEngine};
use crate::error::ServerError;
use crate::participant_table::{Action, ParticipantTable, PARTICIPANT_TIMEOUT};

/// How often the participant table is swept for stale entries. Half the
/// eviction threshold keeps the worst-case detection latency bounded
/// without sweeping on every loop iteration.
const SWEEP_PERIOD: Duration = Duration::from_millis(PARTICIPANT_TIMEOUT.as_millis() as u64 / 2);

pub struct Server {
    socket: UdpSocket,
    participants: ParticipantTable,
    engine: GameEngine,
}

impl Server {
    /// Binds the given host:port. Production startup always passes `"::"`
    /// (dual-stack wildcard, accepting both v4 and v4-mapped-v6 clients
    /// through one socket per spec.md §6); tests bind a loopback address
    /// directly, since a wildcard address isn't itself a sendable peer.
    pub async fn bind(host: &str, port: u16, params: EngineParams) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind((host, port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;
        Ok(Self {
            socket,
            participants: ParticipantTable::new(),
            engine: GameEngine::new(params),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut tick_interval = tokio::time::interval(Duration::from_millis(self.engine.tick_period_ms()));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut sweep_interval = tokio::time::interval(SWEEP_PERIOD);
        sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut buf = vec![0u8; worms_core::MTU + 64];

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if self.engine.tick() {
                        self.broadcast_pending().await;
                    }
                }
                _ = sweep_interval.tick() => {
                    self.sweep(Instant::now());
                }
                result = self.socket.recv_from(&mut buf) => {
                    let (len, endpoint) = result?;
                    self.handle_datagram(&buf[..len], endpoint).await;
                }
            }
        }
    }

    fn sweep(&mut self, now: Instant) {
        for name in self.participants.sweep(now) {
            tracing::info!(player = %name, "participant timed out");
            self.engine.mark_disconnected(&name);
        }
    }

    async fn handle_datagram(&mut self, datagram: &[u8], endpoint: SocketAddr) {
        let msg = match decode_client_datagram(datagram) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::debug!(%endpoint, %err, "dropping malformed client datagram");
                return;
            },
        };

        let action = self
            .participants
            .dispatch(endpoint, msg.session_id, &msg.player_name, Instant::now());

        let action = match action {
            Action::Drop => {
                tracing::debug!(%endpoint, "dropping datagram");
                return;
            },
            other => other,
        };

        if let Action::NewParticipant { superseded_name: Some(old_name) } = &action {
            tracing::info!(player = %old_name, "superseded by reconnect, marking disconnected");
            self.engine.mark_disconnected(old_name);
        }

        if !msg.is_observer() {
            self.engine.register_player(&msg.player_name);
            self.engine.apply_turn(&msg.player_name, msg.turn_direction);
        }

        if self.engine.maybe_start_round() {
            self.broadcast_pending().await;
        }

        if msg.next_expected_event_no < self.engine.log_len() {
            self.unicast_missing(endpoint, msg.next_expected_event_no).await;
        }
    }

    async fn unicast_missing(&self, endpoint: SocketAddr, next_expected_event_no: u32) {
        let events = self.engine.missing_since(next_expected_event_no);
        if events.is_empty() {
            return;
        }
        for datagram in segment_events(self.engine.round_id(), events) {
            if let Err(err) = self.socket.send_to(&datagram, endpoint).await {
                tracing::warn!(%endpoint, %err, "failed to unicast to endpoint");
            }
        }
    }

    async fn broadcast_pending(&mut self) {
        let events = self.engine.drain_pending();
        if events.is_empty() {
            return;
        }
        let datagrams = segment_events(self.engine.round_id(), &events);
        let endpoints: Vec<SocketAddr> = self.participants.endpoints().collect();
        for endpoint in endpoints {
            for datagram in &datagrams {
                if let Err(err) = self.socket.send_to(datagram, endpoint).await {
                    tracing::warn!(%endpoint, %err, "failed to broadcast to endpoint");
                }
            }
        }
    }
}

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UdpSocket};

use worms_core::codec::decode_server_datagram;
use worms_core::MTU;

use crate::bridge::{gui_line_to_turn, Bridge};
use crate::cli::ClientConfig;
use crate::error::ClientError;

/// Keep-alive period for client→server datagrams (spec.md §4.5).
const KEEP_ALIVE_PERIOD: Duration = Duration::from_millis(30);

pub struct NetClient {
    game_server: UdpSocket,
    gui: BufReader<TcpStream>,
    bridge: Bridge,
}

impl NetClient {
    pub async fn connect(config: &ClientConfig, session_id: u64) -> Result<Self, ClientError> {
        let game_server = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(ClientError::GameServerConnect)?;
        game_server
            .connect((config.game_server.as_str(), config.server_port))
            .await
            .map_err(ClientError::GameServerConnect)?;

        let gui_stream = TcpStream::connect((config.gui_host.as_str(), config.gui_port))
            .await
            .map_err(|source| ClientError::GuiConnect {
                host: config.gui_host.clone(),
                port: config.gui_port,
                source,
            })?;
        gui_stream.set_nodelay(true).map_err(|source| ClientError::GuiConnect {
            host: config.gui_host.clone(),
            port: config.gui_port,
            source,
        })?;

        Ok(Self {
            game_server,
            gui: BufReader::new(gui_stream),
            bridge: Bridge::new(session_id, config.player_name.clone()),
        })
    }

    /// Runs the bridge loop until a fatal error or a peer disconnect. See
    /// spec.md §4.5: GUI key lines update `turn_direction`, a fixed 30 ms
    /// timer resends the client datagram, and incoming server datagrams are
    /// immediately translated and forwarded to the GUI.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let mut keep_alive = tokio::time::interval(KEEP_ALIVE_PERIOD);
        keep_alive.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut gui_line = String::new();
        let mut udp_buf = vec![0u8; MTU + 64];

        loop {
            tokio::select! {
                _ = keep_alive.tick() => {
                    let msg = self.bridge.keep_alive_message();
                    self.game_server.send(&msg.encode()).await?;
                }
                result = self.gui.read_line(&mut gui_line) => {
                    let bytes_read = result?;
                    if bytes_read == 0 {
                        return Err(ClientError::GuiClosed);
                    }
                    let trimmed = gui_line.trim_end_matches(['\n', '\r']);
                    if let Some(turn) = gui_line_to_turn(trimmed) {
                        self.bridge.set_turn_direction(turn);
                    }
                    gui_line.clear();
                }
                result = self.game_server.recv(&mut udp_buf) => {
                    let len = result?;
                    if len == 0 {
                        return Err(ClientError::GameServerClosed);
                    }
                    let datagram = decode_server_datagram(&udp_buf[..len])
                        .map_err(|err| {
                            tracing::warn!(%err, "dropping malformed server datagram");
                            err
                        });
                    let Ok(datagram) = datagram else { continue };
                    let gui_text = self.bridge.apply_server_datagram(&datagram)?;
                    if !gui_text.is_empty() {
                        self.gui.get_mut().write_all(gui_text.as_bytes()).await?;
                    }
                }
            }
        }
    }
}

//! Server network layer handling UDP communications and the simulation clocks

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::GameState;
use crate::snapshot;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Direction, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Ticks between periodic debug statistics (one simulated second).
const STATS_INTERVAL_TICKS: u32 = 30;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
    Shutdown,
}

/// Messages sent from the server loop to the network sender
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet },
}

/// Main server: owns the world and drives the tick and broadcast clocks
///
/// All world mutations happen on the task running [`Server::run`], so joins,
/// leaves, direction changes, ticks and snapshots never interleave mid-update.
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,
    broadcast_duration: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let game_state = match config.seed {
            Some(seed) => GameState::with_seed(config.world(), seed),
            None => GameState::new(config.world()),
        };
        Self::with_state(config, game_state).await
    }

    pub async fn with_state(
        config: &ServerConfig,
        game_state: GameState,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let socket = Arc::new(UdpSocket::bind(config.bind_address()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout(),
            ))),
            game_state,
            tick_duration: config.tick_duration(),
            broadcast_duration: config.broadcast_duration(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that can stop [`Server::run`] with [`ServerMessage::Shutdown`].
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        // Encode once; every client gets the same bytes.
                        let data = match serialize(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast: {}", e);
                                continue;
                            }
                        };

                        for (client_id, addr) in client_addrs {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that expires clients which stopped sending packets
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket { packet }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Applies one inbound packet to the registry and the world
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                display_name,
                avatar_url,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    let response = Packet::Disconnected {
                        reason: "Protocol version mismatch".to_string(),
                    };
                    self.send_packet(response, addr);
                    return;
                }

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game_state.remove_player(&existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                if let Some(client_id) = client_id {
                    let start = self
                        .game_state
                        .add_player(client_id, &display_name, &avatar_url);
                    self.send_packet(start, addr);
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(response, addr);
                }
            }

            Packet::ChangeDirection { direction } => {
                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.touch(addr)
                };

                match client_id {
                    Some(client_id) => {
                        self.game_state
                            .set_player_direction(client_id, Direction::parse(&direction));
                    }
                    None => debug!("Ignoring direction change from unknown {}", addr),
                }
            }

            Packet::Heartbeat => {
                let mut clients = self.clients.write().await;
                clients.touch(addr);
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game_state.remove_player(&client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Advances the simulation by one tick
    async fn run_tick(&mut self) {
        let tally = self.game_state.tick();
        if tally.items > 0 || tally.air > 0 {
            debug!(
                "Tick {}: collected {} items, {} air pockets",
                self.game_state.tick, tally.items, tally.air
            );
        }

        if self.game_state.tick % STATS_INTERVAL_TICKS == 0 {
            let client_count = {
                let clients = self.clients.read().await;
                clients.len()
            };

            if client_count > 0 {
                debug!(
                    "Tick {}: {} clients, {} players alive",
                    self.game_state.tick,
                    client_count,
                    self.game_state.alive_count()
                );
            }
        }
    }

    /// Broadcasts the full world to all connected clients
    async fn broadcast_map_data(&self) {
        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };

        if client_count == 0 {
            return;
        }

        self.broadcast_packet(snapshot::map_packet(&self.game_state));
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast_interval = interval(self.broadcast_duration);
        broadcast_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started: tick every {:?}, broadcast every {:?}",
            self.tick_duration, self.broadcast_duration
        );

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.game_state.remove_player(&client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    self.run_tick().await;
                },

                _ = broadcast_interval.tick() => {
                    self.broadcast_map_data().await;
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use tokio_test::assert_ok;

    fn test_config(max_clients: usize) -> ServerConfig {
        ServerConfig {
            port: 0,
            max_clients,
            ..ServerConfig::default()
        }
    }

    async fn test_server(max_clients: usize) -> Server {
        let config = test_config(max_clients);
        let state = GameState::with_seed(WorldConfig::default(), 8);
        assert_ok!(Server::with_state(&config, state).await)
    }

    fn client_addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn connect_packet(name: &str) -> Packet {
        Packet::Connect {
            client_version: PROTOCOL_VERSION,
            display_name: name.to_string(),
            avatar_url: String::new(),
        }
    }

    fn next_outgoing(server: &mut Server) -> GameMessage {
        server.game_rx.try_recv().expect("expected a queued message")
    }

    #[tokio::test]
    async fn test_connect_sends_start_data() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("diver"), client_addr(5000)).await;

        assert_eq!(server.game_state().players.len(), 1);
        match next_outgoing(&mut server) {
            GameMessage::SendPacket {
                packet:
                    Packet::StartData {
                        player,
                        field_width,
                        field_height,
                    },
                addr,
            } => {
                assert_eq!(addr, client_addr(5000));
                assert_eq!(player.display_name, "diver");
                assert_eq!((field_width, field_height), (1000, 1000));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_rejected_when_full() {
        let mut server = test_server(1).await;
        server.handle_packet(connect_packet("a"), client_addr(5000)).await;
        let _ = next_outgoing(&mut server);

        server.handle_packet(connect_packet("b"), client_addr(5001)).await;
        assert_eq!(server.game_state().players.len(), 1);
        match next_outgoing(&mut server) {
            GameMessage::SendPacket {
                packet: Packet::Disconnected { reason },
                ..
            } => assert_eq!(reason, "Server full"),
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_other_protocol_version() {
        let mut server = test_server(4).await;
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION + 1,
            display_name: "old".to_string(),
            avatar_url: String::new(),
        };
        server.handle_packet(packet, client_addr(5000)).await;

        assert!(server.game_state().players.is_empty());
        match next_outgoing(&mut server) {
            GameMessage::SendPacket {
                packet: Packet::Disconnected { reason },
                ..
            } => assert_eq!(reason, "Protocol version mismatch"),
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reconnect_from_same_address_replaces_session() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("first"), client_addr(5000)).await;
        server.handle_packet(connect_packet("second"), client_addr(5000)).await;

        let players = &server.game_state().players;
        assert_eq!(players.len(), 1);
        assert_eq!(players.values().next().unwrap().display_name, "second");
        assert_eq!(server.clients.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_change_direction() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("diver"), client_addr(5000)).await;

        let change = |direction: &str| Packet::ChangeDirection {
            direction: direction.to_string(),
        };

        server.handle_packet(change("up"), client_addr(5000)).await;
        let player = server.game_state().players.values().next().unwrap();
        assert_eq!(player.direction, Direction::Up);

        server.handle_packet(change("backwards"), client_addr(5000)).await;
        let player = server.game_state().players.values().next().unwrap();
        assert_eq!(player.direction, Direction::Unknown);

        // Unknown sender is ignored.
        server.handle_packet(change("left"), client_addr(6000)).await;
        let player = server.game_state().players.values().next().unwrap();
        assert_eq!(player.direction, Direction::Unknown);
    }

    #[tokio::test]
    async fn test_disconnect_removes_player() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("diver"), client_addr(5000)).await;
        server.handle_packet(Packet::Disconnect, client_addr(5000)).await;

        assert!(server.game_state().players.is_empty());
        assert!(server.clients.read().await.is_empty());

        // Unknown disconnect is a no-op.
        server.handle_packet(Packet::Disconnect, client_addr(5001)).await;
        assert!(server.clients.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_skipped_without_clients() {
        let mut server = test_server(4).await;
        server.broadcast_map_data().await;
        assert!(server.game_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_queues_full_map() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("a"), client_addr(5000)).await;
        server.handle_packet(connect_packet("b"), client_addr(5001)).await;
        let _ = next_outgoing(&mut server);
        let _ = next_outgoing(&mut server);

        server.broadcast_map_data().await;
        match next_outgoing(&mut server) {
            GameMessage::BroadcastPacket {
                packet: Packet::MapData((players, items, air)),
            } => {
                assert_eq!(players.len(), 2);
                assert_eq!(items.len(), 15);
                assert_eq!(air.len(), 10);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_tick_advances_world() {
        let mut server = test_server(4).await;
        server.handle_packet(connect_packet("diver"), client_addr(5000)).await;
        let before = server.game_state().players.values().next().unwrap().clone();

        server.run_tick().await;

        let after = server.game_state().players.values().next().unwrap();
        assert_eq!(server.game_state().tick, 1);
        assert_eq!(after.x, (before.x + 1) % 1000);
        assert_eq!(after.alive_clock, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let mut server = test_server(4).await;
        let control = server.control_handle();
        assert_ok!(control.send(ServerMessage::Shutdown));
        assert_ok!(server.run().await);
    }

    #[test]
    fn test_malformed_datagram_is_rejected() {
        let data = serialize(&connect_packet("diver")).unwrap();
        assert!(deserialize::<Packet>(&data[..data.len() / 2]).is_err());
        assert!(deserialize::<Packet>(&[]).is_err());
    }
}

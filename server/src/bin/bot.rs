//! Headless client that joins the arena, steers at random and logs what it sees.

use bincode::{deserialize, serialize};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::{
    radar_projection, Packet, PointTuple, PROTOCOL_VERSION, RADAR_HEIGHT, RADAR_WIDTH,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep, timeout, Instant};

const DIRECTIONS: [&str; 4] = ["left", "up", "down", "right"];

/// Pickups that would show on a radar centred on `me`.
fn on_radar(me: (u32, u32), points: &[PointTuple], field: (u32, u32)) -> usize {
    points
        .iter()
        .filter(|&&point| {
            radar_projection(me, point, field.0, field.1, RADAR_WIDTH, RADAR_HEIGHT)
                .is_visible(RADAR_WIDTH, RADAR_HEIGHT)
        })
        .count()
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: String,
    /// Display name shown to other players
    #[clap(short, long, default_value = "bot")]
    name: String,
    /// How long to stay connected, in seconds
    #[clap(long, default_value = "10")]
    seconds: u64,
}

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let server_addr = args.server.parse::<SocketAddr>()?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    let connect = Packet::Connect {
        client_version: PROTOCOL_VERSION,
        display_name: args.name.clone(),
        avatar_url: String::new(),
    };
    send(&socket, &connect, server_addr).await?;

    let mut buf = vec![0u8; 65_536];

    // Wait for our start data; snapshots may arrive first and are skipped.
    let (my_id, field) = loop {
        let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
        match deserialize::<Packet>(&buf[..len]) {
            Ok(Packet::StartData {
                player,
                field_width,
                field_height,
            }) => {
                info!(
                    "Joined as {} at ({}, {}) on a {}x{} field",
                    player.id, player.x, player.y, field_width, field_height
                );
                break (player.id, (field_width, field_height));
            }
            Ok(Packet::Disconnected { reason }) => {
                warn!("Server refused connection: {}", reason);
                return Ok(());
            }
            Ok(_) => continue,
            Err(e) => warn!("Failed to deserialize packet: {}", e),
        }
    };

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut steer = interval(Duration::from_secs(1));
    let mut snapshots = 0u64;

    while Instant::now() < deadline {
        tokio::select! {
            _ = steer.tick() => {
                let direction = DIRECTIONS
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or("right");
                let packet = Packet::ChangeDirection { direction: direction.to_string() };
                send(&socket, &packet, server_addr).await?;
                send(&socket, &Packet::Heartbeat, server_addr).await?;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buf[..len]) {
                    Ok(Packet::MapData((players, items, air))) => {
                        snapshots += 1;
                        if snapshots % 15 == 0 {
                            if let Some(me) = players.iter().find(|p| p.2 == my_id) {
                                let position = (me.0, me.1);
                                info!(
                                    "({}, {}) score={} alive={} missiles={} air={} | {} players, radar: {}/{} items, {}/{} air pockets",
                                    me.0, me.1, me.4, me.5, me.7, me.8,
                                    players.len(),
                                    on_radar(position, &items, field), items.len(),
                                    on_radar(position, &air, field), air.len()
                                );
                            }
                        }
                    }
                    Ok(other) => info!("Unexpected packet: {:?}", other),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }
            _ = sleep(deadline.saturating_duration_since(Instant::now())) => {}
        }
    }

    send(&socket, &Packet::Disconnect, server_addr).await?;
    info!("Bot finished after {} snapshots", snapshots);

    Ok(())
}

//! Authoritative world state: players, pickups and the fixed-step movement tick

use crate::collision::{resolve_pickups, PickupTally};
use crate::config::WorldConfig;
use crate::spawner::{PickupKind, PickupSet};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use shared::{
    Direction, Packet, Player, ANONYMOUS, MAX_AVATAR_URL_BYTES, MAX_DISPLAY_NAME_BYTES,
    TICKS_PER_SECOND,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u32,
    pub config: WorldConfig,
    /// Players keyed by connection id.
    pub players: HashMap<u32, Player>,
    pub items: PickupSet,
    pub air: PickupSet,
    pub(crate) rng: StdRng,
}

impl GameState {
    pub fn new(config: WorldConfig) -> Self {
        Self::from_rng(config, StdRng::from_entropy())
    }

    /// World whose spawns and player placements are reproducible.
    pub fn with_seed(config: WorldConfig, seed: u64) -> Self {
        Self::from_rng(config, StdRng::seed_from_u64(seed))
    }

    fn from_rng(config: WorldConfig, rng: StdRng) -> Self {
        let mut state = Self {
            tick: 0,
            config,
            players: HashMap::new(),
            items: PickupSet::new(PickupKind::Item),
            air: PickupSet::new(PickupKind::Air),
            rng,
        };
        state.populate();
        state
    }

    fn populate(&mut self) {
        let (width, height) = (self.config.field_width, self.config.field_height);
        self.items
            .fill(&mut self.rng, width, height, self.config.item_total);
        self.air
            .fill(&mut self.rng, width, height, self.config.air_total);
    }

    /// Registers a new connection and returns its `StartData` payload.
    ///
    /// The player is placed on a random cell facing right with full air.
    /// Empty display metadata falls back to `"anonymous"`; long values are
    /// cut so every snapshot still fits in one datagram.
    pub fn add_player(&mut self, client_id: u32, display_name: &str, avatar_url: &str) -> Packet {
        let spawn_x = self.rng.gen_range(0..self.config.field_width);
        let spawn_y = self.rng.gen_range(0..self.config.field_height);

        let player = Player::new(
            player_id(client_id),
            spawn_x,
            spawn_y,
            display_field(display_name, MAX_DISPLAY_NAME_BYTES),
            display_field(avatar_url, MAX_AVATAR_URL_BYTES),
        );

        info!(
            "Added player {} ({}) at ({}, {})",
            client_id, player.display_name, player.x, player.y
        );
        self.players.insert(client_id, player.clone());

        Packet::StartData {
            player,
            field_width: self.config.field_width,
            field_height: self.config.field_height,
        }
    }

    pub fn remove_player(&mut self, client_id: &u32) {
        if self.players.remove(client_id).is_some() {
            info!("Removed player {}", client_id);
        }
    }

    /// Stores a new heading for a connected player; unknown connections are ignored.
    pub fn set_player_direction(&mut self, client_id: u32, direction: Direction) {
        if let Some(player) = self.players.get_mut(&client_id) {
            player.direction = direction;
        }
    }

    /// Advances the world by one fixed step.
    ///
    /// Every live player moves before any pickup is resolved, so collisions
    /// are always checked against post-movement positions.
    pub fn tick(&mut self) -> PickupTally {
        self.tick = self.tick.wrapping_add(1);

        let (width, height) = (self.config.field_width, self.config.field_height);
        for player in self.players.values_mut() {
            advance_player(player, width, height);
        }

        resolve_pickups(self)
    }

    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.alive).count()
    }
}

/// Moves a live player one cell and runs its once-per-second bookkeeping.
pub fn advance_player(player: &mut Player, width: u32, height: u32) {
    if !player.alive {
        return;
    }

    if let Some((dx, dy)) = player.direction.step() {
        player.x = wrap(player.x, dx, width);
        player.y = wrap(player.y, dy, height);
    }

    player.alive_clock += 1;
    if player.alive_clock >= TICKS_PER_SECOND {
        player.alive_clock = 0;
        player.alive_seconds += 1;
        player.score += 1;
        player.air_time = player.air_time.saturating_sub(1);
        if player.air_time == 0 {
            player.alive = false;
        }
    }
}

fn wrap(value: u32, delta: i64, extent: u32) -> u32 {
    (i64::from(value) + delta).rem_euclid(i64::from(extent)) as u32
}

/// Stable public id for a connection: hex SHA-256 of the connection id.
pub fn player_id(client_id: u32) -> String {
    Sha256::digest(client_id.to_be_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Trims `value` to at most `max_bytes` on a char boundary, or `"anonymous"` if blank.
fn display_field(value: &str, max_bytes: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        return ANONYMOUS.to_string();
    }

    let mut end = value.len().min(max_bytes);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

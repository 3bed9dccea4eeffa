//! Command-line configuration for the arena server

use crate::snapshot::max_map_packet_bytes;
use clap::Parser;
use shared::{
    AIR_BONUS, AIR_RADIUS, AIR_TOTAL, FIELD_HEIGHT, FIELD_WIDTH, ITEM_RADIUS, ITEM_TOTAL,
    MAX_DATAGRAM_BYTES, SUBMARINE_WIDTH,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field dimensions must be non-zero (got {width}x{height})")]
    EmptyField { width: u32, height: u32 },
    #[error("{name} period must be at least 1ms")]
    ZeroPeriod { name: &'static str },
    #[error("{kind} total {total} does not fit a field of {cells} cells")]
    PopulationTooLarge {
        kind: &'static str,
        total: usize,
        cells: u64,
    },
    #[error("max clients must be at least 1")]
    NoClients,
    #[error("a full snapshot for {clients} clients needs {bytes} bytes, over the {limit}-byte datagram limit")]
    SnapshotTooLarge { clients: usize, bytes: u64, limit: u64 },
}

/// Geometry, population targets and pickup tuning for one arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    pub field_width: u32,
    pub field_height: u32,
    pub item_total: usize,
    pub air_total: usize,
    pub item_radius: u32,
    pub air_radius: u32,
    pub air_bonus: u8,
    pub submarine_width: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            item_total: ITEM_TOTAL,
            air_total: AIR_TOTAL,
            item_radius: ITEM_RADIUS,
            air_radius: AIR_RADIUS,
            air_bonus: AIR_BONUS,
            submarine_width: SUBMARINE_WIDTH,
        }
    }
}

impl WorldConfig {
    /// Per-axis reach within which a submarine collects a missile item.
    pub fn item_reach(&self) -> u32 {
        self.submarine_width / 2 + self.item_radius
    }

    /// Per-axis reach within which a submarine collects an air pocket.
    pub fn air_reach(&self) -> u32 {
        self.submarine_width / 2 + self.air_radius
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.field_width) * u64::from(self.field_height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_width == 0 || self.field_height == 0 {
            return Err(ConfigError::EmptyField {
                width: self.field_width,
                height: self.field_height,
            });
        }

        // Keep at least one free cell so a consumed pickup always has somewhere to respawn.
        let cells = self.cell_count();
        for (kind, total) in [("item", self.item_total), ("air", self.air_total)] {
            if total as u64 >= cells {
                return Err(ConfigError::PopulationTooLarge { kind, total, cells });
            }
        }

        Ok(())
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Simulation tick period in milliseconds
    #[clap(long, default_value = "33")]
    pub tick_ms: u64,
    /// Snapshot broadcast period in milliseconds
    #[clap(long, default_value = "66")]
    pub broadcast_ms: u64,
    /// Maximum number of concurrent clients
    #[clap(long, default_value = "64")]
    pub max_clients: usize,
    /// Seconds of silence before a client is dropped
    #[clap(long, default_value = "10")]
    pub client_timeout_secs: u64,
    /// Field width in cells
    #[clap(long, default_value_t = FIELD_WIDTH)]
    pub field_width: u32,
    /// Field height in cells
    #[clap(long, default_value_t = FIELD_HEIGHT)]
    pub field_height: u32,
    /// Number of missile items kept on the field
    #[clap(long, default_value_t = ITEM_TOTAL)]
    pub item_total: usize,
    /// Number of air pockets kept on the field
    #[clap(long, default_value_t = AIR_TOTAL)]
    pub air_total: usize,
    /// Seed for the world RNG (random when omitted)
    #[clap(long)]
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tick_ms: 33,
            broadcast_ms: 66,
            max_clients: 64,
            client_timeout_secs: 10,
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            item_total: ITEM_TOTAL,
            air_total: AIR_TOTAL,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn broadcast_duration(&self) -> Duration {
        Duration::from_millis(self.broadcast_ms)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }

    pub fn world(&self) -> WorldConfig {
        WorldConfig {
            field_width: self.field_width,
            field_height: self.field_height,
            item_total: self.item_total,
            air_total: self.air_total,
            ..WorldConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroPeriod { name: "tick" });
        }
        if self.broadcast_ms == 0 {
            return Err(ConfigError::ZeroPeriod { name: "broadcast" });
        }
        if self.max_clients == 0 {
            return Err(ConfigError::NoClients);
        }

        let world = self.world();
        world.validate()?;

        let bytes = max_map_packet_bytes(&world, self.max_clients).unwrap_or(u64::MAX);
        if bytes > MAX_DATAGRAM_BYTES {
            return Err(ConfigError::SnapshotTooLarge {
                clients: self.max_clients,
                bytes,
                limit: MAX_DATAGRAM_BYTES,
            });
        }

        Ok(())
    }
}

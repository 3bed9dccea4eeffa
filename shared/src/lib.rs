use serde::{Deserialize, Serialize};

pub mod geometry;

pub use geometry::{axis_distance, axis_offset, radar_projection, toroidal_distance, RadarProjection};

pub const PROTOCOL_VERSION: u32 = 1;

pub const FIELD_WIDTH: u32 = 1000;
pub const FIELD_HEIGHT: u32 = 1000;
pub const ITEM_TOTAL: usize = 15;
pub const AIR_TOTAL: usize = 10;
pub const ITEM_RADIUS: u32 = 4;
pub const AIR_RADIUS: u32 = 6;
pub const AIR_BONUS: u8 = 30;
pub const SUBMARINE_WIDTH: u32 = 42;

pub const MAX_MISSILES: u8 = 6;
pub const MAX_AIR_TIME: u8 = 99;
/// Ticks that make up one simulated second.
pub const TICKS_PER_SECOND: u8 = 30;

pub const RADAR_WIDTH: u32 = 500;
pub const RADAR_HEIGHT: u32 = 500;

/// Display name and avatar used when a client connects without either.
pub const ANONYMOUS: &str = "anonymous";

/// Longest display name kept for a player, in bytes.
pub const MAX_DISPLAY_NAME_BYTES: usize = 32;
/// Longest avatar URL kept for a player, in bytes.
pub const MAX_AVATAR_URL_BYTES: usize = 256;
/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_BYTES: u64 = 65_507;

/// Wire tuple for one player inside `map data`:
/// `[x, y, playerId, displayName, score, isAlive, direction, missilesMany, airTime]`.
pub type PlayerTuple = (u32, u32, String, String, u32, bool, Direction, u8, u8);

/// Wire tuple for an item or air pocket: `[x, y]`.
pub type PointTuple = (u32, u32);

/// Full world snapshot: `[playersArray, itemsArray, airArray]`.
pub type MapData = (Vec<PlayerTuple>, Vec<PointTuple>, Vec<PointTuple>);

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        display_name: String,
        avatar_url: String,
    },
    ChangeDirection {
        direction: String,
    },
    Heartbeat,
    Disconnect,

    StartData {
        player: Player,
        field_width: u32,
        field_height: u32,
    },
    MapData(MapData),
    Disconnected {
        reason: String,
    },
}

/// Heading of a submarine.
///
/// Clients send directions as free-form strings; anything other than the four
/// headings parses to `Unknown`, which is stored like any other value but
/// never moves the player.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Up,
    Down,
    #[default]
    Right,
    Unknown,
}

impl Direction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "left" => Direction::Left,
            "up" => Direction::Up,
            "down" => Direction::Down,
            "right" => Direction::Right,
            _ => Direction::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Right => "right",
            Direction::Unknown => "unknown",
        }
    }

    /// Unit step along each axis, `None` for `Unknown`.
    /// The y axis grows downwards.
    pub fn step(&self) -> Option<(i64, i64)> {
        match self {
            Direction::Left => Some((-1, 0)),
            Direction::Up => Some((0, -1)),
            Direction::Down => Some((0, 1)),
            Direction::Right => Some((1, 0)),
            Direction::Unknown => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub display_name: String,
    pub avatar_url: String,
    pub alive: bool,
    pub direction: Direction,
    pub missiles: u8,
    pub air_time: u8,
    /// Sub-second tick counter in `[0, TICKS_PER_SECOND)`.
    pub alive_clock: u8,
    pub alive_seconds: u32,
    pub score: u32,
}

impl Player {
    pub fn new(id: String, x: u32, y: u32, display_name: String, avatar_url: String) -> Self {
        Self {
            id,
            x,
            y,
            display_name,
            avatar_url,
            alive: true,
            direction: Direction::default(),
            missiles: 0,
            air_time: MAX_AIR_TIME,
            alive_clock: 0,
            alive_seconds: 0,
            score: 0,
        }
    }

    pub fn to_tuple(&self) -> PlayerTuple {
        (
            self.x,
            self.y,
            self.id.clone(),
            self.display_name.clone(),
            self.score,
            self.alive,
            self.direction,
            self.missiles,
            self.air_time,
        )
    }
}

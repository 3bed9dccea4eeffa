//! Full-world snapshots for the `map data` broadcast
//!
//! Every client receives the whole world on each broadcast; there is no
//! per-client filtering or delta compression. Dead players stay in the
//! snapshot until they disconnect.

use crate::config::WorldConfig;
use crate::game::{player_id, GameState};
use shared::{
    Direction, MapData, Packet, Player, MAX_AVATAR_URL_BYTES, MAX_DISPLAY_NAME_BYTES,
};

pub fn map_data(state: &GameState) -> MapData {
    let players = state.players.values().map(Player::to_tuple).collect();
    let items = state.items.positions().collect();
    let air = state.air.positions().collect();
    (players, items, air)
}

pub fn map_packet(state: &GameState) -> Packet {
    Packet::MapData(map_data(state))
}

/// Encoded size of the largest `map data` packet a world can produce with
/// `max_clients` players connected.
pub fn max_map_packet_bytes(world: &WorldConfig, max_clients: usize) -> bincode::Result<u64> {
    let mut widest = Player::new(
        player_id(u32::MAX),
        u32::MAX,
        u32::MAX,
        "w".repeat(MAX_DISPLAY_NAME_BYTES),
        "w".repeat(MAX_AVATAR_URL_BYTES),
    );
    widest.direction = Direction::Unknown;
    let player_bytes = bincode::serialized_size(&widest.to_tuple())?;

    // Players are counted separately so a large client limit never allocates.
    let pickups = Packet::MapData((
        Vec::new(),
        vec![(u32::MAX, u32::MAX); world.item_total],
        vec![(u32::MAX, u32::MAX); world.air_total],
    ));
    let base_bytes = bincode::serialized_size(&pickups)?;

    Ok(base_bytes.saturating_add(player_bytes.saturating_mul(max_clients as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use shared::Direction;

    #[test]
    fn test_snapshot_sizes() {
        let mut state = GameState::with_seed(
            WorldConfig {
                item_total: 1,
                air_total: 1,
                ..WorldConfig::default()
            },
            3,
        );
        state.add_player(1, "alpha", "");
        state.add_player(2, "beta", "");

        let (players, items, air) = map_data(&state);
        assert_eq!(players.len(), 2);
        assert_eq!(items.len(), 1);
        assert_eq!(air.len(), 1);

        let item = state.items.positions().next().unwrap();
        let pocket = state.air.positions().next().unwrap();
        assert_eq!(items[0], item);
        assert_eq!(air[0], pocket);
    }

    #[test]
    fn test_snapshot_player_tuple_order() {
        let mut state = GameState::with_seed(
            WorldConfig {
                item_total: 0,
                air_total: 0,
                ..WorldConfig::default()
            },
            3,
        );
        state.add_player(1, "alpha", "");
        {
            let player = state.players.get_mut(&1).unwrap();
            player.x = 12;
            player.y = 34;
            player.score = 5;
            player.missiles = 2;
            player.air_time = 61;
            player.direction = Direction::Down;
        }

        let (players, _, _) = map_data(&state);
        let (x, y, id, name, score, alive, direction, missiles, air) = players[0].clone();
        assert_eq!((x, y), (12, 34));
        assert_eq!(id, state.players[&1].id);
        assert_eq!(name, "alpha");
        assert_eq!(score, 5);
        assert!(alive);
        assert_eq!(direction, Direction::Down);
        assert_eq!(missiles, 2);
        assert_eq!(air, 61);
    }

    #[test]
    fn test_snapshot_keeps_dead_players() {
        let mut state = GameState::with_seed(WorldConfig::default(), 3);
        state.add_player(1, "alpha", "");
        state.players.get_mut(&1).unwrap().alive = false;

        match map_packet(&state) {
            Packet::MapData((players, items, air)) => {
                assert_eq!(players.len(), 1);
                assert!(!players[0].5);
                assert_eq!(items.len(), 15);
                assert_eq!(air.len(), 10);
            }
            _ => panic!("Expected MapData"),
        }
    }

    #[test]
    fn test_max_packet_bytes_bounds_real_snapshot() {
        let world = WorldConfig::default();
        let mut state = GameState::with_seed(world.clone(), 3);
        for i in 0..40 {
            state.add_player(i, &"n".repeat(1900), &"a".repeat(1900));
        }

        let encoded = bincode::serialize(&map_packet(&state)).unwrap();
        let bound = max_map_packet_bytes(&world, 40).unwrap();

        assert!(encoded.len() as u64 <= bound);
        assert!(bound <= shared::MAX_DATAGRAM_BYTES);
    }

    #[test]
    fn test_max_packet_bytes_grows_per_client() {
        let world = WorldConfig::default();
        let one = max_map_packet_bytes(&world, 1).unwrap();
        let two = max_map_packet_bytes(&world, 2).unwrap();
        let none = max_map_packet_bytes(&world, 0).unwrap();
        assert_eq!(two - one, one - none);
        assert!(one > none);
    }
}

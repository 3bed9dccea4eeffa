//! Pickup collection for live submarines
//!
//! A submarine collects a pickup when the wrap-aware distance on *each* axis is
//! within the submarine's half width plus the pickup radius. This is an
//! axis-aligned box test, not a circular one.

use crate::game::GameState;
use crate::spawner::PickupSet;
use rand::Rng;
use shared::{MAX_AIR_TIME, MAX_MISSILES};

/// Pickups consumed during one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickupTally {
    pub items: usize,
    pub air: usize,
}

/// Consumes every pickup in reach of a live player and respawns a replacement
/// for each one immediately.
///
/// Replacements are visible to every later check in the same pass, including
/// the player that triggered them. Dead players never collect anything.
pub fn resolve_pickups(state: &mut GameState) -> PickupTally {
    let GameState {
        config,
        players,
        items,
        air,
        rng,
        ..
    } = state;
    let (width, height) = (config.field_width, config.field_height);
    // A reach that covers the whole field would otherwise never run dry.
    let limit = config.cell_count();
    let mut tally = PickupTally::default();

    for player in players.values_mut() {
        if !player.alive {
            continue;
        }
        let position = (player.x, player.y);

        let reach = config.item_reach();
        let collected = collect_in_reach(items, rng, position, reach, width, height, limit);
        for _ in 0..collected {
            player.missiles = player.missiles.saturating_add(1).min(MAX_MISSILES);
        }
        tally.items += collected;

        let reach = config.air_reach();
        let collected = collect_in_reach(air, rng, position, reach, width, height, limit);
        for _ in 0..collected {
            player.air_time = player
                .air_time
                .saturating_add(config.air_bonus)
                .min(MAX_AIR_TIME);
        }
        tally.air += collected;
    }

    tally
}

/// Removes and respawns pickups in reach of `from` until none is left or
/// `limit` have been taken. Returns how many were taken.
fn collect_in_reach<R: Rng>(
    set: &mut PickupSet,
    rng: &mut R,
    from: (u32, u32),
    reach: u32,
    width: u32,
    height: u32,
    limit: u64,
) -> usize {
    let mut collected = 0;
    while (collected as u64) < limit {
        let Some(position) = set.first_within_reach(from, reach, width, height) else {
            break;
        };
        set.remove(position);
        set.spawn(rng, width, height);
        collected += 1;
    }
    collected
}

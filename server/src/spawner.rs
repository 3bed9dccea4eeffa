//! Pickup collections and the spawner that keeps them populated
//!
//! Missile items and air pockets are plain positions. Each collection is keyed
//! by position, so two pickups of the same kind can never share a cell; items
//! and air pockets live in separate collections and may overlap each other.

use log::warn;
use rand::Rng;
use std::collections::BTreeSet;

/// Random draws attempted before falling back to a scan for a free cell.
pub const MAX_SPAWN_ATTEMPTS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Item,
    Air,
}

impl PickupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupKind::Item => "item",
            PickupKind::Air => "air",
        }
    }
}

/// Live pickups of one kind, keyed by `(x, y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupSet {
    kind: PickupKind,
    positions: BTreeSet<(u32, u32)>,
}

impl PickupSet {
    pub fn new(kind: PickupKind) -> Self {
        Self {
            kind,
            positions: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: (u32, u32)) -> bool {
        self.positions.contains(&position)
    }

    pub fn positions(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.positions.iter().copied()
    }

    /// Places a pickup at an exact cell. Returns false if the cell is taken.
    pub fn insert(&mut self, position: (u32, u32)) -> bool {
        self.positions.insert(position)
    }

    pub fn remove(&mut self, position: (u32, u32)) -> bool {
        self.positions.remove(&position)
    }

    /// Spawns one pickup at a uniformly random free cell.
    ///
    /// Draws at most `MAX_SPAWN_ATTEMPTS` random cells, then scans the field
    /// row by row from a random starting cell. Returns `None` only when every
    /// cell already holds a pickup of this kind.
    pub fn spawn<R: Rng>(&mut self, rng: &mut R, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }

        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let position = (rng.gen_range(0..width), rng.gen_range(0..height));
            if self.insert(position) {
                return Some(position);
            }
        }

        let cells = u64::from(width) * u64::from(height);
        let start = rng.gen_range(0..cells);
        warn!(
            "{} spawn fell back to a field scan after {} collisions ({} of {} cells taken)",
            self.kind.as_str(),
            MAX_SPAWN_ATTEMPTS,
            self.len(),
            cells
        );

        for offset in 0..cells {
            let cell = (start + offset) % cells;
            let position = ((cell % u64::from(width)) as u32, (cell / u64::from(width)) as u32);
            if self.insert(position) {
                return Some(position);
            }
        }

        warn!("No free cell left for a new {}", self.kind.as_str());
        None
    }

    /// Spawns until the collection holds `target` pickups.
    pub fn fill<R: Rng>(&mut self, rng: &mut R, width: u32, height: u32, target: usize) {
        while self.len() < target {
            if self.spawn(rng, width, height).is_none() {
                break;
            }
        }
    }

    /// Any one pickup within `reach` of `from` on both axes of the torus.
    pub fn first_within_reach(
        &self,
        from: (u32, u32),
        reach: u32,
        width: u32,
        height: u32,
    ) -> Option<(u32, u32)> {
        self.positions().find(|&position| {
            let (dx, dy) = shared::toroidal_distance(from, position, width, height);
            dx <= reach && dy <= reach
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_spawn_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut set = PickupSet::new(PickupKind::Item);

        for _ in 0..200 {
            let (x, y) = set.spawn(&mut rng, 40, 25).unwrap();
            assert!(x < 40);
            assert!(y < 25);
        }
        assert_eq!(set.len(), 200);
    }

    #[test]
    fn test_spawn_never_reuses_live_cell() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut set = PickupSet::new(PickupKind::Air);

        let mut seen = HashSet::new();
        for _ in 0..90 {
            let position = set.spawn(&mut rng, 10, 10).unwrap();
            assert!(seen.insert(position), "duplicate spawn at {:?}", position);
        }
    }

    #[test]
    fn test_spawn_fills_last_free_cell() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut set = PickupSet::new(PickupKind::Item);
        for x in 0..4 {
            for y in 0..4 {
                if (x, y) != (2, 1) {
                    assert!(set.insert((x, y)));
                }
            }
        }

        assert_eq!(set.spawn(&mut rng, 4, 4), Some((2, 1)));
        assert_eq!(set.len(), 16);
    }

    #[test]
    fn test_spawn_on_full_field_returns_none() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut set = PickupSet::new(PickupKind::Item);
        set.fill(&mut rng, 3, 3, 9);
        assert_eq!(set.len(), 9);

        assert_eq!(set.spawn(&mut rng, 3, 3), None);
        assert_eq!(set.len(), 9);
    }

    #[test]
    fn test_fill_reaches_target() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut set = PickupSet::new(PickupKind::Air);
        set.fill(&mut rng, 1000, 1000, 10);
        assert_eq!(set.len(), 10);

        set.fill(&mut rng, 1000, 1000, 10);
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn test_insert_rejects_occupied_cell() {
        let mut set = PickupSet::new(PickupKind::Item);
        assert!(set.insert((5, 5)));
        assert!(!set.insert((5, 5)));
        assert_eq!(set.len(), 1);
        assert!(set.remove((5, 5)));
        assert!(!set.remove((5, 5)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_reach_uses_wrapped_distance() {
        let mut set = PickupSet::new(PickupKind::Item);
        set.insert((995, 500));
        set.insert((400, 400));

        assert_eq!(
            set.first_within_reach((10, 500), 25, 1000, 1000),
            Some((995, 500))
        );
        assert_eq!(set.first_within_reach((40, 500), 25, 1000, 1000), None);
        // Both axes must be in reach.
        assert_eq!(set.first_within_reach((10, 540), 25, 1000, 1000), None);
        assert_eq!(
            set.first_within_reach((380, 420), 25, 1000, 1000),
            Some((400, 400))
        );
    }
}

//! Target selection for units and towers
//!
//! Selection reads a [`BattlefieldView`] captured once at the start of the
//! tick, so a unit's choice never depends on which units already moved
//! earlier in the same tick. Candidates are scanned in ascending id order
//! and only a strictly closer candidate replaces the current pick, which
//! makes equal-distance ties go to the lowest id.

use serde::{Deserialize, Serialize};

use crate::ws::protocol::Role;

use super::entities::{EntityId, Tower, Unit};
use super::physics::PhysicsSystem;

/// Distance within which a unit engages enemy units instead of towers
pub const AGGRO_RADIUS: f32 = 200.0;

/// Reference to an attackable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Unit(EntityId),
    Tower(EntityId),
}

impl TargetRef {
    pub fn id(self) -> EntityId {
        match self {
            TargetRef::Unit(id) | TargetRef::Tower(id) => id,
        }
    }
}

/// Position and size of one attackable entity at tick start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub target: TargetRef,
    pub owner: Role,
    pub x: f32,
    pub y: f32,
    /// Added to the attacker's range when checking reach
    pub hit_radius: f32,
}

/// Read-only copy of every attackable entity, sorted by id
#[derive(Debug, Clone, Default)]
pub struct BattlefieldView {
    units: Vec<TargetView>,
    /// Standing towers only
    towers: Vec<TargetView>,
}

impl BattlefieldView {
    pub fn capture(units: &[Unit], towers: &[Tower]) -> Self {
        let mut unit_views: Vec<TargetView> = units
            .iter()
            .map(|u| TargetView {
                target: TargetRef::Unit(u.id),
                owner: u.owner,
                x: u.x,
                y: u.y,
                hit_radius: u.stats.radius,
            })
            .collect();
        unit_views.sort_by_key(|v| v.target.id());

        let mut tower_views: Vec<TargetView> = towers
            .iter()
            .filter(|t| t.is_standing())
            .map(|t| TargetView {
                target: TargetRef::Tower(t.id),
                owner: t.owner,
                x: t.x,
                y: t.y,
                hit_radius: t.stats.hit_radius,
            })
            .collect();
        tower_views.sort_by_key(|v| v.target.id());

        Self {
            units: unit_views,
            towers: tower_views,
        }
    }
}

/// Nearest candidate of the opposing side accepted by `in_reach`
fn nearest_enemy<'a>(
    candidates: &'a [TargetView],
    owner: Role,
    x: f32,
    y: f32,
    in_reach: impl Fn(f32) -> bool,
) -> Option<&'a TargetView> {
    let mut best: Option<(&TargetView, f32)> = None;
    for candidate in candidates.iter().filter(|c| c.owner != owner) {
        let d = PhysicsSystem::distance(x, y, candidate.x, candidate.y);
        if !in_reach(d) {
            continue;
        }
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((candidate, d));
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Target for a unit: nearest enemy unit within aggro radius, else the
/// nearest standing enemy tower at any distance.
pub fn unit_target(view: &BattlefieldView, owner: Role, x: f32, y: f32) -> Option<TargetView> {
    nearest_enemy(&view.units, owner, x, y, |d| d < AGGRO_RADIUS)
        .or_else(|| nearest_enemy(&view.towers, owner, x, y, |_| true))
        .copied()
}

/// Target for a tower: nearest enemy unit within its range
pub fn tower_target(
    view: &BattlefieldView,
    owner: Role,
    x: f32,
    y: f32,
    range: f32,
) -> Option<TargetView> {
    nearest_enemy(&view.units, owner, x, y, |d| d <= range).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{TowerType, UnitType};

    fn unit(id: EntityId, owner: Role, x: f32, y: f32) -> Unit {
        Unit::new(id, owner, UnitType::Grunt, x, y)
    }

    #[test]
    fn enemy_unit_beats_closer_tower() {
        let units = vec![unit(1, Role::P1, 500.0, 300.0), unit(2, Role::P2, 650.0, 300.0)];
        let towers = vec![Tower::new(10, Role::P2, TowerType::Princess, 560.0, 300.0)];
        let view = BattlefieldView::capture(&units, &towers);

        let target = unit_target(&view, Role::P1, 500.0, 300.0).unwrap();
        assert_eq!(target.target, TargetRef::Unit(2));
    }

    #[test]
    fn falls_back_to_nearest_standing_tower_at_any_range() {
        let units = vec![unit(1, Role::P1, 100.0, 300.0), unit(2, Role::P2, 400.0, 300.0)];
        let mut dead = Tower::new(10, Role::P2, TowerType::Princess, 620.0, 100.0);
        dead.hp = 0.0;
        let towers = vec![
            dead,
            Tower::new(11, Role::P2, TowerType::Princess, 620.0, 500.0),
            Tower::new(12, Role::P2, TowerType::King, 720.0, 300.0),
            Tower::new(13, Role::P1, TowerType::King, 80.0, 300.0),
        ];
        let view = BattlefieldView::capture(&units, &towers);

        let target = unit_target(&view, Role::P1, 100.0, 300.0).unwrap();
        assert_eq!(target.target, TargetRef::Tower(11));
        assert_eq!(target.hit_radius, 30.0);
    }

    #[test]
    fn aggro_radius_is_exclusive() {
        let units = vec![unit(1, Role::P2, 300.0, 300.0)];
        let view = BattlefieldView::capture(&units, &[]);

        assert!(unit_target(&view, Role::P1, 100.0, 300.0).is_none());
        assert!(unit_target(&view, Role::P1, 100.5, 300.0).is_some());
    }

    #[test]
    fn equal_distance_tie_goes_to_lowest_id() {
        // Captured out of id order on purpose
        let units = vec![
            unit(9, Role::P2, 300.0, 350.0),
            unit(4, Role::P2, 300.0, 250.0),
            unit(1, Role::P1, 300.0, 300.0),
        ];
        let view = BattlefieldView::capture(&units, &[]);

        for _ in 0..10 {
            let target = unit_target(&view, Role::P1, 300.0, 300.0).unwrap();
            assert_eq!(target.target, TargetRef::Unit(4));
        }
    }

    #[test]
    fn tower_range_is_inclusive_with_no_fallback() {
        let units = vec![unit(1, Role::P2, 330.0, 300.0), unit(2, Role::P1, 190.0, 300.0)];
        let view = BattlefieldView::capture(&units, &[]);

        let hit = tower_target(&view, Role::P1, 180.0, 300.0, 150.0).unwrap();
        assert_eq!(hit.target, TargetRef::Unit(1));
        assert!(tower_target(&view, Role::P1, 179.0, 300.0, 150.0).is_none());
    }

    #[test]
    fn friendly_units_are_ignored() {
        let units = vec![unit(1, Role::P1, 100.0, 300.0), unit(2, Role::P1, 110.0, 300.0)];
        let view = BattlefieldView::capture(&units, &[]);
        assert!(unit_target(&view, Role::P1, 100.0, 300.0).is_none());
        assert_eq!(view.units.len(), 2);
        assert!(view.towers.is_empty());
    }
}

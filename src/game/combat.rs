//! Combat system - stats tables, cooldowns, damage and shot visuals

use crate::ws::protocol::{TowerType, UnitType};

use super::entities::{EntityId, Tower, Unit};
use super::physics::PhysicsSystem;
use super::targeting::{self, BattlefieldView, TargetRef};

/// Lifetime of a unit's shot visual
pub const UNIT_SHOT_TTL: f32 = 100.0;
/// Lifetime of a tower's shot visual
pub const TOWER_SHOT_TTL: f32 = 200.0;
/// Lifetime removed from every visual each tick
pub const PROJECTILE_DECAY_PER_TICK: f32 = 20.0;
pub const UNIT_SHOT_COLOR: &str = "white";

/// Immutable base stats per unit type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStats {
    /// Gold needed to deploy
    pub cost: u32,
    pub max_hp: f32,
    /// Damage per hit
    pub damage: f32,
    /// Distance travelled per tick
    pub speed: f32,
    /// Reach beyond the target's hit radius
    pub range: f32,
    /// Collision radius, also the unit's hit radius
    pub radius: f32,
    /// Minimum time between attacks (ms)
    pub cooldown_ms: u64,
    pub color: &'static str,
}

impl UnitStats {
    pub fn for_type(unit_type: UnitType) -> Self {
        match unit_type {
            UnitType::Grunt => Self {
                cost: 20,
                max_hp: 50.0,
                damage: 10.0,
                speed: 2.5,
                range: 30.0,
                radius: 10.0,
                cooldown_ms: 1000,
                color: "blue",
            },
            UnitType::Tank => Self {
                cost: 60,
                max_hp: 400.0,
                damage: 15.0,
                speed: 1.5,
                range: 30.0,
                radius: 15.0,
                cooldown_ms: 3000,
                color: "purple",
            },
            UnitType::Ranger => Self {
                cost: 40,
                max_hp: 40.0,
                damage: 15.0,
                speed: 2.5,
                range: 120.0,
                radius: 8.0,
                cooldown_ms: 2000,
                color: "green",
            },
        }
    }
}

/// Immutable stats per tower type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerStats {
    pub max_hp: f32,
    pub damage: f32,
    /// Engagement radius for enemy units
    pub range: f32,
    /// Minimum time between shots (ms)
    pub fire_rate_ms: u64,
    /// How far attackers may stand from the tower center and still hit it
    pub hit_radius: f32,
}

impl TowerStats {
    pub fn for_type(tower_type: TowerType) -> Self {
        match tower_type {
            TowerType::Princess => Self {
                max_hp: 350.0,
                damage: 10.0,
                range: 150.0,
                fire_rate_ms: 800,
                hit_radius: 30.0,
            },
            TowerType::King => Self {
                max_hp: 1000.0,
                damage: 15.0,
                range: 150.0,
                fire_rate_ms: 1000,
                hit_radius: 40.0,
            },
        }
    }
}

/// Damage dealt this tick, applied after every attacker has acted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub attacker: EntityId,
    pub target: TargetRef,
    pub damage: f32,
}

/// Shot visual requested this tick; ids are assigned when applied
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    pub ttl: f32,
    pub color: &'static str,
}

/// Everything decided during one tick's combat pass
#[derive(Debug, Default)]
pub struct CombatOutcome {
    pub hits: Vec<Hit>,
    pub shots: Vec<Shot>,
}

/// Combat system for cooldowns, unit actions and tower fire
pub struct CombatSystem;

impl CombatSystem {
    /// Cooldown check; never having acted counts as ready
    pub fn is_ready(last: Option<u64>, now: u64, cooldown_ms: u64) -> bool {
        match last {
            Some(at) => now.saturating_sub(at) > cooldown_ms,
            None => true,
        }
    }

    /// Reach of an attacker against a target of the given hit radius
    pub fn attack_range(base_range: f32, target_radius: f32) -> f32 {
        base_range + target_radius
    }

    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: f32, damage: f32) -> (f32, bool) {
        let new_health = current_health - damage;
        (new_health, new_health <= 0.0)
    }

    /// Damage a tower, clamping at zero. True only for the hit that knocks it down.
    pub fn damage_tower(tower: &mut Tower, damage: f32) -> bool {
        let was_standing = tower.is_standing();
        let (hp, dead) = Self::apply_damage(tower.hp, damage);
        tower.hp = hp.max(0.0);
        was_standing && dead
    }

    /// Decide and perform one unit's action for this tick.
    ///
    /// The unit's own position and cooldown are updated in place. Damage
    /// goes to `out` so no other entity changes before the pass ends.
    pub fn resolve_unit(unit: &mut Unit, view: &BattlefieldView, now: u64, out: &mut CombatOutcome) {
        let Some(target) = targeting::unit_target(view, unit.owner, unit.x, unit.y) else {
            unit.target = None;
            let (dx, dy) = PhysicsSystem::step_forward(unit.owner, unit.speed);
            unit.x += dx;
            unit.y += dy;
            return;
        };

        unit.target = Some(target.target);
        let dist = PhysicsSystem::distance(unit.x, unit.y, target.x, target.y);
        let reach = Self::attack_range(unit.stats.range, target.hit_radius);

        if dist <= reach {
            if Self::is_ready(unit.last_attack, now, unit.stats.cooldown_ms) {
                unit.last_attack = Some(now);
                out.hits.push(Hit {
                    attacker: unit.id,
                    target: target.target,
                    damage: unit.stats.damage,
                });
                out.shots.push(Shot {
                    start_x: unit.x,
                    start_y: unit.y,
                    end_x: target.x,
                    end_y: target.y,
                    ttl: UNIT_SHOT_TTL,
                    color: UNIT_SHOT_COLOR,
                });
            }
        } else {
            let (dx, dy) = PhysicsSystem::step_toward(unit.x, unit.y, target.x, target.y, unit.speed);
            unit.x += dx;
            unit.y += dy;
        }
    }

    /// Fire a standing tower at the nearest enemy unit in range, if reloaded
    pub fn resolve_tower(tower: &mut Tower, view: &BattlefieldView, now: u64, out: &mut CombatOutcome) {
        if !tower.is_standing() {
            return;
        }
        if !Self::is_ready(tower.last_shot, now, tower.stats.fire_rate_ms) {
            return;
        }

        let Some(target) =
            targeting::tower_target(view, tower.owner, tower.x, tower.y, tower.stats.range)
        else {
            return;
        };

        tower.last_shot = Some(now);
        out.hits.push(Hit {
            attacker: tower.id,
            target: target.target,
            damage: tower.stats.damage,
        });
        out.shots.push(Shot {
            start_x: tower.x,
            start_y: tower.y,
            end_x: target.x,
            end_y: target.y,
            ttl: TOWER_SHOT_TTL,
            color: tower.owner.tower_shot_color(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Role;

    fn grunt(id: EntityId, owner: Role, x: f32, y: f32) -> Unit {
        Unit::new(id, owner, UnitType::Grunt, x, y)
    }

    #[test]
    fn cooldown_requires_strictly_greater_elapsed() {
        assert!(CombatSystem::is_ready(None, 0, 1000));
        assert!(!CombatSystem::is_ready(Some(5_000), 6_000, 1000));
        assert!(CombatSystem::is_ready(Some(5_000), 6_001, 1000));
        assert!(!CombatSystem::is_ready(Some(5_000), 4_000, 1000));
    }

    #[test]
    fn unit_in_reach_attacks_once_per_cooldown() {
        let mut attacker = grunt(1, Role::P1, 100.0, 300.0);
        let victim = grunt(2, Role::P2, 130.0, 300.0);
        let view = BattlefieldView::capture(&[attacker.clone(), victim], &[]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_unit(&mut attacker, &view, 10_000, &mut out);
        CombatSystem::resolve_unit(&mut attacker, &view, 10_050, &mut out);
        CombatSystem::resolve_unit(&mut attacker, &view, 10_999, &mut out);

        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.hits[0].target, TargetRef::Unit(2));
        assert_eq!(out.hits[0].damage, 10.0);
        assert_eq!(out.shots.len(), 1);
        assert_eq!(out.shots[0].color, UNIT_SHOT_COLOR);
        assert_eq!(out.shots[0].ttl, UNIT_SHOT_TTL);
        assert_eq!((attacker.x, attacker.y), (100.0, 300.0));

        CombatSystem::resolve_unit(&mut attacker, &view, 11_001, &mut out);
        assert_eq!(out.hits.len(), 2);
    }

    #[test]
    fn unit_out_of_reach_walks_toward_target() {
        let mut attacker = grunt(1, Role::P1, 100.0, 300.0);
        let victim = grunt(2, Role::P2, 200.0, 300.0);
        let view = BattlefieldView::capture(&[attacker.clone(), victim], &[]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_unit(&mut attacker, &view, 10_000, &mut out);

        assert!(out.hits.is_empty());
        assert!((attacker.x - 102.5).abs() < 1e-4);
        assert!((attacker.y - 300.0).abs() < 1e-4);
        assert_eq!(attacker.target, Some(TargetRef::Unit(2)));
    }

    #[test]
    fn unit_without_target_advances_along_lane() {
        let mut lone = grunt(1, Role::P2, 500.0, 300.0);
        let view = BattlefieldView::capture(&[lone.clone()], &[]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_unit(&mut lone, &view, 10_000, &mut out);

        assert_eq!(lone.x, 497.5);
        assert_eq!(lone.y, 300.0);
        assert_eq!(lone.target, None);
    }

    #[test]
    fn tower_radius_extends_unit_reach() {
        // Grunt range 30 + king radius 40
        let king = Tower::new(7, Role::P2, TowerType::King, 720.0, 300.0);
        let mut attacker = grunt(1, Role::P1, 651.0, 300.0);
        let view = BattlefieldView::capture(&[attacker.clone()], &[king]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_unit(&mut attacker, &view, 10_000, &mut out);

        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.hits[0].target, TargetRef::Tower(7));
    }

    #[test]
    fn tower_fires_on_fire_rate_with_side_color() {
        let mut tower = Tower::new(3, Role::P1, TowerType::Princess, 180.0, 100.0);
        let intruder = grunt(9, Role::P2, 250.0, 100.0);
        let view = BattlefieldView::capture(&[intruder], &[tower.clone()]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_tower(&mut tower, &view, 10_000, &mut out);
        CombatSystem::resolve_tower(&mut tower, &view, 10_800, &mut out);
        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.shots[0].color, "#60a5fa");
        assert_eq!(out.shots[0].ttl, TOWER_SHOT_TTL);

        CombatSystem::resolve_tower(&mut tower, &view, 10_801, &mut out);
        assert_eq!(out.hits.len(), 2);
    }

    #[test]
    fn destroyed_tower_holds_fire() {
        let mut tower = Tower::new(3, Role::P2, TowerType::King, 720.0, 300.0);
        tower.hp = 0.0;
        let intruder = grunt(9, Role::P1, 700.0, 300.0);
        let view = BattlefieldView::capture(&[intruder], &[]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_tower(&mut tower, &view, 10_000, &mut out);
        assert!(out.hits.is_empty());
        assert_eq!(tower.last_shot, None);
    }

    #[test]
    fn tower_without_target_keeps_reload_ready() {
        let mut tower = Tower::new(3, Role::P1, TowerType::King, 80.0, 300.0);
        let far = grunt(9, Role::P2, 600.0, 300.0);
        let view = BattlefieldView::capture(&[far], &[]);

        let mut out = CombatOutcome::default();
        CombatSystem::resolve_tower(&mut tower, &view, 10_000, &mut out);
        assert!(out.hits.is_empty());
        assert_eq!(tower.last_shot, None);
    }

    #[test]
    fn stats_table_matches_balance_sheet() {
        let grunt = UnitStats::for_type(UnitType::Grunt);
        assert_eq!(grunt.cost, 20);
        assert_eq!(grunt.max_hp, 50.0);
        assert_eq!(UnitStats::for_type(UnitType::Tank).cooldown_ms, 3000);
        assert_eq!(UnitStats::for_type(UnitType::Ranger).range, 120.0);
        assert_eq!(TowerStats::for_type(TowerType::King).max_hp, 1000.0);
        assert_eq!(TowerStats::for_type(TowerType::Princess).fire_rate_ms, 800);
    }

    #[test]
    fn tower_falls_only_once_per_tick() {
        let mut princess = Tower::new(4, Role::P2, TowerType::Princess, 620.0, 100.0);
        princess.hp = 5.0;

        assert!(CombatSystem::damage_tower(&mut princess, 10.0));
        assert_eq!(princess.hp, 0.0);
        assert!(!CombatSystem::damage_tower(&mut princess, 10.0));
        assert_eq!(princess.hp, 0.0);

        let mut king = Tower::new(1, Role::P1, TowerType::King, 80.0, 300.0);
        assert!(!CombatSystem::damage_tower(&mut king, 15.0));
        assert_eq!(king.hp, 985.0);
    }
}

//! Entity records held by a match

use uuid::Uuid;

use crate::ws::protocol::{Role, TowerType, UnitType};

use super::combat::{TowerStats, UnitStats};
use super::targeting::TargetRef;

/// Transport-level id of a connected client
pub type ConnectionId = Uuid;

/// Id of a unit, tower or projectile, unique within its match
pub type EntityId = u64;

/// Monotonic id source scoped to one match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIdGen {
    last: EntityId,
}

impl EntityIdGen {
    pub fn next_id(&mut self) -> EntityId {
        self.last += 1;
        self.last
    }
}

/// Starting and maximum gold for every player
pub const STARTING_GOLD: u32 = 100;
pub const MAX_GOLD: u32 = 100;

/// Per-player economy record
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEconomy {
    pub role: Role,
    pub gold: u32,
    pub max_gold: u32,
    /// Last income accrual (ms)
    pub last_income: u64,
}

impl PlayerEconomy {
    pub fn new(role: Role, now: u64) -> Self {
        Self {
            role,
            gold: STARTING_GOLD,
            max_gold: MAX_GOLD,
            last_income: now,
        }
    }
}

/// A deployed unit walking its lane
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: EntityId,
    pub owner: Role,
    pub unit_type: UnitType,
    /// Resolved once at spawn
    pub stats: UnitStats,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    /// Signed by lane direction: positive for p1, negative for p2
    pub speed: f32,
    pub last_attack: Option<u64>,
    pub target: Option<TargetRef>,
}

impl Unit {
    pub fn new(id: EntityId, owner: Role, unit_type: UnitType, x: f32, y: f32) -> Self {
        let stats = UnitStats::for_type(unit_type);
        Self {
            id,
            owner,
            unit_type,
            stats,
            x,
            y,
            hp: stats.max_hp,
            speed: owner.forward() * stats.speed,
            last_attack: None,
            target: None,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp <= 0.0
    }
}

/// A crown tower. Destroyed towers stay in place with zero hp.
#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub id: EntityId,
    pub owner: Role,
    pub tower_type: TowerType,
    pub stats: TowerStats,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub last_shot: Option<u64>,
}

impl Tower {
    pub fn new(id: EntityId, owner: Role, tower_type: TowerType, x: f32, y: f32) -> Self {
        let stats = TowerStats::for_type(tower_type);
        Self {
            id,
            owner,
            tower_type,
            stats,
            x,
            y,
            hp: stats.max_hp,
            last_shot: None,
        }
    }

    pub fn is_standing(&self) -> bool {
        self.hp > 0.0
    }
}

/// Cosmetic shot trail for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    /// Remaining lifetime
    pub life: f32,
    pub color: &'static str,
}

impl Projectile {
    /// Shorten the remaining lifetime, returns false once expired
    pub fn decay(&mut self, amount: f32) -> bool {
        self.life -= amount;
        self.life > 0.0
    }
}

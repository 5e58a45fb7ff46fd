//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two competing sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Left side, attacks towards +x
    P1,
    /// Right side, attacks towards -x
    P2,
}

impl Role {
    pub fn opponent(self) -> Self {
        match self {
            Role::P1 => Role::P2,
            Role::P2 => Role::P1,
        }
    }

    /// Direction of travel along the x axis
    pub fn forward(self) -> f32 {
        match self {
            Role::P1 => 1.0,
            Role::P2 => -1.0,
        }
    }

    /// Color of tower shots fired by this side
    pub fn tower_shot_color(self) -> &'static str {
        match self {
            Role::P1 => "#60a5fa",
            Role::P2 => "#fb923c",
        }
    }
}

/// Seat handed out on join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    P1,
    P2,
    /// Watches the match, cannot mutate it
    Spectator,
}

impl Seat {
    pub fn role(self) -> Option<Role> {
        match self {
            Seat::P1 => Some(Role::P1),
            Seat::P2 => Some(Role::P2),
            Seat::Spectator => None,
        }
    }
}

impl From<Role> for Seat {
    fn from(role: Role) -> Self {
        match role {
            Role::P1 => Seat::P1,
            Role::P2 => Seat::P2,
        }
    }
}

/// Match result label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Player 1")]
    Player1,
    #[serde(rename = "Player 2")]
    Player2,
}

impl From<Role> for Winner {
    fn from(role: Role) -> Self {
        match role {
            Role::P1 => Winner::Player1,
            Role::P2 => Winner::Player2,
        }
    }
}

/// Deployable unit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    /// Cheap melee
    Grunt,
    /// Slow, very tanky melee
    Tank,
    /// Fragile long-range attacker
    Ranger,
}

/// Crown tower types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TowerType {
    /// Losing it loses the match
    King,
    /// Front-line defense
    Princess,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Deploy a unit at a map position
    SpawnUnit {
        unit_type: UnitType,
        x: f32,
        y: f32,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Seat assignment right after connecting
    Init {
        role: Seat,
        id: Uuid,
    },

    /// Full match state, sent every tick
    GameState(MatchSnapshot),

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Connection ids occupying each role slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSlots {
    pub p1: Option<Uuid>,
    pub p2: Option<Uuid>,
}

/// Immutable view of the match handed to the broadcaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Simulation tick number
    pub tick: u64,
    pub players: PlayerSlots,
    /// Economy per connection id
    pub player_data: BTreeMap<Uuid, EconomySnapshot>,
    pub units: Vec<UnitSnapshot>,
    pub towers: Vec<TowerSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomySnapshot {
    pub role: Role,
    pub gold: u32,
    pub max_gold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u64,
    pub owner: Role,
    pub unit_type: UnitType,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    /// Collision radius, for drawing
    pub radius: f32,
    pub color: String,
    /// Entity currently engaged, if any
    pub target_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    pub id: u64,
    pub owner: Role,
    pub tower_type: TowerType,
    pub x: f32,
    pub y: f32,
    /// Zero once destroyed; destroyed towers stay in the list
    pub hp: f32,
    pub max_hp: f32,
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub start_x: f32,
    pub start_y: f32,
    pub end_x: f32,
    pub end_y: f32,
    /// Remaining lifetime
    pub life: f32,
    pub color: String,
}

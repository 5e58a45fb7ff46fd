//! Map geometry, unit movement and deployment bounds

use crate::ws::protocol::Role;

/// Playfield width
pub const MAP_WIDTH: f32 = 800.0;
/// Playfield height
pub const MAP_HEIGHT: f32 = 600.0;
/// Dead zone on each side of the midline where nobody may deploy
pub const MIDLINE_MARGIN: f32 = 20.0;

/// Tower layout for one side: king x, princess x, princess rows
#[derive(Debug, Clone, Copy)]
pub struct TowerLayout {
    pub king_x: f32,
    pub king_y: f32,
    pub princess_x: f32,
    pub princess_ys: [f32; 2],
}

impl TowerLayout {
    pub fn for_role(role: Role) -> Self {
        let (king_x, princess_x) = match role {
            Role::P1 => (80.0, 180.0),
            Role::P2 => (MAP_WIDTH - 80.0, MAP_WIDTH - 180.0),
        };
        Self {
            king_x,
            king_y: MAP_HEIGHT / 2.0,
            princess_x,
            princess_ys: [100.0, 500.0],
        }
    }
}

/// Physics system for unit movement
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Euclidean distance between two points
    pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        (x2 - x1).hypot(y2 - y1)
    }

    /// Offset for one tick of travel from (x, y) towards (tx, ty).
    /// Returns (dx, dy)
    pub fn step_toward(x: f32, y: f32, tx: f32, ty: f32, speed: f32) -> (f32, f32) {
        let angle = (ty - y).atan2(tx - x);
        let speed = speed.abs();
        (angle.cos() * speed, angle.sin() * speed)
    }

    /// Offset for one tick of travel along the role's lane
    pub fn step_forward(role: Role, speed: f32) -> (f32, f32) {
        (role.forward() * speed.abs(), 0.0)
    }

    /// Whether a role may deploy at this x coordinate
    pub fn is_deployable(role: Role, x: f32) -> bool {
        let mid = MAP_WIDTH / 2.0;
        match role {
            Role::P1 => x <= mid - MIDLINE_MARGIN,
            Role::P2 => x >= mid + MIDLINE_MARGIN,
        }
    }
}

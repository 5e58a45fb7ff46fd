//! Game simulation modules

pub mod combat;
pub mod economy;
pub mod entities;
pub mod lifecycle;
pub mod r#match;
pub mod physics;
pub mod snapshot;
pub mod targeting;

pub use entities::ConnectionId;
pub use r#match::{MatchConfig, MatchError, MatchHandle, MatchRegistry};

use tokio::sync::oneshot;

use crate::ws::protocol::{MatchSnapshot, Seat, UnitType};

/// Reply to a join: the seat and the state right after seating
#[derive(Debug, Clone)]
pub struct JoinAck {
    pub seat: Seat,
    pub snapshot: MatchSnapshot,
}

/// Boundary operations, queued and applied at the start of a tick
#[derive(Debug)]
pub enum MatchCommand {
    Join {
        connection_id: ConnectionId,
        reply: oneshot::Sender<JoinAck>,
    },
    Leave {
        connection_id: ConnectionId,
    },
    Spawn {
        connection_id: ConnectionId,
        unit_type: UnitType,
        x: f32,
        y: f32,
    },
    /// Replace the match with a fresh empty one
    Reset,
}

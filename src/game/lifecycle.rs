//! Unit cleanup, win detection and the abandoned-side policy

use crate::ws::protocol::{Role, TowerType, Winner};

use super::entities::{Tower, Unit};

/// Drop every unit whose hp reached zero; returns how many were removed
pub fn remove_defeated(units: &mut Vec<Unit>) -> usize {
    let before = units.len();
    units.retain(|u| !u.is_defeated());
    before - units.len()
}

/// Whether any king tower of `role` is still standing
pub fn king_standing(towers: &[Tower], role: Role) -> bool {
    towers
        .iter()
        .any(|t| t.owner == role && t.tower_type == TowerType::King && t.is_standing())
}

/// Decide the winner from king survival.
///
/// Both kings are read before anything is decided. A side only loses while
/// its slot is occupied. If both occupied kings fell on the same tick, p1 is
/// reported as the loser so exactly one winner comes out.
pub fn evaluate_winner(towers: &[Tower], p1_seated: bool, p2_seated: bool) -> Option<Winner> {
    let p1_down = !king_standing(towers, Role::P1);
    let p2_down = !king_standing(towers, Role::P2);

    if p1_down && p1_seated {
        Some(Winner::Player2)
    } else if p2_down && p2_seated {
        Some(Winner::Player1)
    } else {
        None
    }
}

/// Forfeits a side whose slot stays empty while its towers are still in
/// play. Disabled when no grace period is configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbandonWatch {
    grace_ticks: Option<u32>,
    empty_ticks: [u32; 2],
}

impl AbandonWatch {
    pub fn new(grace_ticks: Option<u32>) -> Self {
        Self {
            grace_ticks,
            empty_ticks: [0; 2],
        }
    }

    fn slot(role: Role) -> usize {
        match role {
            Role::P1 => 0,
            Role::P2 => 1,
        }
    }

    /// Consecutive ticks `role` has been ownerless with towers in play
    pub fn empty_ticks(&self, role: Role) -> u32 {
        self.empty_ticks[Self::slot(role)]
    }

    /// Record one tick. `abandoned` means the slot is empty but the role
    /// still has towers on the field. Returns the winner once a role has
    /// been abandoned past the grace period while its opponent is seated.
    pub fn observe(&mut self, p1_abandoned: bool, p2_abandoned: bool, seated: [bool; 2]) -> Option<Winner> {
        let grace = self.grace_ticks?;

        let sides = [(Role::P1, p1_abandoned), (Role::P2, p2_abandoned)];
        for (role, abandoned) in sides {
            let counter = &mut self.empty_ticks[Self::slot(role)];
            *counter = if abandoned { counter.saturating_add(1) } else { 0 };
        }

        // Only a side that is abandoned right now can forfeit, even with zero grace
        sides.into_iter().find_map(|(role, abandoned)| {
            let opponent = role.opponent();
            (abandoned && self.empty_ticks(role) >= grace && seated[Self::slot(opponent)])
                .then(|| Winner::from(opponent))
        })
    }
}

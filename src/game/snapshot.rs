//! Snapshot building for network transmission

use std::collections::BTreeMap;

use crate::ws::protocol::{
    EconomySnapshot, MatchSnapshot, PlayerSlots, ProjectileSnapshot, ServerMsg, TowerSnapshot,
    UnitSnapshot,
};

use super::entities::{PlayerEconomy, Projectile, Tower, Unit};
use super::r#match::MatchState;

impl From<&PlayerEconomy> for EconomySnapshot {
    fn from(e: &PlayerEconomy) -> Self {
        Self {
            role: e.role,
            gold: e.gold,
            max_gold: e.max_gold,
        }
    }
}

impl From<&Unit> for UnitSnapshot {
    fn from(u: &Unit) -> Self {
        Self {
            id: u.id,
            owner: u.owner,
            unit_type: u.unit_type,
            x: u.x,
            y: u.y,
            hp: u.hp,
            max_hp: u.stats.max_hp,
            radius: u.stats.radius,
            color: u.stats.color.to_string(),
            target_id: u.target.map(|t| t.id()),
        }
    }
}

impl From<&Tower> for TowerSnapshot {
    fn from(t: &Tower) -> Self {
        Self {
            id: t.id,
            owner: t.owner,
            tower_type: t.tower_type,
            x: t.x,
            y: t.y,
            hp: t.hp.max(0.0),
            max_hp: t.stats.max_hp,
            range: t.stats.range,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            start_x: p.start_x,
            start_y: p.start_y,
            end_x: p.end_x,
            end_y: p.end_y,
            life: p.life,
            color: p.color.to_string(),
        }
    }
}

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for joins, resets and the final state)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Capture the full match state
    pub fn capture(state: &MatchState) -> MatchSnapshot {
        let player_data: BTreeMap<_, _> = state
            .player_data()
            .iter()
            .map(|(id, eco)| (*id, EconomySnapshot::from(eco)))
            .collect();

        MatchSnapshot {
            tick: state.tick(),
            players: PlayerSlots {
                p1: state.players().p1,
                p2: state.players().p2,
            },
            player_data,
            units: state.units().iter().map(UnitSnapshot::from).collect(),
            towers: state.towers().iter().map(TowerSnapshot::from).collect(),
            projectiles: state.projectiles().iter().map(ProjectileSnapshot::from).collect(),
            winner: state.winner(),
        }
    }

    /// Build a snapshot message
    pub fn build(&self, state: &MatchState) -> ServerMsg {
        ServerMsg::GameState(Self::capture(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::{Role, UnitType};
    use uuid::Uuid;

    #[test]
    fn interval_gates_snapshots() {
        let mut builder = SnapshotBuilder::new(3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn every_tick_interval_always_sends() {
        let mut builder = SnapshotBuilder::new(0);
        assert!(builder.should_send());
        assert!(builder.should_send());
    }

    #[test]
    fn capture_reflects_state() {
        let mut state = MatchState::new(Default::default());
        let p1 = Uuid::new_v4();
        state.join(p1, 1_000);
        let id = state.spawn_unit(p1, UnitType::Grunt, 100.0, 300.0).unwrap();

        let snap = SnapshotBuilder::capture(&state);
        assert_eq!(snap.players.p1, Some(p1));
        assert_eq!(snap.players.p2, None);
        assert_eq!(snap.player_data[&p1].gold, 80);
        assert_eq!(snap.player_data[&p1].role, Role::P1);
        assert_eq!(snap.towers.len(), 3);
        assert_eq!(snap.units.len(), 1);
        assert_eq!(snap.units[0].id, id);
        assert_eq!(snap.units[0].color, "blue");
        assert!(snap.winner.is_none());

        let json = serde_json::to_value(SnapshotBuilder::new(1).build(&state)).unwrap();
        assert_eq!(json["type"], "game_state");
        assert_eq!(json["units"][0]["unit_type"], "GRUNT");
    }
}

//! Match state and authoritative tick loop

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{tick_duration, Clock};
use crate::ws::protocol::{
    PlayerSlots, Role, Seat, ServerMsg, TowerType, UnitType, Winner,
};

use super::combat::{CombatOutcome, CombatSystem, UnitStats, PROJECTILE_DECAY_PER_TICK};
use super::economy::EconomySystem;
use super::entities::{
    ConnectionId, EntityId, EntityIdGen, PlayerEconomy, Projectile, Tower, Unit,
};
use super::lifecycle::{self, AbandonWatch};
use super::physics::{PhysicsSystem, TowerLayout};
use super::snapshot::SnapshotBuilder;
use super::targeting::{BattlefieldView, TargetRef};
use super::{JoinAck, MatchCommand};

/// Tunables for one match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Ticks an emptied slot may keep its towers before forfeiting; `None` disables
    pub abandon_grace_ticks: Option<u32>,
    /// Ticks between broadcast snapshots
    pub snapshot_interval: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            abandon_grace_ticks: None,
            snapshot_interval: 1,
        }
    }
}

/// Match state (owned by match task)
#[derive(Debug, Clone, PartialEq)]
pub struct MatchState {
    config: MatchConfig,
    tick: u64,
    players: PlayerSlots,
    player_data: HashMap<ConnectionId, PlayerEconomy>,
    units: Vec<Unit>,
    towers: Vec<Tower>,
    projectiles: Vec<Projectile>,
    winner: Option<Winner>,
    ids: EntityIdGen,
    abandon: AbandonWatch,
}

impl MatchState {
    pub fn new(config: MatchConfig) -> Self {
        let abandon = AbandonWatch::new(config.abandon_grace_ticks);
        Self {
            config,
            tick: 0,
            players: PlayerSlots::default(),
            player_data: HashMap::new(),
            units: Vec::new(),
            towers: Vec::new(),
            projectiles: Vec::new(),
            winner: None,
            ids: EntityIdGen::default(),
            abandon,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn players(&self) -> &PlayerSlots {
        &self.players
    }

    pub fn player_data(&self) -> &HashMap<ConnectionId, PlayerEconomy> {
        &self.player_data
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Occupied role slots
    pub fn seated_count(&self) -> usize {
        [self.players.p1, self.players.p2]
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    fn slot(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::P1 => self.players.p1,
            Role::P2 => self.players.p2,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionId> {
        match role {
            Role::P1 => &mut self.players.p1,
            Role::P2 => &mut self.players.p2,
        }
    }

    /// Back to the empty starting state
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Seat a connection: p1 first, then p2, otherwise spectator.
    /// A seated connection joining again keeps its seat.
    pub fn join(&mut self, connection_id: ConnectionId, now: u64) -> Seat {
        if let Some(eco) = self.player_data.get(&connection_id) {
            return Seat::from(eco.role);
        }

        let Some(role) = [Role::P1, Role::P2]
            .into_iter()
            .find(|role| self.slot(*role).is_none())
        else {
            return Seat::Spectator;
        };

        *self.slot_mut(role) = Some(connection_id);
        self.player_data
            .insert(connection_id, PlayerEconomy::new(role, now));
        self.raise_towers(role);

        info!(connection_id = %connection_id, role = ?role, "Player seated");
        Seat::from(role)
    }

    fn raise_towers(&mut self, role: Role) {
        let layout = TowerLayout::for_role(role);
        let king = Tower::new(
            self.ids.next_id(),
            role,
            TowerType::King,
            layout.king_x,
            layout.king_y,
        );
        self.towers.push(king);
        for y in layout.princess_ys {
            let princess = Tower::new(
                self.ids.next_id(),
                role,
                TowerType::Princess,
                layout.princess_x,
                y,
            );
            self.towers.push(princess);
        }
    }

    /// Free the connection's slot. Its towers and units stay on the field.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<Role> {
        let role = [Role::P1, Role::P2]
            .into_iter()
            .find(|role| self.slot(*role) == Some(connection_id));
        if let Some(role) = role {
            *self.slot_mut(role) = None;
            info!(connection_id = %connection_id, role = ?role, "Player left seat");
        }
        self.player_data.remove(&connection_id);
        role
    }

    /// Deploy a unit. Invalid requests change nothing and return `None`.
    pub fn spawn_unit(
        &mut self,
        connection_id: ConnectionId,
        unit_type: UnitType,
        x: f32,
        y: f32,
    ) -> Option<EntityId> {
        if self.winner.is_some() {
            debug!(connection_id = %connection_id, "Spawn ignored: match is over");
            return None;
        }
        let Some(economy) = self.player_data.get_mut(&connection_id) else {
            debug!(connection_id = %connection_id, "Spawn ignored: not a player");
            return None;
        };

        let role = economy.role;
        let cost = UnitStats::for_type(unit_type).cost;
        if economy.gold < cost {
            debug!(connection_id = %connection_id, gold = economy.gold, cost, "Spawn ignored: not enough gold");
            return None;
        }
        if !PhysicsSystem::is_deployable(role, x) {
            debug!(connection_id = %connection_id, x, "Spawn ignored: outside own half");
            return None;
        }
        if !EconomySystem::try_spend(economy, cost) {
            return None;
        }

        let id = self.ids.next_id();
        self.units.push(Unit::new(id, role, unit_type, x, y));
        debug!(connection_id = %connection_id, unit_id = id, unit_type = ?unit_type, "Unit spawned");
        Some(id)
    }

    /// Advance the simulation by one tick. Returns false without touching
    /// anything once a winner exists.
    pub fn step(&mut self, now: u64) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.tick += 1;

        self.projectiles
            .retain_mut(|p| p.decay(PROJECTILE_DECAY_PER_TICK));

        for economy in self.player_data.values_mut() {
            EconomySystem::accrue(economy, now);
        }

        let view = BattlefieldView::capture(&self.units, &self.towers);
        let mut outcome = CombatOutcome::default();
        for unit in self.units.iter_mut() {
            CombatSystem::resolve_unit(unit, &view, now, &mut outcome);
        }
        for tower in self.towers.iter_mut() {
            CombatSystem::resolve_tower(tower, &view, now, &mut outcome);
        }
        self.apply_outcome(outcome);

        let removed = lifecycle::remove_defeated(&mut self.units);
        if removed > 0 {
            debug!(tick = self.tick, removed, "Units defeated");
        }

        self.check_win_condition();
        true
    }

    fn apply_outcome(&mut self, outcome: CombatOutcome) {
        for hit in outcome.hits {
            match hit.target {
                TargetRef::Unit(id) => {
                    // Units and towers are pushed in id order and never reordered
                    if let Ok(idx) = self.units.binary_search_by_key(&id, |u| u.id) {
                        let unit = &mut self.units[idx];
                        unit.hp = CombatSystem::apply_damage(unit.hp, hit.damage).0;
                    }
                }
                TargetRef::Tower(id) => {
                    if let Ok(idx) = self.towers.binary_search_by_key(&id, |t| t.id) {
                        let tower = &mut self.towers[idx];
                        if CombatSystem::damage_tower(tower, hit.damage) {
                            info!(tower_id = id, owner = ?tower.owner, tower_type = ?tower.tower_type, attacker = hit.attacker, "Tower destroyed");
                        }
                    }
                }
            }
        }

        for shot in outcome.shots {
            self.projectiles.push(Projectile {
                id: self.ids.next_id(),
                start_x: shot.start_x,
                start_y: shot.start_y,
                end_x: shot.end_x,
                end_y: shot.end_y,
                life: shot.ttl,
                color: shot.color,
            });
        }
    }

    fn has_towers(&self, role: Role) -> bool {
        self.towers.iter().any(|t| t.owner == role)
    }

    /// Check win condition
    fn check_win_condition(&mut self) {
        let seated = [self.players.p1.is_some(), self.players.p2.is_some()];
        let by_king = lifecycle::evaluate_winner(&self.towers, seated[0], seated[1]);
        let by_forfeit = self.abandon.observe(
            !seated[0] && self.has_towers(Role::P1),
            !seated[1] && self.has_towers(Role::P2),
            seated,
        );

        if let Some(winner) = by_king.or(by_forfeit) {
            self.winner = Some(winner);
            info!(tick = self.tick, winner = ?winner, forfeit = by_king.is_none(), "Match decided");
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub command_tx: mpsc::Sender<MatchCommand>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }

    async fn send(&self, command: MatchCommand) -> Result<(), MatchError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| MatchError::Closed(self.id))
    }

    /// Join and wait for the seat assignment
    pub async fn join(&self, connection_id: ConnectionId) -> Result<JoinAck, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(MatchCommand::Join {
            connection_id,
            reply,
        })
        .await?;
        rx.await.map_err(|_| MatchError::NoReply(self.id))
    }

    pub async fn leave(&self, connection_id: ConnectionId) -> Result<(), MatchError> {
        self.send(MatchCommand::Leave { connection_id }).await
    }

    pub async fn spawn_unit(
        &self,
        connection_id: ConnectionId,
        unit_type: UnitType,
        x: f32,
        y: f32,
    ) -> Result<(), MatchError> {
        self.send(MatchCommand::Spawn {
            connection_id,
            unit_type,
            x,
            y,
        })
        .await
    }

    pub async fn reset(&self) -> Result<(), MatchError> {
        self.send(MatchCommand::Reset).await
    }
}

/// Errors talking to a match task
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Match {0} is no longer running")]
    Closed(Uuid),

    #[error("Match {0} dropped the reply")]
    NoReply(Uuid),
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }

    /// Create a match, register it and run its loop on a new task
    pub fn launch(self: &Arc<Self>, config: MatchConfig, clock: Arc<dyn Clock>) -> MatchHandle {
        let match_id = Uuid::new_v4();
        let (game_match, handle) = GameMatch::new(match_id, config, clock);
        self.insert(handle.clone());

        info!(match_id = %match_id, "Created new match");

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            game_match.run().await;
            registry.remove(&match_id);
            info!(match_id = %match_id, "Match removed from registry");
        });

        handle
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match
pub struct GameMatch {
    id: Uuid,
    state: MatchState,
    command_rx: mpsc::Receiver<MatchCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    clock: Arc<dyn Clock>,
    player_count: Arc<AtomicUsize>,
}

impl GameMatch {
    /// Create a new match
    pub fn new(id: Uuid, config: MatchConfig, clock: Arc<dyn Clock>) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = MatchHandle {
            id,
            command_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let game_match = Self {
            id,
            snapshot_builder: SnapshotBuilder::new(config.snapshot_interval),
            state: MatchState::new(config),
            command_rx,
            snapshot_tx,
            clock,
            player_count,
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(match_id = %self.id, "Match loop started");

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            let now = self.clock.now_millis();

            // Drain command queue
            if !self.process_commands(now) {
                info!(match_id = %self.id, "All handles dropped, stopping match");
                break;
            }

            let was_decided = self.state.winner().is_some();
            self.state.step(now);
            if !was_decided && self.state.winner().is_some() {
                self.snapshot_builder.force_next();
            }

            if self.snapshot_builder.should_send() {
                // Nobody listening is fine
                let _ = self.snapshot_tx.send(self.snapshot_builder.build(&self.state));
            }
        }
    }

    /// Apply queued commands; false once the channel is closed and empty
    fn process_commands(&mut self, now: u64) -> bool {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.handle_command(command, now),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_command(&mut self, command: MatchCommand, now: u64) {
        match command {
            MatchCommand::Join {
                connection_id,
                reply,
            } => {
                let seat = self.state.join(connection_id, now);
                self.sync_player_count();
                self.snapshot_builder.force_next();
                let ack = JoinAck {
                    seat,
                    snapshot: SnapshotBuilder::capture(&self.state),
                };
                if reply.send(ack).is_err() {
                    warn!(match_id = %self.id, connection_id = %connection_id, "Joiner went away before seat assignment");
                }
            }
            MatchCommand::Leave { connection_id } => {
                self.state.leave(connection_id);
                self.sync_player_count();
            }
            MatchCommand::Spawn {
                connection_id,
                unit_type,
                x,
                y,
            } => {
                self.state.spawn_unit(connection_id, unit_type, x, y);
            }
            MatchCommand::Reset => {
                info!(match_id = %self.id, "Match reset");
                self.state.reset();
                self.sync_player_count();
                self.snapshot_builder.force_next();
            }
        }
    }

    fn sync_player_count(&self) {
        self.player_count
            .store(self.state.seated_count(), Ordering::Relaxed);
    }
}

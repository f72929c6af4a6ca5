use mazerace_core::action::Action;
use mazerace_core::error::RuleViolation;
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO, PlayerId, goal_row_for};
use mazerace_core::snapshot::{GameSnapshot, LogicalClock, MatchPhase};
use mazerace_core::time::now_ms;
use mazerace_game::GameEngine;
use mazerace_game::walls::walls_are_consistent;

use crate::error::LocalActionError;
use crate::perspective::Perspective;

/// What happened to a snapshot handed to [`SyncCoordinator::apply_remote_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// Newer than anything applied so far; now the current snapshot.
    Accepted,
    /// Not newer than the last applied snapshot. Dropped silently.
    Discarded,
    /// Newer, but geometrically impossible. Not adopted.
    Rejected(String),
}

/// The one mutable current-state cell of a client.
///
/// Every snapshot, local or remote, passes through
/// [`apply_remote_snapshot`](Self::apply_remote_snapshot), which only adopts
/// snapshots whose logical clock is strictly newer.
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    engine: GameEngine,
    game_id: String,
    local_player_id: PlayerId,
    current: Option<GameSnapshot>,
    last_applied: LogicalClock,
}

impl SyncCoordinator {
    pub fn new(engine: GameEngine, game_id: impl Into<String>, local_player_id: PlayerId) -> Self {
        Self {
            engine,
            game_id: game_id.into(),
            local_player_id,
            current: None,
            last_applied: LogicalClock::default(),
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn local_player_id(&self) -> PlayerId {
        self.local_player_id
    }

    pub fn current(&self) -> Option<&GameSnapshot> {
        self.current.as_ref()
    }

    pub fn last_applied(&self) -> LogicalClock {
        self.last_applied
    }

    pub fn perspective(&self) -> Perspective {
        Perspective::for_player(self.local_player_id)
    }

    /// The current snapshot rotated for the local player.
    pub fn display_snapshot(&self) -> Option<GameSnapshot> {
        let view = self.perspective();
        self.current.as_ref().map(|s| view.display_snapshot(s))
    }

    /// True while the match is in progress and the local player is to move.
    pub fn is_my_turn(&self) -> bool {
        self.current.as_ref().is_some_and(|s| {
            s.phase() == MatchPhase::InProgress && s.current_player_id == self.local_player_id
        })
    }

    pub fn is_finished(&self) -> bool {
        self.current.as_ref().is_some_and(GameSnapshot::is_finished)
    }

    /// Adopt `incoming` if its logical clock is strictly newer.
    pub fn apply_remote_snapshot(&mut self, incoming: GameSnapshot) -> SnapshotOutcome {
        let clock = incoming.clock();
        if clock <= self.last_applied {
            tracing::debug!(
                game_id = %self.game_id,
                player_id = self.local_player_id,
                turn_number = clock.turn_number,
                timestamp = clock.timestamp,
                last_turn = self.last_applied.turn_number,
                last_timestamp = self.last_applied.timestamp,
                "Stale snapshot discarded"
            );
            return SnapshotOutcome::Discarded;
        }
        if let Err(reason) = revalidate(&incoming) {
            tracing::warn!(
                game_id = %self.game_id,
                player_id = self.local_player_id,
                turn_number = clock.turn_number,
                timestamp = clock.timestamp,
                %reason,
                "Rejected remote snapshot"
            );
            return SnapshotOutcome::Rejected(reason);
        }
        self.last_applied = clock;
        self.current = Some(incoming);
        SnapshotOutcome::Accepted
    }

    /// Apply a local action optimistically, stamped with the wall clock.
    /// Returns the snapshot to publish.
    pub fn perform_local_action(
        &mut self,
        action: &Action,
    ) -> Result<GameSnapshot, LocalActionError> {
        self.perform_local_action_at(action, now_ms())
    }

    pub fn perform_local_action_at(
        &mut self,
        action: &Action,
        now_ms: u64,
    ) -> Result<GameSnapshot, LocalActionError> {
        let current = self
            .current
            .as_ref()
            .ok_or(RuleViolation::MatchNotStarted)?;
        let next = self
            .engine
            .try_apply_action(current, action, self.local_player_id, now_ms)?;
        // The engine always bumps turn_number, so only revalidation can refuse.
        match self.apply_remote_snapshot(next.clone()) {
            SnapshotOutcome::Accepted => Ok(next),
            outcome => Err(LocalActionError::NotAdopted(outcome)),
        }
    }

    /// Run the local turn timer. Never changes the logical clock.
    pub fn tick(&mut self, elapsed_secs: u32) {
        if let Some(current) = &self.current {
            self.current = Some(self.engine.tick(current, elapsed_secs));
        }
    }

    pub fn is_turn_expired(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| self.engine.is_turn_expired(s))
    }
}

/// Geometric sanity checks on a peer's snapshot.
fn revalidate(snapshot: &GameSnapshot) -> Result<(), String> {
    if snapshot.players.is_empty() {
        return Err("no players".to_string());
    }
    for (id, player) in &snapshot.players {
        if *id != player.id || !matches!(*id, PLAYER_ONE | PLAYER_TWO) {
            return Err(format!("bad player id {id}"));
        }
        if !player.position.in_bounds() {
            return Err(format!("player {id} off board at {}", player.position));
        }
        if player.goal_row != goal_row_for(*id) {
            return Err(format!("player {id} has goal row {}", player.goal_row));
        }
    }
    if let (Some(p1), Some(p2)) = (snapshot.player(PLAYER_ONE), snapshot.player(PLAYER_TWO))
        && p1.position == p2.position
    {
        return Err(format!("both pawns on {}", p1.position));
    }
    if !matches!(snapshot.current_player_id, PLAYER_ONE | PLAYER_TWO) {
        return Err(format!("bad current player {}", snapshot.current_player_id));
    }
    if !walls_are_consistent(&snapshot.walls) {
        return Err("inconsistent walls".to_string());
    }
    Ok(())
}

use rand::Rng;

use mazerace_core::action::Action;
use mazerace_core::board::Position;
use mazerace_core::config::MatchConfig;
use mazerace_core::error::RuleViolation;
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO, Player, PlayerId, opponent_of};
use mazerace_core::snapshot::{GameSnapshot, MatchPhase};

use crate::moves::{is_legal_move, legal_moves};
use crate::setup::{first_player_col, mirrored_col, place_players};
use crate::walls::validate_wall_in;

/// Pure turn-based rules over [`GameSnapshot`] values.
#[derive(Debug, Clone, Default)]
pub struct GameEngine {
    config: MatchConfig,
}

impl GameEngine {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// A match with both players seated, player 1 to move.
    pub fn new_match<R: Rng + ?Sized>(
        &self,
        p1_name: &str,
        p2_name: &str,
        rng: &mut R,
        now_ms: u64,
    ) -> GameSnapshot {
        let players = place_players(
            p1_name,
            p2_name,
            self.config.walls_per_player,
            self.config.start_position,
            rng,
        );
        GameSnapshot::new(players, self.config.turn_duration_secs, now_ms)
    }

    /// An online match holding only its creator, waiting for a joiner.
    pub fn waiting_match<R: Rng + ?Sized>(
        &self,
        p1_name: &str,
        rng: &mut R,
        now_ms: u64,
    ) -> GameSnapshot {
        let col = first_player_col(self.config.start_position, rng);
        let creator = Player::new(PLAYER_ONE, p1_name, col, self.config.walls_per_player);
        GameSnapshot::new([creator], self.config.turn_duration_secs, now_ms)
    }

    /// Seat player 2 in a waiting match, mirrored from player 1 and with the
    /// same wall budget. `None` unless exactly player 1 is seated.
    pub fn join_match(
        &self,
        state: &GameSnapshot,
        p2_name: &str,
        now_ms: u64,
    ) -> Option<GameSnapshot> {
        if state.players.len() != 1 || state.winner.is_some() {
            return None;
        }
        let creator = state.player(PLAYER_ONE)?;
        let joiner = Player::new(
            PLAYER_TWO,
            p2_name,
            mirrored_col(creator.position.col),
            creator.walls_left,
        );
        let mut next = state.clone();
        next.players.insert(PLAYER_TWO, joiner);
        next.timestamp = now_ms;
        Some(next)
    }

    /// Apply one action, reporting why it was refused.
    ///
    /// On success the returned snapshot has a larger `turn_number` and the
    /// given timestamp. Non-terminal actions pass the turn and reset the
    /// turn timer; terminal ones set `winner` and leave the turn owner as is.
    pub fn try_apply_action(
        &self,
        state: &GameSnapshot,
        action: &Action,
        acting_id: PlayerId,
        now_ms: u64,
    ) -> Result<GameSnapshot, RuleViolation> {
        match state.phase() {
            MatchPhase::Finished => return Err(RuleViolation::GameOver),
            MatchPhase::WaitingForPlayers => return Err(RuleViolation::MatchNotStarted),
            MatchPhase::InProgress => {},
        }
        if action.requires_turn() && acting_id != state.current_player_id {
            return Err(RuleViolation::NotYourTurn);
        }

        let mut next = state.clone();
        let terminal = match *action {
            Action::Move { to } => {
                let mover = self.seated(state, acting_id)?;
                let opponent = self.seated(state, opponent_of(acting_id))?;
                if !is_legal_move(mover.position, to, &state.walls, opponent.position) {
                    return Err(RuleViolation::IllegalMove);
                }
                let moved = self.seated_mut(&mut next, acting_id)?;
                moved.position = to;
                let arrived = moved.has_reached_goal().then(|| moved.clone());
                next.winner = arrived;
                next.winner.is_some()
            },
            Action::PlaceWall { wall } => {
                validate_wall_in(&wall, state, acting_id)?;
                next.walls.push(wall.owned_by(acting_id));
                let placer = self.seated_mut(&mut next, acting_id)?;
                placer.walls_left -= 1;
                false
            },
            Action::Timeout => {
                let loser = state.current_player_id;
                next.winner = Some(self.seated(state, opponent_of(loser))?.clone());
                true
            },
            Action::Forfeit => {
                next.winner = Some(self.seated(state, opponent_of(acting_id))?.clone());
                true
            },
        };

        next.turn_number = state.turn_number + 1;
        next.timestamp = now_ms;
        if terminal {
            tracing::info!(
                winner = ?next.winner_id(),
                turn_number = next.turn_number,
                "Match finished"
            );
        } else {
            next.current_player_id = opponent_of(state.current_player_id);
            next.turn_time = self.config.turn_duration_secs;
        }
        Ok(next)
    }

    /// Apply one action; refused actions return the prior snapshot unchanged.
    pub fn apply_action(
        &self,
        state: &GameSnapshot,
        action: &Action,
        acting_id: PlayerId,
        now_ms: u64,
    ) -> GameSnapshot {
        match self.try_apply_action(state, action, acting_id, now_ms) {
            Ok(next) => next,
            Err(reason) => {
                tracing::debug!(player_id = acting_id, %reason, ?action, "Action refused");
                state.clone()
            },
        }
    }

    /// Advance local clocks by whole seconds. Never touches the logical clock.
    pub fn tick(&self, state: &GameSnapshot, elapsed_secs: u32) -> GameSnapshot {
        let mut next = state.clone();
        if state.phase() == MatchPhase::InProgress {
            next.game_time = next.game_time.saturating_add(elapsed_secs);
            next.turn_time = next.turn_time.saturating_sub(elapsed_secs);
        }
        next
    }

    pub fn is_turn_expired(&self, state: &GameSnapshot) -> bool {
        state.phase() == MatchPhase::InProgress && state.turn_time == 0
    }

    /// Cells `id` could move to if it were their turn.
    pub fn moves_for(&self, state: &GameSnapshot, id: PlayerId) -> Vec<Position> {
        match (state.player(id), state.opponent(id)) {
            (Some(me), Some(opp)) => legal_moves(me.position, &state.walls, opp.position),
            _ => Vec::new(),
        }
    }

    fn seated<'a>(
        &self,
        state: &'a GameSnapshot,
        id: PlayerId,
    ) -> Result<&'a Player, RuleViolation> {
        state.player(id).ok_or(RuleViolation::MatchNotStarted)
    }

    fn seated_mut<'a>(
        &self,
        state: &'a mut GameSnapshot,
        id: PlayerId,
    ) -> Result<&'a mut Player, RuleViolation> {
        state
            .players
            .get_mut(&id)
            .ok_or(RuleViolation::MatchNotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazerace_core::board::WallPlacement;
    use mazerace_core::error::WallRejection;
    use mazerace_core::test_helpers::{TEST_TIMESTAMP, hwall, make_snapshot, snapshot_at};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn engine() -> GameEngine {
        GameEngine::new(MatchConfig::default())
    }

    fn step(to: (i32, i32)) -> Action {
        Action::Move {
            to: Position::new(to.0, to.1),
        }
    }

    #[test]
    fn move_passes_turn_and_bumps_clock() {
        let state = make_snapshot();
        let next = engine()
            .try_apply_action(&state, &step((7, 4)), PLAYER_ONE, TEST_TIMESTAMP + 5)
            .unwrap();
        assert_eq!(
            next.player(PLAYER_ONE).unwrap().position,
            Position::new(7, 4)
        );
        assert_eq!(next.current_player_id, PLAYER_TWO);
        assert_eq!(next.turn_number, state.turn_number + 1);
        assert_eq!(next.timestamp, TEST_TIMESTAMP + 5);
        assert_eq!(next.turn_time, 60);
    }

    #[test]
    fn out_of_turn_action_is_refused_and_state_unchanged() {
        let state = make_snapshot();
        let engine = engine();
        assert_eq!(
            engine.try_apply_action(&state, &step((1, 4)), PLAYER_TWO, 1),
            Err(RuleViolation::NotYourTurn)
        );
        assert_eq!(
            engine.apply_action(&state, &step((1, 4)), PLAYER_TWO, 1),
            state
        );
    }

    #[test]
    fn illegal_destination_is_refused() {
        let state = make_snapshot();
        assert_eq!(
            engine().try_apply_action(&state, &step((6, 4)), PLAYER_ONE, 1),
            Err(RuleViolation::IllegalMove)
        );
    }

    #[test]
    fn reaching_goal_row_wins_and_keeps_turn_owner() {
        let state = snapshot_at(Position::new(1, 2), Position::new(5, 5), vec![]);
        let next = engine()
            .try_apply_action(&state, &step((0, 2)), PLAYER_ONE, 2)
            .unwrap();
        assert_eq!(next.winner_id(), Some(PLAYER_ONE));
        assert_eq!(next.winner.as_ref().unwrap().position, Position::new(0, 2));
        assert_eq!(next.current_player_id, PLAYER_ONE);
        assert_eq!(next.turn_number, state.turn_number + 1);
        assert_eq!(
            engine().try_apply_action(&next, &step((1, 2)), PLAYER_ONE, 3),
            Err(RuleViolation::GameOver)
        );
    }

    #[test]
    fn wall_is_recorded_with_owner_and_budget_drops() {
        let state = make_snapshot();
        let action = Action::PlaceWall {
            wall: WallPlacement::horizontal(4, 4),
        };
        let next = engine()
            .try_apply_action(&state, &action, PLAYER_ONE, 9)
            .unwrap();
        assert_eq!(
            next.walls,
            vec![WallPlacement::horizontal(4, 4).owned_by(PLAYER_ONE)]
        );
        assert_eq!(next.player(PLAYER_ONE).unwrap().walls_left, 9);
        assert_eq!(next.current_player_id, PLAYER_TWO);

        let again = engine().try_apply_action(
            &next,
            &Action::PlaceWall {
                wall: WallPlacement::horizontal(4, 5),
            },
            PLAYER_TWO,
            10,
        );
        assert_eq!(again, Err(WallRejection::Overlap.into()));
    }

    #[test]
    fn trapping_wall_leaves_snapshot_untouched() {
        let state = snapshot_at(Position::new(8, 4), Position::new(0, 0), vec![hwall(1, 0)]);
        let action = Action::PlaceWall {
            wall: WallPlacement::vertical(0, 2),
        };
        let engine = engine();
        assert!(matches!(
            engine.try_apply_action(&state, &action, PLAYER_ONE, TEST_TIMESTAMP + 1),
            Err(RuleViolation::IllegalWallPlacement(WallRejection::WouldTrap {
                player_id: PLAYER_TWO,
                ..
            }))
        ));

        let after = engine.apply_action(&state, &action, PLAYER_ONE, TEST_TIMESTAMP + 1);
        assert_eq!(after, state);
        assert_eq!(after.walls, vec![hwall(1, 0)]);
        assert_eq!(after.player(PLAYER_ONE).unwrap().walls_left, 10);
        assert_eq!(after.current_player_id, PLAYER_ONE);
        assert_eq!(after.turn_number, state.turn_number);
    }

    #[test]
    fn timeout_awards_win_to_waiting_player() {
        let mut state = make_snapshot();
        state.current_player_id = PLAYER_TWO;
        // Either peer may report the timeout.
        for reporter in [PLAYER_ONE, PLAYER_TWO] {
            let next = engine()
                .try_apply_action(&state, &Action::Timeout, reporter, 50)
                .unwrap();
            assert_eq!(next.winner_id(), Some(PLAYER_ONE));
            assert_eq!(next.turn_number, state.turn_number + 1);
        }
    }

    #[test]
    fn forfeit_is_accepted_off_turn() {
        let state = make_snapshot();
        let next = engine()
            .try_apply_action(&state, &Action::Forfeit, PLAYER_TWO, 50)
            .unwrap();
        assert_eq!(next.winner_id(), Some(PLAYER_ONE));
    }

    #[test]
    fn waiting_match_refuses_play_until_joined() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(3);
        let waiting = engine.waiting_match("Ann", &mut rng, 100);
        assert_eq!(waiting.phase(), MatchPhase::WaitingForPlayers);
        assert_eq!(
            engine.try_apply_action(&waiting, &step((7, 4)), PLAYER_ONE, 101),
            Err(RuleViolation::MatchNotStarted)
        );

        let joined = engine.join_match(&waiting, "Bo", 150).unwrap();
        assert_eq!(joined.phase(), MatchPhase::InProgress);
        assert_eq!(
            joined.player(PLAYER_TWO).unwrap().position,
            Position::new(0, 4)
        );
        assert_eq!(joined.timestamp, 150);
        assert!(joined.clock() > waiting.clock());
        assert!(engine.join_match(&joined, "Cy", 200).is_none());
    }

    #[test]
    fn joiner_mirrors_creator_and_copies_wall_budget() {
        let waiting = GameSnapshot::new([Player::new(PLAYER_ONE, "Ann", 1, 6)], 30, 0);
        let joined = engine().join_match(&waiting, "Bo", 1).unwrap();
        let p2 = joined.player(PLAYER_TWO).unwrap();
        assert_eq!(p2.position, Position::new(0, 7));
        assert_eq!(p2.walls_left, 6);
    }

    #[test]
    fn tick_counts_down_without_touching_logical_clock() {
        let engine = engine();
        let state = make_snapshot();
        let later = engine.tick(&state, 45);
        assert_eq!(later.turn_time, 15);
        assert_eq!(later.game_time, 45);
        assert_eq!(later.clock(), state.clock());
        assert!(!engine.is_turn_expired(&later));

        let expired = engine.tick(&later, 30);
        assert_eq!(expired.turn_time, 0);
        assert!(engine.is_turn_expired(&expired));
    }

    #[test]
    fn moves_for_matches_resolver() {
        let state = make_snapshot();
        let mut moves = engine().moves_for(&state, PLAYER_ONE);
        moves.sort();
        assert_eq!(
            moves,
            vec![
                Position::new(7, 4),
                Position::new(8, 3),
                Position::new(8, 5),
            ]
        );
    }

    #[test]
    fn new_match_uses_config_walls() {
        let engine = GameEngine::new(MatchConfig {
            walls_per_player: 4,
            ..MatchConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        let state = engine.new_match("A", "B", &mut rng, 7);
        assert!(state.players.values().all(|p| p.walls_left == 4));
        assert_eq!(state.turn_number, 1);
        assert_eq!(state.timestamp, 7);
    }

    mod proptests {
        use super::*;
        use crate::pathfinding::has_path_to_goal;
        use crate::walls::is_geometrically_legal;
        use mazerace_core::board::{BOARD_SIZE, Orientation};
        use mazerace_core::test_helpers::{
            contract_snapshot_roundtrip, contract_trap_invariant_holds,
        };
        use proptest::prelude::*;

        fn arb_action() -> impl Strategy<Value = Action> {
            prop_oneof![
                (0..BOARD_SIZE, 0..BOARD_SIZE).prop_map(|(r, c)| Action::Move {
                    to: Position::new(r, c),
                }),
                (0..BOARD_SIZE, 0..BOARD_SIZE, proptest::bool::ANY).prop_map(|(r, c, h)| {
                    let orientation = if h {
                        Orientation::Horizontal
                    } else {
                        Orientation::Vertical
                    };
                    Action::PlaceWall {
                        wall: WallPlacement::new(r, c, orientation),
                    }
                }),
            ]
        }

        proptest! {
            #[test]
            fn random_play_keeps_trap_invariant(
                actions in proptest::collection::vec(arb_action(), 1..80),
            ) {
                let engine = engine();
                let mut state = make_snapshot();
                for (i, action) in actions.iter().enumerate() {
                    let actor = state.current_player_id;
                    state = engine.apply_action(&state, action, actor, TEST_TIMESTAMP + i as u64);
                    if state.is_finished() {
                        break;
                    }
                }
                contract_trap_invariant_holds(&state, has_path_to_goal);
                contract_snapshot_roundtrip(&state);
                for (i, w) in state.walls.iter().enumerate() {
                    prop_assert!(is_geometrically_legal(&w.placement(), &state.walls[..i]));
                }
                let used: u32 = state.walls.len() as u32;
                let left: u32 = state.players.values().map(|p| p.walls_left).sum();
                prop_assert_eq!(used + left, 20);
            }

            #[test]
            fn applied_actions_strictly_advance_clock(
                actions in proptest::collection::vec(arb_action(), 1..40),
            ) {
                let engine = engine();
                let mut state = make_snapshot();
                for action in &actions {
                    let actor = state.current_player_id;
                    let next = engine.apply_action(&state, action, actor, TEST_TIMESTAMP);
                    if next != state {
                        prop_assert!(next.clock() > state.clock());
                    }
                    state = next;
                }
            }
        }
    }
}

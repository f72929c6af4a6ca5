use rand::Rng;
use rand::seq::IndexedRandom;

use mazerace_core::action::{Action, AiAction, AiActionKind};
use mazerace_core::board::{Orientation, Position, Wall, WallPlacement};
use mazerace_core::config::Difficulty;
use mazerace_core::player::{PLAYER_ONE, Player, PlayerId};
use mazerace_core::snapshot::GameSnapshot;

use crate::engine::GameEngine;
use crate::moves::legal_moves;
use crate::pathfinding::{path_length, shortest_path};
use crate::walls::validate_wall;

/// How many steps of the opponent's route are searched for choke points.
const CHOKE_LOOKAHEAD: usize = 4;

/// Minimum score for a hard agent to spend a wall while already ahead.
const HARD_LEAD_BLOCK_SCORE: i64 = 3;

/// Remaining steps at or under which the agent talks as if winning.
const NEAR_GOAL_STEPS: usize = 2;

/// Lead in steps beyond which the agent admits it is behind.
const BEHIND_MARGIN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mood {
    Winning,
    Losing,
    Blocking,
    Jumping,
    DefaultMove,
    Trapped,
}

impl Mood {
    fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Winning => &[
                "Almost home.",
                "The finish line is in sight.",
                "Only a couple of steps left.",
            ],
            Self::Losing => &[
                "You're quicker than I expected.",
                "Time to rethink this.",
                "This isn't over yet.",
            ],
            Self::Blocking => &[
                "That way is closed now.",
                "Enjoy the detour.",
                "Try going around this one.",
            ],
            Self::Jumping => &[
                "Hopping over you.",
                "Excuse me, coming through.",
                "Leapfrog!",
            ],
            Self::DefaultMove => &[
                "One step at a time.",
                "Pressing forward.",
                "A simple move for now.",
            ],
            Self::Trapped => &[
                "I can't move at all.",
                "Well, this is awkward.",
                "Cornered, for now.",
            ],
        }
    }

    fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> &'static str {
        self.lines().choose(rng).copied().unwrap_or_default()
    }
}

/// A candidate wall and how much it helps the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredWall {
    pub wall: WallPlacement,
    /// Opponent's path growth minus the agent's own path growth, in steps.
    pub score: i64,
}

fn ordered<'a>(me: &'a Player, opponent: &'a Player) -> (&'a Player, &'a Player) {
    if me.id == PLAYER_ONE {
        (me, opponent)
    } else {
        (opponent, me)
    }
}

/// Wall anchors in the grooves beside one step of a route.
fn grooves_beside(from: Position, to: Position) -> Vec<WallPlacement> {
    let mut out = Vec::with_capacity(2);
    if from.row == to.row {
        let col = from.col.min(to.col) + 1;
        out.push(WallPlacement::vertical(from.row, col));
        if from.row > 0 {
            out.push(WallPlacement::vertical(from.row - 1, col));
        }
    } else {
        let row = from.row.min(to.row) + 1;
        out.push(WallPlacement::horizontal(row, from.col));
        if from.col > 0 {
            out.push(WallPlacement::horizontal(row, from.col - 1));
        }
    }
    out
}

/// Best legal wall along the start of the opponent's shortest route.
///
/// Only walls with a positive score are returned. Walls that would leave
/// the agent without a route are never considered.
pub fn find_best_blocking_wall(
    me: &Player,
    opponent: &Player,
    walls: &[Wall],
) -> Option<ScoredWall> {
    let my_len = path_length(me.position, me.goal_row, walls, Some(opponent.position))?;
    let their_path = shortest_path(
        opponent.position,
        opponent.goal_row,
        walls,
        Some(me.position),
    )?;
    if their_path.len() < 2 {
        return None;
    }
    let their_len = their_path.len() - 1;
    let (p1, p2) = ordered(me, opponent);

    let mut best: Option<ScoredWall> = None;
    let segments = (their_path.len() - 1).min(CHOKE_LOOKAHEAD);
    for pair in their_path.windows(2).take(segments) {
        for wall in grooves_beside(pair[0], pair[1]) {
            if validate_wall(&wall, walls, p1, p2, me.id).is_err() {
                continue;
            }
            let mut trial = walls.to_vec();
            trial.push(wall.owned_by(me.id));
            let Some(new_mine) =
                path_length(me.position, me.goal_row, &trial, Some(opponent.position))
            else {
                continue;
            };
            let Some(new_theirs) = path_length(
                opponent.position,
                opponent.goal_row,
                &trial,
                Some(me.position),
            ) else {
                continue;
            };
            let score = (new_theirs as i64 - their_len as i64) - (new_mine as i64 - my_len as i64);
            if best.is_none_or(|b| score > b.score) {
                best = Some(ScoredWall { wall, score });
            }
        }
    }
    best.filter(|b| b.score > 0)
}

/// The step the agent would take if it does not place a wall.
fn candidate_move(me: &Player, opponent: &Player, walls: &[Wall]) -> Option<Position> {
    shortest_path(me.position, me.goal_row, walls, Some(opponent.position))
        .and_then(|path| path.get(1).copied())
        .or_else(|| {
            legal_moves(me.position, walls, opponent.position)
                .first()
                .copied()
        })
}

/// Pick the agent's action for this turn.
pub fn choose_action<R: Rng + ?Sized>(
    me: &Player,
    opponent: &Player,
    walls: &[Wall],
    difficulty: Difficulty,
    rng: &mut R,
) -> AiAction {
    let Some(step) = candidate_move(me, opponent, walls) else {
        return AiAction::pass(Mood::Trapped.pick(rng));
    };
    let is_jump = (step.row - me.position.row).abs() > 1 || (step.col - me.position.col).abs() > 1;
    let move_mood = if is_jump {
        Mood::Jumping
    } else {
        Mood::DefaultMove
    };

    if difficulty == Difficulty::Easy || me.walls_left == 0 || step.row == me.goal_row {
        return AiAction::move_to(step, move_mood.pick(rng));
    }

    let my_len = path_length(me.position, me.goal_row, walls, Some(opponent.position));
    let their_len = path_length(
        opponent.position,
        opponent.goal_row,
        walls,
        Some(me.position),
    );
    let winning = match (my_len, their_len) {
        (Some(mine), Some(theirs)) => mine <= theirs,
        (Some(_), None) => true,
        (None, _) => false,
    };

    if let Some(best) = find_best_blocking_wall(me, opponent, walls) {
        let place = match difficulty {
            Difficulty::Hard => !winning || best.score >= HARD_LEAD_BLOCK_SCORE,
            Difficulty::Medium => !winning,
            Difficulty::Easy => false,
        };
        if place {
            tracing::debug!(
                player_id = me.id,
                row = best.wall.row,
                col = best.wall.col,
                orientation = ?best.wall.orientation,
                score = best.score,
                "Agent places wall"
            );
            return AiAction::place_wall(best.wall, Mood::Blocking.pick(rng));
        }
    }

    let mood = match (my_len, their_len) {
        (Some(mine), _) if mine <= NEAR_GOAL_STEPS => Mood::Winning,
        (Some(mine), Some(theirs)) if mine > theirs + BEHIND_MARGIN => Mood::Losing,
        _ => move_mood,
    };
    tracing::debug!(player_id = me.id, to = %step, "Agent moves");
    AiAction::move_to(step, mood.pick(rng))
}

/// Turn a proposal into an action the engine accepts right now.
///
/// Proposals that the engine would refuse, including stale ones from a
/// slow supplier, fall back to the agent's own candidate move. `None` means
/// there is nothing to play: it is not `me`'s turn, the match is over, or
/// the player has no legal move.
pub fn resolve_proposal(
    engine: &GameEngine,
    proposal: &AiAction,
    state: &GameSnapshot,
    me: PlayerId,
) -> Option<Action> {
    if state.is_finished() || state.current_player_id != me {
        return None;
    }
    if let Some(action) = proposal.to_action()
        && engine
            .try_apply_action(state, &action, me, state.timestamp)
            .is_ok()
    {
        return Some(action);
    }

    let (player, opponent) = (state.player(me)?, state.opponent(me)?);
    let fallback = candidate_move(player, opponent, &state.walls)?;
    if proposal.action != AiActionKind::Pass {
        tracing::warn!(
            player_id = me,
            turn_number = state.turn_number,
            proposal = ?proposal.action,
            "AiProposalInvalid: falling back to candidate move"
        );
    }
    Some(Action::Move { to: fallback })
}

/// Short human-readable form of a proposal.
pub fn describe(action: &AiAction) -> String {
    match (action.action, action.position, action.orientation) {
        (AiActionKind::Move, Some(to), _) => format!("move to {to}"),
        (AiActionKind::PlaceWall, Some(at), Some(Orientation::Horizontal)) => {
            format!("horizontal wall at {at}")
        },
        (AiActionKind::PlaceWall, Some(at), Some(Orientation::Vertical)) => {
            format!("vertical wall at {at}")
        },
        _ => "pass".to_string(),
    }
}

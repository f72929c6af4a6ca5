use mazerace_core::board::{BOARD_SIZE, Orientation, Wall, WallPlacement};
use mazerace_core::error::{RuleViolation, WallRejection};
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO, Player, PlayerId};
use mazerace_core::snapshot::GameSnapshot;

use crate::pathfinding::has_path_to_goal;

/// Whether the anchor lies inside the groove grid for its orientation.
pub fn in_bounds(wall: &WallPlacement) -> bool {
    let last = BOARD_SIZE - 1;
    match wall.orientation {
        Orientation::Horizontal => (0..last).contains(&wall.col) && (1..=last).contains(&wall.row),
        Orientation::Vertical => (0..last).contains(&wall.row) && (1..=last).contains(&wall.col),
    }
}

fn overlaps(existing: &Wall, wall: &WallPlacement) -> bool {
    if existing.orientation != wall.orientation {
        return false;
    }
    match wall.orientation {
        Orientation::Horizontal => existing.row == wall.row && (existing.col - wall.col).abs() < 2,
        Orientation::Vertical => existing.col == wall.col && (existing.row - wall.row).abs() < 2,
    }
}

/// Two walls of opposite orientation sharing a midpoint.
fn crosses(existing: &Wall, wall: &WallPlacement) -> bool {
    match (wall.orientation, existing.orientation) {
        (Orientation::Horizontal, Orientation::Vertical) => {
            existing.row == wall.row - 1 && existing.col == wall.col + 1
        },
        (Orientation::Vertical, Orientation::Horizontal) => {
            existing.row == wall.row + 1 && existing.col == wall.col - 1
        },
        _ => false,
    }
}

/// Local geometry checks only: bounds, duplicate, overlap, cross.
pub fn check_geometry(wall: &WallPlacement, walls: &[Wall]) -> Result<(), WallRejection> {
    if !in_bounds(wall) {
        return Err(WallRejection::OutOfBounds);
    }
    if walls.iter().any(|w| w.occupies_same_groove(wall)) {
        return Err(WallRejection::Duplicate);
    }
    if walls.iter().any(|w| overlaps(w, wall)) {
        return Err(WallRejection::Overlap);
    }
    if walls.iter().any(|w| crosses(w, wall)) {
        return Err(WallRejection::Cross);
    }
    Ok(())
}

pub fn is_geometrically_legal(wall: &WallPlacement, walls: &[Wall]) -> bool {
    check_geometry(wall, walls).is_ok()
}

/// Full placement check of `wall` for `placing_id`.
///
/// Failures are reported in a fixed order: wall budget, bounds, duplicate,
/// overlap, cross, then the trap rule for player 1 and player 2.
pub fn validate_wall(
    wall: &WallPlacement,
    walls: &[Wall],
    player1: &Player,
    player2: &Player,
    placing_id: PlayerId,
) -> Result<(), RuleViolation> {
    let placer = if placing_id == player1.id {
        player1
    } else {
        player2
    };
    if placer.walls_left == 0 {
        return Err(RuleViolation::NoWallsRemaining);
    }
    check_geometry(wall, walls)?;

    let mut hypothetical = Vec::with_capacity(walls.len() + 1);
    hypothetical.extend_from_slice(walls);
    hypothetical.push(wall.owned_by(placing_id));

    for (player, opponent) in [(player1, player2), (player2, player1)] {
        if !has_path_to_goal(
            player.position,
            player.goal_row,
            &hypothetical,
            Some(opponent.position),
        ) {
            return Err(WallRejection::WouldTrap {
                player_id: player.id,
                name: player.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// [`validate_wall`] against the players and walls of a snapshot.
pub fn validate_wall_in(
    wall: &WallPlacement,
    state: &GameSnapshot,
    placing_id: PlayerId,
) -> Result<(), RuleViolation> {
    let (Some(p1), Some(p2)) = (state.player(PLAYER_ONE), state.player(PLAYER_TWO)) else {
        return Err(RuleViolation::MatchNotStarted);
    };
    validate_wall(wall, &state.walls, p1, p2, placing_id)
}

/// Re-check every wall of a received snapshot against the walls placed
/// before it. Used on snapshots from peers.
pub fn walls_are_consistent(walls: &[Wall]) -> bool {
    walls
        .iter()
        .enumerate()
        .all(|(i, w)| is_geometrically_legal(&w.placement(), &walls[..i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazerace_core::board::Position;
    use mazerace_core::test_helpers::{hwall, make_snapshot, snapshot_at, vwall};

    fn reject(wall: WallPlacement, state: &GameSnapshot) -> RuleViolation {
        validate_wall_in(&wall, state, PLAYER_ONE).unwrap_err()
    }

    fn every_anchor() -> impl Iterator<Item = WallPlacement> {
        (0..BOARD_SIZE).flat_map(|r| {
            (0..BOARD_SIZE).flat_map(move |c| {
                [
                    WallPlacement::horizontal(r, c),
                    WallPlacement::vertical(r, c),
                ]
            })
        })
    }

    /// Path search on the board with `wall` added, independent of the validator.
    fn traps_someone(wall: &WallPlacement, state: &GameSnapshot) -> bool {
        let mut walls = state.walls.clone();
        walls.push(wall.owned_by(PLAYER_ONE));
        state.players.values().any(|me| {
            let opponent = state.opponent(me.id).map(|p| p.position);
            !has_path_to_goal(me.position, me.goal_row, &walls, opponent)
        })
    }

    #[test]
    fn accepts_wall_on_open_board() {
        let state = make_snapshot();
        let across = WallPlacement::horizontal(4, 4);
        let upright = WallPlacement::vertical(3, 1);
        assert!(validate_wall_in(&across, &state, PLAYER_ONE).is_ok());
        assert!(validate_wall_in(&upright, &state, PLAYER_TWO).is_ok());
    }

    #[test]
    fn out_of_bounds_anchors() {
        let state = make_snapshot();
        for wall in [
            WallPlacement::horizontal(0, 3),
            WallPlacement::horizontal(9, 3),
            WallPlacement::horizontal(4, 8),
            WallPlacement::horizontal(4, -1),
            WallPlacement::vertical(3, 0),
            WallPlacement::vertical(8, 3),
            WallPlacement::vertical(3, 9),
        ] {
            assert_eq!(
                reject(wall, &state),
                RuleViolation::IllegalWallPlacement(WallRejection::OutOfBounds),
                "{wall:?}"
            );
        }
        assert!(in_bounds(&WallPlacement::horizontal(8, 7)));
        assert!(in_bounds(&WallPlacement::vertical(7, 8)));
    }

    #[test]
    fn duplicate_then_overlap() {
        let state = snapshot_at(Position::new(8, 4), Position::new(0, 4), vec![hwall(4, 4)]);
        assert_eq!(
            reject(WallPlacement::horizontal(4, 4), &state),
            WallRejection::Duplicate.into()
        );
        assert_eq!(
            reject(WallPlacement::horizontal(4, 5), &state),
            WallRejection::Overlap.into()
        );
        assert_eq!(
            reject(WallPlacement::horizontal(4, 3), &state),
            WallRejection::Overlap.into()
        );
        let beside = WallPlacement::horizontal(4, 6);
        assert!(validate_wall_in(&beside, &state, PLAYER_ONE).is_ok());
        // Shares the existing wall's midpoint.
        assert_eq!(
            reject(WallPlacement::vertical(3, 5), &state),
            WallRejection::Cross.into()
        );
    }

    #[test]
    fn vertical_overlap_and_cross() {
        let state = snapshot_at(Position::new(8, 4), Position::new(0, 4), vec![vwall(2, 5)]);
        assert_eq!(
            reject(WallPlacement::vertical(3, 5), &state),
            WallRejection::Overlap.into()
        );
        assert_eq!(
            reject(WallPlacement::horizontal(3, 4), &state),
            WallRejection::Cross.into()
        );
        let below = WallPlacement::vertical(4, 5);
        assert!(validate_wall_in(&below, &state, PLAYER_ONE).is_ok());
    }

    #[test]
    fn no_walls_left_wins_over_geometry() {
        let mut state = make_snapshot();
        if let Some(p) = state.players.get_mut(&PLAYER_ONE) {
            p.walls_left = 0;
        }
        assert_eq!(
            reject(WallPlacement::horizontal(0, 0), &state),
            RuleViolation::NoWallsRemaining
        );
    }

    #[test]
    fn trap_rejection_reports_opponent() {
        // Player 2 in the top-left corner; horizontal (1,0) closes the floor of
        // cells (0,0) and (0,1), vertical (0,2) closes their right side.
        let state = snapshot_at(
            Position::new(8, 4),
            Position::new(0, 0),
            vec![hwall(1, 0)],
        );
        let err = reject(WallPlacement::vertical(0, 2), &state);
        assert_eq!(
            err,
            RuleViolation::IllegalWallPlacement(WallRejection::WouldTrap {
                player_id: PLAYER_TWO,
                name: "Player2".to_string(),
            })
        );
    }

    #[test]
    fn sweep_rejects_exactly_the_trapping_walls() {
        // Player 2 in the top-left pocket under hwall(1,0).
        let pocket = snapshot_at(Position::new(8, 4), Position::new(0, 0), vec![hwall(1, 0)]);
        // Player 1 at the bottom of a one-column corridor, rows 5 to 8.
        let corridor = snapshot_at(
            Position::new(8, 4),
            Position::new(0, 4),
            vec![vwall(7, 4), vwall(7, 5), vwall(5, 4), vwall(5, 5)],
        );
        for state in [pocket, corridor] {
            let mut trapping = 0;
            for wall in every_anchor().filter(|w| is_geometrically_legal(w, &state.walls)) {
                let verdict = validate_wall_in(&wall, &state, PLAYER_ONE);
                if traps_someone(&wall, &state) {
                    trapping += 1;
                    assert!(
                        matches!(
                            verdict,
                            Err(RuleViolation::IllegalWallPlacement(
                                WallRejection::WouldTrap { .. }
                            ))
                        ),
                        "{wall:?} traps but got {verdict:?}"
                    );
                } else {
                    assert_eq!(verdict, Ok(()), "{wall:?}");
                }
            }
            assert!(trapping > 0);
        }
    }

    #[test]
    fn consistency_check_flags_overlapping_history() {
        let apart = [hwall(4, 4), hwall(4, 6), vwall(1, 1)];
        assert!(walls_are_consistent(&apart));
        assert!(!walls_are_consistent(&[hwall(4, 4), hwall(4, 5)]));
        assert!(!walls_are_consistent(&[hwall(0, 4)]));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_placement() -> impl Strategy<Value = WallPlacement> {
            (0..BOARD_SIZE, 0..BOARD_SIZE, proptest::bool::ANY).prop_map(|(r, c, h)| {
                let orientation = if h {
                    Orientation::Horizontal
                } else {
                    Orientation::Vertical
                };
                WallPlacement::new(r, c, orientation)
            })
        }

        fn arb_cell() -> impl Strategy<Value = Position> {
            (0..BOARD_SIZE, 0..BOARD_SIZE).prop_map(|(r, c)| Position::new(r, c))
        }

        proptest! {
            #[test]
            fn validator_accepts_exactly_the_non_trapping_walls(
                earlier in proptest::collection::vec(arb_placement(), 0..30),
                p1 in arb_cell(),
                p2 in arb_cell(),
                candidate in arb_placement(),
            ) {
                prop_assume!(p1 != p2);
                let mut walls: Vec<Wall> = Vec::new();
                for placement in earlier {
                    if is_geometrically_legal(&placement, &walls) {
                        walls.push(placement.owned_by(PLAYER_ONE));
                    }
                }
                prop_assume!(is_geometrically_legal(&candidate, &walls));
                let state = snapshot_at(p1, p2, walls);
                prop_assert_eq!(
                    validate_wall_in(&candidate, &state, PLAYER_ONE).is_ok(),
                    !traps_someone(&candidate, &state)
                );
            }
        }
    }
}

use std::fmt::Write;

use mazerace_core::board::{BOARD_SIZE, Position};
use mazerace_core::player::PlayerId;
use mazerace_core::snapshot::GameSnapshot;
use mazerace_game::moves::is_move_blocked;
use mazerace_sync::Perspective;

/// ASCII board as seen by the viewer: their pawn starts at the bottom.
///
/// Pawns are drawn as their player id, blocked edges as `|` and `-`.
pub fn render_board(snapshot: &GameSnapshot, view: Perspective) -> String {
    let shown = view.display_snapshot(snapshot);
    let pawn_at = |pos: Position| {
        shown
            .players
            .values()
            .find(|p| p.position == pos)
            .map(|p| p.id)
    };
    let label = |id: PlayerId| match shown.player(id) {
        Some(p) => format!("{} ({}), walls left: {}", p.name, id, p.walls_left),
        None => format!("(seat {id} empty)"),
    };

    let mut out = String::new();
    let _ = writeln!(out, "  {}", label(view.top_player_id()));
    for row in 0..BOARD_SIZE {
        let mut line = String::from("  ");
        let mut gap = String::from("  ");
        for col in 0..BOARD_SIZE {
            let pos = Position::new(row, col);
            line.push(match pawn_at(pos) {
                Some(id) => char::from_digit(u32::from(id), 10).unwrap_or('?'),
                None => '.',
            });
            gap.push(if is_move_blocked(pos, pos.offset(1, 0), &shown.walls) {
                '-'
            } else {
                ' '
            });
            if col + 1 < BOARD_SIZE {
                line.push(if is_move_blocked(pos, pos.offset(0, 1), &shown.walls) {
                    '|'
                } else {
                    ' '
                });
                gap.push(' ');
            }
        }
        let _ = writeln!(out, "{line}");
        if row + 1 < BOARD_SIZE {
            let _ = writeln!(out, "{}", gap.trim_end());
        }
    }
    let _ = writeln!(out, "  {}", label(view.bottom_player_id()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO};
    use mazerace_core::test_helpers::{hwall, make_snapshot, snapshot_at, vwall};

    fn lines(snapshot: &GameSnapshot, viewer: PlayerId) -> Vec<String> {
        render_board(snapshot, Perspective::for_player(viewer))
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn own_pawn_is_drawn_at_the_bottom() {
        let snapshot = make_snapshot();
        for viewer in [PLAYER_ONE, PLAYER_TWO] {
            let rows = lines(&snapshot, viewer);
            let digit = char::from_digit(u32::from(viewer), 10).unwrap();
            assert_eq!(rows[17], format!("  . . . . {digit} . . . ."));
            assert!(rows[18].contains(&format!("({viewer})")));
        }
    }

    #[test]
    fn horizontal_wall_spans_two_columns() {
        let snapshot = snapshot_at(Position::new(8, 4), Position::new(0, 4), vec![hwall(3, 4)]);
        // Gap line below board row 2.
        assert_eq!(lines(&snapshot, PLAYER_ONE)[6], "          - -");
        // Rotated: the same wall sits below row 5 at columns 3 and 4.
        assert_eq!(lines(&snapshot, PLAYER_TWO)[12], "        - -");
    }

    #[test]
    fn vertical_wall_spans_two_rows() {
        let snapshot = snapshot_at(Position::new(8, 4), Position::new(0, 4), vec![vwall(0, 1)]);
        let rows = lines(&snapshot, PLAYER_ONE);
        assert!(rows[1].starts_with("  .|."));
        assert!(rows[3].starts_with("  .|."));
        assert!(rows[5].starts_with("  . ."));
    }
}

use mazerace_core::board::{Orientation, Position, Wall};

/// Orthogonal step offsets in visiting order: up, down, left, right.
pub const STEPS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Whether a wall sits on the edge between two orthogonally adjacent cells.
///
/// A row change is blocked by a horizontal wall anchored on the lower of the
/// two rows plus one, covering the column. A column change is blocked by a
/// vertical wall anchored on the lower column plus one, covering the row.
pub fn is_move_blocked(from: Position, to: Position, walls: &[Wall]) -> bool {
    if from.row == to.row {
        let groove_col = from.col.min(to.col) + 1;
        walls.iter().any(|w| {
            w.orientation == Orientation::Vertical
                && w.col == groove_col
                && (w.row == from.row || w.row == from.row - 1)
        })
    } else {
        let groove_row = from.row.min(to.row) + 1;
        walls.iter().any(|w| {
            w.orientation == Orientation::Horizontal
                && w.row == groove_row
                && (w.col == from.col || w.col == from.col - 1)
        })
    }
}

/// Cells reachable in one turn from `pos`, including jumps over the opponent.
///
/// Never contains the opponent's cell or duplicates. Plain steps are listed
/// in up, down, left, right order, with any jump destination taking the
/// place of the step onto the opponent.
pub fn legal_moves(pos: Position, walls: &[Wall], opponent: Position) -> Vec<Position> {
    let mut moves = Vec::with_capacity(5);
    let push = |cell: Position, moves: &mut Vec<Position>| {
        if cell.in_bounds() && cell != opponent && !moves.contains(&cell) {
            moves.push(cell);
        }
    };

    for (dr, dc) in STEPS {
        let step = pos.offset(dr, dc);
        if !step.in_bounds() || is_move_blocked(pos, step, walls) {
            continue;
        }
        if step != opponent {
            push(step, &mut moves);
            continue;
        }

        let straight = opponent.offset(dr, dc);
        if straight.in_bounds() && !is_move_blocked(opponent, straight, walls) {
            push(straight, &mut moves);
            continue;
        }

        // Straight jump is off the board or walled: side-step around the opponent.
        let sides = if dr == 0 {
            [opponent.offset(-1, 0), opponent.offset(1, 0)]
        } else {
            [opponent.offset(0, -1), opponent.offset(0, 1)]
        };
        for side in sides {
            if side.in_bounds() && !is_move_blocked(opponent, side, walls) {
                push(side, &mut moves);
            }
        }
    }
    moves
}

/// Open orthogonal neighbours, ignoring any pawn.
pub fn open_neighbors(pos: Position, walls: &[Wall]) -> impl Iterator<Item = Position> + '_ {
    STEPS.into_iter().filter_map(move |(dr, dc)| {
        let next = pos.offset(dr, dc);
        let open = next.in_bounds() && !is_move_blocked(pos, next, walls);
        open.then_some(next)
    })
}

/// Whether `to` is one of the cells `legal_moves` would offer.
pub fn is_legal_move(from: Position, to: Position, walls: &[Wall], opponent: Position) -> bool {
    legal_moves(from, walls, opponent).contains(&to)
}

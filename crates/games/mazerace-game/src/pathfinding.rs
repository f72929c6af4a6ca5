use std::collections::{HashMap, VecDeque};

use mazerace_core::board::{Position, Wall};

use crate::moves::{legal_moves, open_neighbors};

/// Breadth-first shortest route from `from` to any cell on `goal_row`.
///
/// The returned path starts with `from`. With an opponent position, steps
/// follow [`legal_moves`] so jumps count as one step and the opponent's cell
/// is never entered; without one, plain orthogonal steps are used.
/// Neighbours are explored up, down, left, right, so ties resolve the same
/// way on every peer.
pub fn shortest_path(
    from: Position,
    goal_row: i32,
    walls: &[Wall],
    opponent: Option<Position>,
) -> Option<Vec<Position>> {
    if from.row == goal_row {
        return Some(vec![from]);
    }

    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    came_from.insert(from, from);

    while let Some(current) = queue.pop_front() {
        let neighbors: Vec<Position> = match opponent {
            Some(opp) => legal_moves(current, walls, opp),
            None => open_neighbors(current, walls).collect(),
        };
        for next in neighbors {
            if came_from.contains_key(&next) {
                continue;
            }
            came_from.insert(next, current);
            if next.row == goal_row {
                return Some(rebuild_path(&came_from, from, next));
            }
            queue.push_back(next);
        }
    }
    None
}

fn rebuild_path(
    came_from: &HashMap<Position, Position>,
    start: Position,
    end: Position,
) -> Vec<Position> {
    let mut path = vec![end];
    let mut cursor = end;
    while cursor != start {
        let Some(&prev) = came_from.get(&cursor) else {
            break;
        };
        path.push(prev);
        cursor = prev;
    }
    path.reverse();
    path
}

/// Number of steps on the shortest route, or `None` if the goal is sealed off.
pub fn path_length(
    from: Position,
    goal_row: i32,
    walls: &[Wall],
    opponent: Option<Position>,
) -> Option<usize> {
    shortest_path(from, goal_row, walls, opponent).map(|p| p.len() - 1)
}

pub fn has_path_to_goal(
    from: Position,
    goal_row: i32,
    walls: &[Wall],
    opponent: Option<Position>,
) -> bool {
    shortest_path(from, goal_row, walls, opponent).is_some()
}

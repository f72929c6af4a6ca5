use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Side length of the square board.
pub const BOARD_SIZE: i32 = 9;

/// A cell on the board. Row 0 is player 2's home row, row `BOARD_SIZE - 1`
/// is player 1's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        (0..BOARD_SIZE).contains(&self.row) && (0..BOARD_SIZE).contains(&self.col)
    }

    /// The cell `dr` rows and `dc` columns away. May be off the board.
    pub fn offset(self, dr: i32, dc: i32) -> Self {
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Wall orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A requested wall position, before it is attributed to a player.
///
/// A horizontal anchor `(r, c)` sits in the groove between rows `r - 1` and
/// `r`, covering columns `c` and `c + 1`. A vertical anchor `(r, c)` sits in
/// the groove between columns `c - 1` and `c`, covering rows `r` and `r + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallPlacement {
    pub row: i32,
    pub col: i32,
    pub orientation: Orientation,
}

impl WallPlacement {
    pub const fn new(row: i32, col: i32, orientation: Orientation) -> Self {
        Self {
            row,
            col,
            orientation,
        }
    }

    pub const fn horizontal(row: i32, col: i32) -> Self {
        Self::new(row, col, Orientation::Horizontal)
    }

    pub const fn vertical(row: i32, col: i32) -> Self {
        Self::new(row, col, Orientation::Vertical)
    }

    pub fn owned_by(self, owner_id: PlayerId) -> Wall {
        Wall {
            row: self.row,
            col: self.col,
            orientation: self.orientation,
            owner_id,
        }
    }
}

/// A placed two-cell wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wall {
    pub row: i32,
    pub col: i32,
    pub orientation: Orientation,
    pub owner_id: PlayerId,
}

impl Wall {
    pub fn placement(&self) -> WallPlacement {
        WallPlacement::new(self.row, self.col, self.orientation)
    }

    pub fn occupies_same_groove(&self, other: &WallPlacement) -> bool {
        self.row == other.row && self.col == other.col && self.orientation == other.orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_check_covers_all_edges() {
        assert!(Position::new(0, 0).in_bounds());
        assert!(Position::new(8, 8).in_bounds());
        assert!(!Position::new(-1, 4).in_bounds());
        assert!(!Position::new(4, 9).in_bounds());
        assert!(!Position::new(9, 0).in_bounds());
    }

    #[test]
    fn wall_json_uses_camel_case_owner() {
        let wall = WallPlacement::horizontal(3, 4).owned_by(2);
        let json = serde_json::to_value(wall).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"row": 3, "col": 4, "orientation": "horizontal", "ownerId": 2})
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::board::{BOARD_SIZE, Position};

/// Player slot in a match: 1 starts at the bottom row, 2 at the top row.
pub type PlayerId = u8;

pub const PLAYER_ONE: PlayerId = 1;
pub const PLAYER_TWO: PlayerId = 2;

/// The other slot in a two-player match.
pub fn opponent_of(id: PlayerId) -> PlayerId {
    if id == PLAYER_ONE {
        PLAYER_TWO
    } else {
        PLAYER_ONE
    }
}

/// The row a player must reach to win.
pub fn goal_row_for(id: PlayerId) -> i32 {
    if id == PLAYER_ONE { 0 } else { BOARD_SIZE - 1 }
}

/// The row a player starts on.
pub fn home_row_for(id: PlayerId) -> i32 {
    BOARD_SIZE - 1 - goal_row_for(id)
}

/// A pawn and its owner's remaining resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: PlayerColor,
    pub position: Position,
    pub walls_left: u32,
    pub goal_row: i32,
}

impl Player {
    /// Build a player on their home row at `col`, with slot-default color and goal.
    pub fn new(id: PlayerId, name: impl Into<String>, col: i32, walls_left: u32) -> Self {
        Self {
            id,
            name: name.into(),
            color: PlayerColor::for_slot(id),
            position: Position::new(home_row_for(id), col),
            walls_left,
            goal_row: goal_row_for(id),
        }
    }

    pub fn has_reached_goal(&self) -> bool {
        self.position.row == self.goal_row
    }
}

/// Pawn color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for PlayerColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl PlayerColor {
    pub const PALETTE: &[PlayerColor] = &[
        PlayerColor {
            r: 34,
            g: 211,
            b: 238,
        }, // Cyan
        PlayerColor {
            r: 236,
            g: 72,
            b: 153,
        }, // Pink
    ];

    pub fn for_slot(id: PlayerId) -> Self {
        if id == PLAYER_TWO {
            Self::PALETTE[1]
        } else {
            Self::PALETTE[0]
        }
    }
}

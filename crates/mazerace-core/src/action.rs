use serde::{Deserialize, Serialize};

use crate::board::{Orientation, Position, WallPlacement};

/// One player action, applied to a snapshot by the game engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Move { to: Position },
    PlaceWall { wall: WallPlacement },
    /// The player whose turn it is ran out of time.
    Timeout,
    /// The acting player concedes.
    Forfeit,
}

impl Action {
    /// Turn-owned actions are only accepted from the player to move.
    pub fn requires_turn(&self) -> bool {
        matches!(self, Self::Move { .. } | Self::PlaceWall { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiActionKind {
    Move,
    PlaceWall,
    Pass,
}

/// A move proposal from an agent. `position` is the destination for a move
/// and the wall anchor for a wall placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAction {
    pub action: AiActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    /// Free text for display only.
    #[serde(default)]
    pub reasoning: String,
}

impl AiAction {
    pub fn move_to(to: Position, reasoning: impl Into<String>) -> Self {
        Self {
            action: AiActionKind::Move,
            position: Some(to),
            orientation: None,
            reasoning: reasoning.into(),
        }
    }

    pub fn place_wall(wall: WallPlacement, reasoning: impl Into<String>) -> Self {
        Self {
            action: AiActionKind::PlaceWall,
            position: Some(Position::new(wall.row, wall.col)),
            orientation: Some(wall.orientation),
            reasoning: reasoning.into(),
        }
    }

    pub fn pass(reasoning: impl Into<String>) -> Self {
        Self {
            action: AiActionKind::Pass,
            position: None,
            orientation: None,
            reasoning: reasoning.into(),
        }
    }

    /// Engine action this proposal describes, if it is well-formed.
    pub fn to_action(&self) -> Option<Action> {
        match (self.action, self.position, self.orientation) {
            (AiActionKind::Move, Some(to), _) => Some(Action::Move { to }),
            (AiActionKind::PlaceWall, Some(at), Some(orientation)) => Some(Action::PlaceWall {
                wall: WallPlacement::new(at.row, at.col, orientation),
            }),
            _ => None,
        }
    }
}

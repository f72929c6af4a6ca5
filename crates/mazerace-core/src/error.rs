use crate::player::PlayerId;

/// Why a wall request failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WallRejection {
    OutOfBounds,
    Duplicate,
    Overlap,
    Cross,
    /// The wall would leave this player with no route to their goal row.
    WouldTrap { player_id: PlayerId, name: String },
}

impl std::fmt::Display for WallRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "wall placement is out of bounds"),
            Self::Duplicate => write!(f, "a wall already exists there"),
            Self::Overlap => write!(f, "walls cannot overlap"),
            Self::Cross => write!(f, "walls cannot cross each other"),
            Self::WouldTrap { player_id, name } => {
                write!(f, "this wall would trap {name} (player {player_id})")
            },
        }
    }
}

/// A rejected player action. Returned as a value; the snapshot it was
/// checked against is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    IllegalMove,
    IllegalWallPlacement(WallRejection),
    NoWallsRemaining,
    NotYourTurn,
    GameOver,
    MatchNotStarted,
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalMove => write!(f, "illegal move"),
            Self::IllegalWallPlacement(reason) => write!(f, "illegal wall placement: {reason}"),
            Self::NoWallsRemaining => write!(f, "no walls left"),
            Self::NotYourTurn => write!(f, "not your turn"),
            Self::GameOver => write!(f, "the game is already over"),
            Self::MatchNotStarted => write!(f, "waiting for an opponent"),
        }
    }
}

impl std::error::Error for RuleViolation {}

impl From<WallRejection> for RuleViolation {
    fn from(reason: WallRejection) -> Self {
        Self::IllegalWallPlacement(reason)
    }
}

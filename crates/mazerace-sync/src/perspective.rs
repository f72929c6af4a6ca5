use mazerace_core::board::{BOARD_SIZE, Orientation, Position, Wall, WallPlacement};
use mazerace_core::player::{PLAYER_TWO, Player, PlayerId, opponent_of};
use mazerace_core::snapshot::GameSnapshot;

/// Presentation transform so the local player always starts at the bottom.
///
/// Player 2 sees the board rotated 180 degrees. Every mapping is its own
/// inverse, so the same call converts view coordinates back to board
/// coordinates. Canonical snapshots are never stored rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Perspective {
    local_player_id: PlayerId,
}

impl Perspective {
    pub fn for_player(local_player_id: PlayerId) -> Self {
        Self { local_player_id }
    }

    pub fn is_rotated(&self) -> bool {
        self.local_player_id == PLAYER_TWO
    }

    /// Player drawn at the bottom edge.
    pub fn bottom_player_id(&self) -> PlayerId {
        self.local_player_id
    }

    pub fn top_player_id(&self) -> PlayerId {
        opponent_of(self.local_player_id)
    }

    pub fn position(&self, pos: Position) -> Position {
        if !self.is_rotated() {
            return pos;
        }
        Position::new(BOARD_SIZE - 1 - pos.row, BOARD_SIZE - 1 - pos.col)
    }

    pub fn row(&self, row: i32) -> i32 {
        if self.is_rotated() {
            BOARD_SIZE - 1 - row
        } else {
            row
        }
    }

    pub fn placement(&self, wall: WallPlacement) -> WallPlacement {
        if !self.is_rotated() {
            return wall;
        }
        let (row, col) = match wall.orientation {
            Orientation::Horizontal => (BOARD_SIZE - wall.row, BOARD_SIZE - 2 - wall.col),
            Orientation::Vertical => (BOARD_SIZE - 2 - wall.row, BOARD_SIZE - wall.col),
        };
        WallPlacement::new(row, col, wall.orientation)
    }

    pub fn wall(&self, wall: &Wall) -> Wall {
        self.placement(wall.placement()).owned_by(wall.owner_id)
    }

    fn player(&self, player: &Player) -> Player {
        Player {
            position: self.position(player.position),
            goal_row: self.row(player.goal_row),
            ..player.clone()
        }
    }

    /// The snapshot as the local player should see it.
    pub fn display_snapshot(&self, snapshot: &GameSnapshot) -> GameSnapshot {
        if !self.is_rotated() {
            return snapshot.clone();
        }
        GameSnapshot {
            players: snapshot
                .players
                .iter()
                .map(|(id, p)| (*id, self.player(p)))
                .collect(),
            walls: snapshot.walls.iter().map(|w| self.wall(w)).collect(),
            winner: snapshot.winner.as_ref().map(|w| self.player(w)),
            ..snapshot.clone()
        }
    }
}

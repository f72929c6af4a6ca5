pub mod action;
pub mod board;
pub mod config;
pub mod error;
pub mod net;
pub mod player;
pub mod snapshot;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::board::{Position, Wall, WallPlacement};
    use crate::net::protocol::{decode_snapshot, encode_snapshot};
    use crate::player::{PLAYER_ONE, PLAYER_TWO, Player};
    use crate::snapshot::GameSnapshot;

    /// Default turn duration used by fixtures.
    pub const TEST_TURN_SECS: u32 = 60;

    /// Fixed timestamp used by fixtures.
    pub const TEST_TIMESTAMP: u64 = 1_700_000_000_000;

    /// Two players on their home rows in the middle column.
    pub fn make_players(walls_left: u32) -> [Player; 2] {
        [
            Player::new(PLAYER_ONE, "Player1", 4, walls_left),
            Player::new(PLAYER_TWO, "Player2", 4, walls_left),
        ]
    }

    /// A fresh in-progress snapshot, player 1 to move.
    pub fn make_snapshot() -> GameSnapshot {
        GameSnapshot::new(make_players(10), TEST_TURN_SECS, TEST_TIMESTAMP)
    }

    /// A snapshot with pawns at the given cells and the given walls.
    pub fn snapshot_at(p1: Position, p2: Position, walls: Vec<Wall>) -> GameSnapshot {
        let mut snap = make_snapshot();
        if let Some(p) = snap.players.get_mut(&PLAYER_ONE) {
            p.position = p1;
        }
        if let Some(p) = snap.players.get_mut(&PLAYER_TWO) {
            p.position = p2;
        }
        snap.walls = walls;
        snap
    }

    /// Horizontal wall owned by player 1.
    pub fn hwall(row: i32, col: i32) -> Wall {
        WallPlacement::horizontal(row, col).owned_by(PLAYER_ONE)
    }

    /// Vertical wall owned by player 1.
    pub fn vwall(row: i32, col: i32) -> Wall {
        WallPlacement::vertical(row, col).owned_by(PLAYER_ONE)
    }

    // ================================================================
    // Rule Contract Tests
    // ================================================================
    // Any snapshot produced by legal play must satisfy these. Game crates
    // call them with their own path search plugged in.

    /// Every player in the snapshot can still reach their goal row.
    pub fn contract_trap_invariant_holds<F>(snapshot: &GameSnapshot, has_path: F)
    where
        F: Fn(Position, i32, &[Wall], Option<Position>) -> bool,
    {
        for player in snapshot.players.values() {
            let opponent = snapshot.opponent(player.id).map(|p| p.position);
            assert!(
                has_path(player.position, player.goal_row, &snapshot.walls, opponent),
                "player {} at {} has no path to row {} with {} walls",
                player.id,
                player.position,
                player.goal_row,
                snapshot.walls.len()
            );
        }
    }

    /// Encoding then decoding a snapshot yields an equal snapshot.
    pub fn contract_snapshot_roundtrip(snapshot: &GameSnapshot) {
        let bytes = encode_snapshot(snapshot).expect("snapshot must encode");
        let back = decode_snapshot(&bytes)
            .expect("snapshot must decode")
            .expect("non-empty payload must not decode as tombstone");
        assert_eq!(
            &back, snapshot,
            "snapshot must survive encode→decode unchanged"
        );
    }
}

use rand::Rng;

use mazerace_core::board::BOARD_SIZE;
use mazerace_core::config::StartPosition;
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO, Player};

/// Column mirrored across the vertical centre line.
pub fn mirrored_col(col: i32) -> i32 {
    BOARD_SIZE - 1 - col
}

/// Starting column of player 1 for the chosen start rule.
pub fn first_player_col<R: Rng + ?Sized>(start: StartPosition, rng: &mut R) -> i32 {
    match start {
        StartPosition::Center => BOARD_SIZE / 2,
        StartPosition::Random => rng.random_range(0..BOARD_SIZE),
    }
}

/// Starting columns for both players.
///
/// Centre starts put both pawns in the middle column. Random starts mirror
/// player 2 so both face the same distance to the side walls.
pub fn start_columns<R: Rng + ?Sized>(start: StartPosition, rng: &mut R) -> (i32, i32) {
    let p1 = first_player_col(start, rng);
    (p1, mirrored_col(p1))
}

/// Both pawns on their home rows with equal wall budgets.
pub fn place_players<R: Rng + ?Sized>(
    p1_name: &str,
    p2_name: &str,
    walls: u32,
    start: StartPosition,
    rng: &mut R,
) -> [Player; 2] {
    let (c1, c2) = start_columns(start, rng);
    [
        Player::new(PLAYER_ONE, p1_name, c1, walls),
        Player::new(PLAYER_TWO, p2_name, c2, walls),
    ]
}

mod render;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use mazerace_core::config::{Difficulty, MatchConfig, StartPosition};
use mazerace_core::net::messages::PlayerProfile;
use mazerace_core::snapshot::GameSnapshot;
use mazerace_game::GameEngine;
use mazerace_sync::{
    Channel, GameSession, Lobby, LocalAgent, MatchAssignment, MemoryBroker, MemoryClient,
    Perspective, SessionEnd, SessionEvent, SyncError, spawn_session,
};

use render::render_board;

/// How the two peers find each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Pairing {
    /// Both search the open lobby.
    Search,
    /// The first peer creates a game, the second joins it by id.
    Create,
}

/// Play an online Maze Race match between two agents over an in-process broker.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, value_enum, default_value_t = Pairing::Search)]
    pairing: Pairing,
    /// Agent strength of the first peer.
    #[arg(long)]
    first: Option<Difficulty>,
    /// Agent strength of the second peer.
    #[arg(long)]
    second: Option<Difficulty>,
    #[arg(long)]
    turn_secs: Option<u32>,
    #[arg(long)]
    walls: Option<u32>,
    #[arg(long)]
    start: Option<StartPosition>,
    /// Fixed agent thinking delay in milliseconds.
    #[arg(long)]
    think_ms: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Print the board after every adopted snapshot.
    #[arg(long)]
    board: bool,
}

impl Cli {
    /// Command-line flags override file and default config.
    fn apply(&self, mut config: MatchConfig) -> MatchConfig {
        if let Some(secs) = self.turn_secs {
            config.turn_duration_secs = secs;
        }
        if let Some(walls) = self.walls {
            config.walls_per_player = walls;
        }
        if let Some(start) = self.start {
            config.start_position = start;
        }
        if let Some(ms) = self.think_ms {
            config.agent_think_min_ms = ms;
            config.agent_think_max_ms = ms;
        }
        config
    }
}

#[derive(Debug)]
enum CliError {
    Sync(SyncError),
    Task(tokio::task::JoinError),
    Unfinished(SessionEnd),
    Diverged,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(e) => write!(f, "{e}"),
            Self::Task(e) => write!(f, "session task failed: {e}"),
            Self::Unfinished(end) => write!(f, "match did not finish: {end:?}"),
            Self::Diverged => write!(f, "peers ended on different snapshots"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Match failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.apply(MatchConfig::load());
    let seed = cli.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::info!(seed, pairing = ?cli.pairing, "Starting match");

    let broker = MemoryBroker::new();
    let (first, second) = (Arc::new(broker.connect()), Arc::new(broker.connect()));
    let engine = GameEngine::new(config.clone());
    let (seat_a, seat_b) = pair(cli.pairing, &first, &second, &engine, &mut rng).await?;
    let view = Perspective::for_player(seat_a.local_player_id);

    let agent_a = LocalAgent::new(
        cli.first.unwrap_or(config.difficulty),
        config.agent_think_range(),
        rng.random(),
    );
    let agent_b = LocalAgent::new(
        cli.second.unwrap_or(config.difficulty),
        config.agent_think_range(),
        rng.random(),
    );
    let (_commands_a, mut events_a, handle_a) = spawn_session(
        GameSession::new(as_channel(&first), engine.clone(), seat_a)
            .with_agent(Box::new(agent_a)),
    );
    let (_commands_b, _events_b, handle_b) = spawn_session(
        GameSession::new(as_channel(&second), engine, seat_b)
            .with_agent(Box::new(agent_b)),
    );

    while let Some(event) = events_a.recv().await {
        match event {
            SessionEvent::Snapshot(snapshot) if cli.board => {
                println!(
                    "turn {}\n{}",
                    snapshot.turn_number,
                    render_board(&snapshot, view)
                );
            },
            SessionEvent::Finished(snapshot) => print_result(&snapshot),
            _ => {},
        }
    }

    let (end_a, end_b) = (handle_a.await??, handle_b.await??);
    match (end_a, end_b) {
        (SessionEnd::Finished(a), SessionEnd::Finished(b)) if a == b => Ok(()),
        (SessionEnd::Finished(_), SessionEnd::Finished(_)) => Err(CliError::Diverged),
        (SessionEnd::Finished(_), other) | (other, _) => Err(CliError::Unfinished(other)),
    }
}

/// Seat both peers, by lobby search or by create-and-join.
async fn pair(
    pairing: Pairing,
    first: &Arc<MemoryClient>,
    second: &Arc<MemoryClient>,
    engine: &GameEngine,
    rng: &mut StdRng,
) -> Result<(MatchAssignment, MatchAssignment), SyncError> {
    let lobby_a = Lobby::new(as_channel(first), engine.clone());
    let lobby_b = Lobby::new(as_channel(second), engine.clone());
    let walls_left = engine.config().walls_per_player;
    match pairing {
        Pairing::Search => {
            let mut rng_b = StdRng::seed_from_u64(rng.random());
            let profile = |name: &str| PlayerProfile {
                name: name.to_string(),
                walls_left,
            };
            let (a, b) = tokio::join!(
                lobby_a.find_match(profile("Ada"), rng),
                lobby_b.find_match(profile("Bea"), &mut rng_b)
            );
            Ok((a?, b?))
        },
        Pairing::Create => {
            let created = lobby_a.create_game("Ada", rng).await?;
            let (a, b) = tokio::join!(
                lobby_a.await_joiner(&created.game_id),
                lobby_b.join_game(&created.game_id, "Bea")
            );
            Ok((a?, b?))
        },
    }
}

fn as_channel(client: &Arc<MemoryClient>) -> Arc<dyn Channel> {
    Arc::clone(client) as Arc<dyn Channel>
}

fn print_result(snapshot: &GameSnapshot) {
    match &snapshot.winner {
        Some(winner) => println!(
            "{} (player {}) wins on turn {} with {} walls on the board",
            winner.name,
            winner.id,
            snapshot.turn_number,
            snapshot.walls.len()
        ),
        None => println!("match ended without a winner"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "mazerace",
            "--walls",
            "4",
            "--turn-secs",
            "15",
            "--start",
            "random",
            "--think-ms",
            "0",
            "--first",
            "hard",
        ])
        .unwrap();
        let config = cli.apply(MatchConfig::default());
        assert_eq!(config.walls_per_player, 4);
        assert_eq!(config.turn_duration_secs, 15);
        assert_eq!(config.start_position, StartPosition::Random);
        assert_eq!(config.agent_think_range().0, std::time::Duration::ZERO);
        assert_eq!(cli.first, Some(Difficulty::Hard));
        assert_eq!(cli.pairing, Pairing::Search);
    }

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["mazerace", "--pairing", "create"]).unwrap();
        assert_eq!(cli.pairing, Pairing::Create);
        assert_eq!(cli.apply(MatchConfig::default()), MatchConfig::default());
    }

    #[test]
    fn bad_difficulty_is_refused() {
        let parsed = Cli::try_parse_from(["mazerace", "--first", "brutal"]);
        assert!(parsed.is_err());
    }
}

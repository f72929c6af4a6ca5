use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Agent strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Where pawns start on their home rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Both pawns in the middle column.
    #[default]
    Center,
    /// Player 1 in a random column, player 2 mirrored across the board.
    Random,
}

impl std::str::FromStr for StartPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Ok(Self::Center),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown start position: {other}")),
        }
    }
}

/// Data-driven match and session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Seconds a player has to act before the turn times out.
    pub turn_duration_secs: u32,
    /// Walls each player starts with.
    pub walls_per_player: u32,
    pub start_position: StartPosition,
    /// Strength of the local agent.
    pub difficulty: Difficulty,
    /// Reconciliation poll period while waiting on the opponent.
    pub poll_interval_ms: u64,
    /// Simulated thinking delay bounds for the local agent.
    pub agent_think_min_ms: u64,
    pub agent_think_max_ms: u64,
    /// Deadline for an open lobby search.
    pub match_search_timeout_secs: u64,
    /// Deadline for a created game to receive a joiner.
    pub game_creation_timeout_secs: u64,
    /// Deadline for fetching a game snapshot when joining by id.
    pub join_fetch_timeout_ms: u64,
    /// Delay between the final snapshot and the tombstone on leave.
    pub leave_flush_delay_ms: u64,
    /// Prefix of every pub/sub topic.
    pub topic_prefix: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            turn_duration_secs: 60,
            walls_per_player: 10,
            start_position: StartPosition::Center,
            difficulty: Difficulty::Medium,
            poll_interval_ms: 1000,
            agent_think_min_ms: 1000,
            agent_think_max_ms: 2000,
            match_search_timeout_secs: 180,
            game_creation_timeout_secs: 300,
            join_fetch_timeout_ms: 8000,
            leave_flush_delay_ms: 200,
            topic_prefix: "mazerace/v1".to_string(),
        }
    }
}

impl MatchConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MAZERACE_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring invalid config file"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/mazerace.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn match_search_timeout(&self) -> Duration {
        Duration::from_secs(self.match_search_timeout_secs)
    }

    pub fn game_creation_timeout(&self) -> Duration {
        Duration::from_secs(self.game_creation_timeout_secs)
    }

    pub fn join_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.join_fetch_timeout_ms)
    }

    pub fn leave_flush_delay(&self) -> Duration {
        Duration::from_millis(self.leave_flush_delay_ms)
    }

    /// Think bounds as an ordered `(min, max)` pair.
    pub fn agent_think_range(&self) -> (Duration, Duration) {
        let lo = self.agent_think_min_ms.min(self.agent_think_max_ms);
        let hi = self.agent_think_min_ms.max(self.agent_think_max_ms);
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

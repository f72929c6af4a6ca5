use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mazerace_core::action::AiAction;
use mazerace_core::config::{Difficulty, MatchConfig};
use mazerace_core::player::PlayerId;
use mazerace_core::snapshot::GameSnapshot;
use mazerace_game::bot::choose_action;

/// Anything that proposes a move for a player: the built-in heuristic or a
/// remote model. Proposals are advisory; the session re-resolves them
/// against the snapshot that is current when they arrive.
#[async_trait::async_trait]
pub trait MoveSupplier: Send + Sync {
    async fn propose(&mut self, state: GameSnapshot, me: PlayerId) -> AiAction;
}

/// Heuristic agent with a simulated thinking delay.
pub struct LocalAgent {
    difficulty: Difficulty,
    think_min_ms: u64,
    think_max_ms: u64,
    rng: StdRng,
}

impl LocalAgent {
    pub fn new(difficulty: Difficulty, think_range: (Duration, Duration), seed: u64) -> Self {
        let (lo, hi) = think_range;
        let lo_ms = lo.as_millis() as u64;
        Self {
            difficulty,
            think_min_ms: lo_ms,
            think_max_ms: (hi.as_millis() as u64).max(lo_ms),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &MatchConfig, seed: u64) -> Self {
        Self::new(config.difficulty, config.agent_think_range(), seed)
    }

    fn think_time(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.think_min_ms..=self.think_max_ms))
    }
}

#[async_trait::async_trait]
impl MoveSupplier for LocalAgent {
    async fn propose(&mut self, state: GameSnapshot, me: PlayerId) -> AiAction {
        let think = self.think_time();
        if !think.is_zero() {
            tokio::time::sleep(think).await;
        }
        let (Some(player), Some(opponent)) = (state.player(me), state.opponent(me)) else {
            return AiAction::pass("Waiting for an opponent");
        };
        choose_action(
            player,
            opponent,
            &state.walls,
            self.difficulty,
            &mut self.rng,
        )
    }
}

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

use mazerace_core::action::{Action, AiAction};
use mazerace_core::error::RuleViolation;
use mazerace_core::net::messages::EmojiEvent;
use mazerace_core::net::protocol::{
    TOMBSTONE, Topics, decode_emoji, decode_snapshot, encode_emoji, encode_snapshot,
};
use mazerace_core::snapshot::{GameSnapshot, MatchPhase};
use mazerace_core::time::now_ms;
use mazerace_game::GameEngine;
use mazerace_game::bot::{describe, resolve_proposal};

use crate::agent::MoveSupplier;
use crate::channel::{Channel, Publication, PublishOptions};
use crate::coordinator::{SnapshotOutcome, SyncCoordinator};
use crate::error::{LocalActionError, SyncError};
use crate::lobby::MatchAssignment;

/// Queue depth between the subscription forwarder and the session loop.
const PUSH_QUEUE: usize = 64;

/// Requests from the host (UI, CLI, test) to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Act(Action),
    Emoji(String),
    Leave,
}

/// Notifications from a running session to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A newer canonical snapshot was adopted, local or remote.
    Snapshot(GameSnapshot),
    /// A host action was refused by the rules.
    Rejected(RuleViolation),
    /// A peer's emoji reaction.
    Emoji(EmojiEvent),
    /// The match ended; both peers have had time to converge.
    Finished(GameSnapshot),
    /// The game topic was cleared before the match finished here.
    Closed,
}

/// How a session loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Finished(GameSnapshot),
    Left(Option<GameSnapshot>),
    Closed,
}

/// An agent proposal being computed off the session loop.
struct PendingProposal {
    turn_number: u64,
    handle: JoinHandle<(Box<dyn MoveSupplier>, AiAction)>,
}

/// One client's half of an online match.
pub struct GameSession {
    channel: Arc<dyn Channel>,
    coordinator: SyncCoordinator,
    state_topic: String,
    emoji_topic: String,
    agent: Option<Box<dyn MoveSupplier>>,
    /// A local snapshot whose publish failed; retried on the next poll.
    unpublished: Option<GameSnapshot>,
    /// Turn on which the agent had nothing to play.
    agent_idle_turn: Option<u64>,
}

impl GameSession {
    pub fn new(
        channel: Arc<dyn Channel>,
        engine: GameEngine,
        assignment: MatchAssignment,
    ) -> Self {
        let topics = Topics::new(engine.config().topic_prefix.clone());
        let mut coordinator = SyncCoordinator::new(
            engine,
            assignment.game_id.clone(),
            assignment.local_player_id,
        );
        coordinator.apply_remote_snapshot(assignment.snapshot);
        Self {
            channel,
            coordinator,
            state_topic: topics.game_state(&assignment.game_id),
            emoji_topic: topics.game_emoji(&assignment.game_id),
            agent: None,
            unpublished: None,
            agent_idle_turn: None,
        }
    }

    /// Let `agent` play this seat.
    pub fn with_agent(mut self, agent: Box<dyn MoveSupplier>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Drive the session until the match finishes, the host leaves, or the
    /// game is closed.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<SessionEnd, SyncError> {
        let state_sub = self.channel.subscribe(&self.state_topic).await?;
        let emoji_sub = match self.channel.subscribe(&self.emoji_topic).await {
            Ok(sub) => sub,
            Err(e) => {
                self.unsubscribe_all().await;
                return Err(e.into());
            },
        };
        let (push_tx, mut pushes) = mpsc::channel::<Publication>(PUSH_QUEUE);
        let forwarder = tokio::spawn(async move {
            let mut merged = futures::stream::select(state_sub, emoji_sub);
            while let Some(publication) = merged.next().await {
                if push_tx.send(publication).await.is_err() {
                    break;
                }
            }
        });

        let config = self.coordinator.engine().config().clone();
        let poll_every = config.poll_interval();
        let mut poll = tokio::time::interval_at(Instant::now() + poll_every, poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let second = Duration::from_secs(1);
        let mut countdown = tokio::time::interval_at(Instant::now() + second, second);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pending: Option<PendingProposal> = None;
        let mut commands_open = true;
        let mut linger_until: Option<Instant> = None;

        tracing::info!(
            game_id = %self.coordinator.game_id(),
            player_id = self.coordinator.local_player_id(),
            "Session started"
        );

        let end = loop {
            if self.coordinator.is_finished() && linger_until.is_none() {
                linger_until = Some(Instant::now() + poll_every * 2);
            }
            if pending.is_none() {
                pending = self.start_agent_turn();
            }
            let in_progress = self
                .coordinator
                .current()
                .is_some_and(|s| s.phase() == MatchPhase::InProgress);
            let my_turn = self.coordinator.is_my_turn();

            tokio::select! {
                Some(publication) = pushes.recv() => {
                    if self.intake(publication, &events) == Flow::Closed {
                        break SessionEnd::Closed;
                    }
                },
                _ = poll.tick(), if !my_turn => {
                    if self.reconcile(&events).await == Flow::Closed {
                        break SessionEnd::Closed;
                    }
                },
                _ = countdown.tick(), if in_progress => {
                    self.coordinator.tick(1);
                    if self.coordinator.is_turn_expired() {
                        tracing::info!(
                            game_id = %self.coordinator.game_id(),
                            player_id = self.coordinator.local_player_id(),
                            "Turn timer expired"
                        );
                        if let Err(e) = self.act(Action::Timeout, &events).await {
                            tracing::debug!(error = %e, "Timeout not applied");
                        }
                    }
                },
                cmd = commands.recv(), if commands_open => {
                    match cmd {
                        Some(SessionCommand::Act(action)) => {
                            match self.act(action, &events).await {
                                Ok(()) => {},
                                Err(LocalActionError::Rule(reason)) => {
                                    let _ = events.send(SessionEvent::Rejected(reason));
                                },
                                Err(e) => tracing::error!(error = %e, "Local action lost"),
                            }
                        },
                        Some(SessionCommand::Emoji(emoji)) => self.send_emoji(emoji).await,
                        Some(SessionCommand::Leave) => {
                            if let Some(p) = pending.take() {
                                p.handle.abort();
                            }
                            break self.leave(&events).await;
                        },
                        None => commands_open = false,
                    }
                },
                (turn_number, result) = join_pending(&mut pending) => {
                    self.finish_agent_turn(turn_number, result, &events).await;
                },
                _ = tokio::time::sleep_until(linger_until.unwrap_or_else(Instant::now)),
                    if linger_until.is_some() => {
                    if self.reconcile(&events).await == Flow::Closed {
                        break SessionEnd::Closed;
                    }
                    match self.coordinator.current() {
                        Some(final_snapshot) if final_snapshot.is_finished() => {
                            let final_snapshot = final_snapshot.clone();
                            let _ = events.send(SessionEvent::Finished(final_snapshot.clone()));
                            break SessionEnd::Finished(final_snapshot);
                        },
                        _ => linger_until = None,
                    }
                },
            }
        };

        if let Some(p) = pending.take() {
            p.handle.abort();
        }
        forwarder.abort();
        self.unsubscribe_all().await;
        if end == SessionEnd::Closed {
            let _ = events.send(SessionEvent::Closed);
        }
        tracing::info!(
            game_id = %self.coordinator.game_id(),
            player_id = self.coordinator.local_player_id(),
            "Session ended"
        );
        Ok(end)
    }

    /// Handle one pushed publication.
    fn intake(
        &mut self,
        publication: Publication,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Flow {
        if publication.topic == self.emoji_topic {
            match decode_emoji(&publication.payload) {
                Ok(emoji) if emoji.sender_id != self.coordinator.local_player_id() => {
                    let _ = events.send(SessionEvent::Emoji(emoji));
                },
                Ok(_) => {},
                Err(e) => tracing::warn!(error = %e, "Undecodable emoji"),
            }
            return Flow::Continue;
        }
        self.intake_state(&publication.payload, events)
    }

    fn intake_state(
        &mut self,
        payload: &[u8],
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Flow {
        match decode_snapshot(payload) {
            Ok(Some(snapshot)) => {
                let outcome = self.coordinator.apply_remote_snapshot(snapshot.clone());
                if outcome == SnapshotOutcome::Accepted {
                    let _ = events.send(SessionEvent::Snapshot(snapshot));
                }
                Flow::Continue
            },
            Ok(None) if self.coordinator.is_finished() => Flow::Continue,
            Ok(None) => {
                tracing::info!(game_id = %self.coordinator.game_id(), "Game closed by peer");
                Flow::Closed
            },
            Err(e) => {
                tracing::warn!(
                    game_id = %self.coordinator.game_id(),
                    error = %e,
                    "Undecodable snapshot"
                );
                Flow::Continue
            },
        }
    }

    /// Pull the retained snapshot in case a push was lost.
    async fn reconcile(&mut self, events: &mpsc::UnboundedSender<SessionEvent>) -> Flow {
        if let Some(snapshot) = self.unpublished.take() {
            self.publish_snapshot(snapshot).await;
        }
        match self.channel.fetch_latest(&self.state_topic).await {
            Ok(Some(payload)) => self.intake_state(&payload, events),
            Ok(None) => Flow::Continue,
            Err(e) => {
                tracing::warn!(
                    game_id = %self.coordinator.game_id(),
                    error = %e,
                    "Reconciliation fetch failed"
                );
                Flow::Continue
            },
        }
    }

    /// Apply a local action optimistically, then publish it.
    async fn act(
        &mut self,
        action: Action,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<(), LocalActionError> {
        let next = self.coordinator.perform_local_action(&action)?;
        let _ = events.send(SessionEvent::Snapshot(next.clone()));
        self.publish_snapshot(next).await;
        Ok(())
    }

    async fn publish_snapshot(&mut self, snapshot: GameSnapshot) {
        let payload = match encode_snapshot(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode snapshot");
                return;
            },
        };
        if let Err(e) = self
            .channel
            .publish(&self.state_topic, payload, PublishOptions::RETAINED)
            .await
        {
            tracing::warn!(
                game_id = %self.coordinator.game_id(),
                turn_number = snapshot.turn_number,
                error = %e,
                "Snapshot publish failed, will retry"
            );
            self.unpublished = Some(snapshot);
        }
    }

    async fn send_emoji(&self, emoji: String) {
        let event = EmojiEvent {
            emoji,
            sender_id: self.coordinator.local_player_id(),
            timestamp: now_ms(),
        };
        let result = match encode_emoji(&event) {
            Ok(payload) => self
                .channel
                .publish(&self.emoji_topic, payload, PublishOptions::TRANSIENT)
                .await
                .map_err(SyncError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Emoji not sent");
        }
    }

    /// Forfeit if still playing, then clear the game topic.
    async fn leave(&mut self, events: &mpsc::UnboundedSender<SessionEvent>) -> SessionEnd {
        let playing = self
            .coordinator
            .current()
            .is_some_and(|s| s.phase() == MatchPhase::InProgress);
        if playing && let Err(e) = self.act(Action::Forfeit, events).await {
            tracing::warn!(error = %e, "Forfeit not applied");
        }
        let flush = self.coordinator.engine().config().leave_flush_delay();
        tokio::time::sleep(flush).await;
        if let Err(e) = self
            .channel
            .publish(
                &self.state_topic,
                TOMBSTONE.to_vec(),
                PublishOptions::RETAINED,
            )
            .await
        {
            tracing::warn!(error = %e, "Tombstone publish failed");
        }
        tracing::info!(
            game_id = %self.coordinator.game_id(),
            player_id = self.coordinator.local_player_id(),
            forfeited = playing,
            "Left game"
        );
        SessionEnd::Left(self.coordinator.current().cloned())
    }

    /// Hand the current snapshot to the agent if it is our move.
    fn start_agent_turn(&mut self) -> Option<PendingProposal> {
        if !self.coordinator.is_my_turn() {
            return None;
        }
        let state = self.coordinator.current()?.clone();
        if self.agent_idle_turn == Some(state.turn_number) {
            return None;
        }
        let mut agent = self.agent.take()?;
        let me = self.coordinator.local_player_id();
        let turn_number = state.turn_number;
        let handle = tokio::spawn(async move {
            let proposal = agent.propose(state, me).await;
            (agent, proposal)
        });
        Some(PendingProposal {
            turn_number,
            handle,
        })
    }

    async fn finish_agent_turn(
        &mut self,
        turn_number: u64,
        result: Result<(Box<dyn MoveSupplier>, AiAction), JoinError>,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) {
        let (agent, proposal) = match result {
            Ok(done) => done,
            Err(e) => {
                tracing::warn!(error = %e, "Agent task failed, seat is now idle");
                return;
            },
        };
        self.agent = Some(agent);

        let Some(state) = self.coordinator.current().cloned() else {
            return;
        };
        if state.turn_number != turn_number {
            tracing::debug!(
                proposed_for = turn_number,
                turn_number = state.turn_number,
                "Agent proposal outdated, discarded"
            );
            return;
        }
        let me = self.coordinator.local_player_id();
        match resolve_proposal(self.coordinator.engine(), &proposal, &state, me) {
            Some(action) => {
                tracing::debug!(
                    player_id = me,
                    turn_number,
                    proposal = %describe(&proposal),
                    reasoning = %proposal.reasoning,
                    "Agent acts"
                );
                if let Err(e) = self.act(action, events).await {
                    tracing::warn!(error = %e, "Agent action refused");
                    self.agent_idle_turn = Some(turn_number);
                }
            },
            None => self.agent_idle_turn = Some(turn_number),
        }
    }

    async fn unsubscribe_all(&self) {
        for topic in [&self.state_topic, &self.emoji_topic] {
            if let Err(e) = self.channel.unsubscribe(topic).await {
                tracing::warn!(topic = %topic, error = %e, "Unsubscribe failed");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Closed,
}

/// Resolves when the pending proposal finishes; never resolves without one.
async fn join_pending(
    pending: &mut Option<PendingProposal>,
) -> (u64, Result<(Box<dyn MoveSupplier>, AiAction), JoinError>) {
    let Some(p) = pending.as_mut() else {
        return std::future::pending().await;
    };
    let result = (&mut p.handle).await;
    let turn_number = p.turn_number;
    *pending = None;
    (turn_number, result)
}

/// Spawn a session loop. Returns the command sender, the event receiver and
/// the loop's join handle.
pub fn spawn_session(
    session: GameSession,
) -> (
    mpsc::UnboundedSender<SessionCommand>,
    mpsc::UnboundedReceiver<SessionEvent>,
    JoinHandle<Result<SessionEnd, SyncError>>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(session.run(cmd_rx, event_tx));
    (cmd_tx, event_rx, handle)
}

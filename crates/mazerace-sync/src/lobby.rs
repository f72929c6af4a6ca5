use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;

use mazerace_core::net::messages::{JoinRequestMsg, LobbyMessage, MatchFoundMsg, PlayerProfile};
use mazerace_core::net::protocol::{
    Topics, decode_lobby_message, decode_snapshot, encode_lobby_message, encode_snapshot,
};
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO, PlayerId};
use mazerace_core::snapshot::GameSnapshot;
use mazerace_core::time::now_ms;
use mazerace_game::GameEngine;
use mazerace_game::setup::place_players;

use crate::channel::{Channel, ChannelError, PublishOptions, Subscription};
use crate::error::SyncError;

/// A seat in a game: which game, which player we are, and the snapshot we
/// start from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAssignment {
    pub game_id: String,
    pub local_player_id: PlayerId,
    pub snapshot: GameSnapshot,
}

/// Short random id used for games and lobby searches.
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Game creation, joining by id, and open match search.
pub struct Lobby {
    channel: Arc<dyn Channel>,
    engine: GameEngine,
    topics: Topics,
}

impl Lobby {
    pub fn new(channel: Arc<dyn Channel>, engine: GameEngine) -> Self {
        let topics = Topics::new(engine.config().topic_prefix.clone());
        Self {
            channel,
            engine,
            topics,
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Publish a waiting game holding only player 1.
    pub async fn create_game<R: Rng + Send + ?Sized>(
        &self,
        p1_name: &str,
        rng: &mut R,
    ) -> Result<MatchAssignment, SyncError> {
        let game_id = short_id();
        let snapshot = self.engine.waiting_match(p1_name, rng, now_ms());
        self.publish_snapshot(&game_id, &snapshot).await?;
        tracing::info!(game_id = %game_id, player_id = PLAYER_ONE, "Game created");
        Ok(MatchAssignment {
            game_id,
            local_player_id: PLAYER_ONE,
            snapshot,
        })
    }

    /// Wait until someone takes the second seat of a game we created.
    pub async fn await_joiner(&self, game_id: &str) -> Result<MatchAssignment, SyncError> {
        let topic = self.topics.game_state(game_id);
        let mut sub = self.channel.subscribe(&topic).await?;
        let waited = with_deadline(
            self.engine.config().game_creation_timeout(),
            "game creation",
            async {
                while let Some(publication) = sub.next().await {
                    match decode_snapshot(&publication.payload) {
                        Ok(Some(snapshot)) if snapshot.players.len() == 2 => return Ok(snapshot),
                        Ok(Some(_)) => {},
                        Ok(None) => {
                            return Err(SyncError::JoinRejected("game was closed".to_string()));
                        },
                        Err(e) => tracing::warn!(game_id, error = %e, "Undecodable snapshot"),
                    }
                }
                Err(SyncError::Channel(ChannelError::Closed))
            },
        )
        .await;
        self.unsubscribe_quietly(&topic).await;

        let snapshot = waited?;
        tracing::info!(game_id, "Opponent joined");
        Ok(MatchAssignment {
            game_id: game_id.to_string(),
            local_player_id: PLAYER_ONE,
            snapshot,
        })
    }

    /// Take the second seat of a waiting game.
    pub async fn join_game(
        &self,
        game_id: &str,
        p2_name: &str,
    ) -> Result<MatchAssignment, SyncError> {
        let topic = self.topics.game_state(game_id);
        let fetched = with_deadline(self.engine.config().join_fetch_timeout(), "game fetch", async {
            self.channel.fetch_latest(&topic).await.map_err(SyncError::from)
        })
        .await?;

        let waiting = match fetched.as_deref().map(decode_snapshot).transpose()? {
            Some(Some(snapshot)) => snapshot,
            _ => return Err(SyncError::JoinRejected(format!("game {game_id} not found"))),
        };
        if waiting.players.len() != 1 {
            return Err(SyncError::JoinRejected(format!("game {game_id} is full")));
        }
        let snapshot = self
            .engine
            .join_match(&waiting, p2_name, now_ms())
            .ok_or_else(|| SyncError::JoinRejected(format!("game {game_id} is not open")))?;

        self.publish_snapshot(game_id, &snapshot).await?;
        tracing::info!(game_id, player_id = PLAYER_TWO, "Joined game");
        Ok(MatchAssignment {
            game_id: game_id.to_string(),
            local_player_id: PLAYER_TWO,
            snapshot,
        })
    }

    /// Pair with any other searching peer.
    ///
    /// When two requests meet, the peer with the smaller lobby id creates
    /// the match as player 1. The other re-announces itself once so that a
    /// peer which subscribed late still sees it.
    pub async fn find_match<R: Rng + Send + ?Sized>(
        &self,
        profile: PlayerProfile,
        rng: &mut R,
    ) -> Result<MatchAssignment, SyncError> {
        let lobby_id = short_id();
        let join_topic = self.topics.lobby_join();
        let match_topic = self.topics.lobby_match(&lobby_id);

        let join_sub = self.channel.subscribe(&join_topic).await?;
        let match_sub = match self.channel.subscribe(&match_topic).await {
            Ok(sub) => sub,
            Err(e) => {
                self.unsubscribe_quietly(&join_topic).await;
                return Err(e.into());
            },
        };
        let request = JoinRequestMsg {
            lobby_id: lobby_id.clone(),
            player_data: profile,
            start_pos: self.engine.config().start_position,
            duration: self.engine.config().turn_duration_secs,
        };
        tracing::info!(lobby_id = %lobby_id, "Searching for a match");

        let searched = with_deadline(
            self.engine.config().match_search_timeout(),
            "match search",
            self.search(&request, &match_topic, join_sub, match_sub, rng),
        )
        .await;
        self.unsubscribe_quietly(&join_topic).await;
        self.unsubscribe_quietly(&match_topic).await;
        searched
    }

    async fn search<R: Rng + Send + ?Sized>(
        &self,
        request: &JoinRequestMsg,
        match_topic: &str,
        join_sub: Subscription,
        match_sub: Subscription,
        rng: &mut R,
    ) -> Result<MatchAssignment, SyncError> {
        let own = encode_lobby_message(&LobbyMessage::JoinRequest(request.clone()))?;
        let join_topic = self.topics.lobby_join();
        self.channel
            .publish(&join_topic, own.clone(), PublishOptions::TRANSIENT)
            .await?;

        let mut answered: HashSet<String> = HashSet::new();
        let mut incoming = futures::stream::select(join_sub, match_sub);
        while let Some(publication) = incoming.next().await {
            let msg = match decode_lobby_message(&publication.payload) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(
                        topic = %publication.topic,
                        error = %e,
                        "Undecodable lobby message"
                    );
                    continue;
                },
            };
            match msg {
                LobbyMessage::MatchFound(found) if publication.topic == match_topic => {
                    return self.accept_match(found).await;
                },
                LobbyMessage::JoinRequest(theirs) if theirs.lobby_id != request.lobby_id => {
                    if request.lobby_id < theirs.lobby_id {
                        return self.host_match(request, &theirs, rng).await;
                    }
                    if answered.insert(theirs.lobby_id.clone()) {
                        self.channel
                            .publish(&join_topic, own.clone(), PublishOptions::TRANSIENT)
                            .await?;
                    }
                },
                _ => {},
            }
        }
        Err(SyncError::Channel(ChannelError::Closed))
    }

    /// We answered a request: create the game as player 1.
    async fn host_match<R: Rng + Send + ?Sized>(
        &self,
        mine: &JoinRequestMsg,
        theirs: &JoinRequestMsg,
        rng: &mut R,
    ) -> Result<MatchAssignment, SyncError> {
        let game_id = short_id();
        let [player1, player2] = place_players(
            &mine.player_data.name,
            &theirs.player_data.name,
            theirs.player_data.walls_left,
            theirs.start_pos,
            rng,
        );
        let seated = [player1.clone(), player2.clone()];
        let snapshot = GameSnapshot::new(seated, theirs.duration, now_ms());
        self.publish_snapshot(&game_id, &snapshot).await?;

        let found = LobbyMessage::MatchFound(MatchFoundMsg {
            game_id: game_id.clone(),
            player1,
            player2,
            duration: theirs.duration,
        });
        self.channel
            .publish(
                &self.topics.lobby_match(&theirs.lobby_id),
                encode_lobby_message(&found)?,
                PublishOptions::TRANSIENT,
            )
            .await?;
        tracing::info!(
            game_id = %game_id,
            player_id = PLAYER_ONE,
            opponent = %theirs.player_data.name,
            "Match found"
        );
        Ok(MatchAssignment {
            game_id,
            local_player_id: PLAYER_ONE,
            snapshot,
        })
    }

    /// Someone answered our request: we are player 2.
    async fn accept_match(&self, found: MatchFoundMsg) -> Result<MatchAssignment, SyncError> {
        let retained = self
            .channel
            .fetch_latest(&self.topics.game_state(&found.game_id))
            .await?;
        let snapshot = match retained.as_deref().map(decode_snapshot).transpose()? {
            Some(Some(snapshot)) => snapshot,
            _ => GameSnapshot::new([found.player1, found.player2], found.duration, now_ms()),
        };
        tracing::info!(game_id = %found.game_id, player_id = PLAYER_TWO, "Match found");
        Ok(MatchAssignment {
            game_id: found.game_id,
            local_player_id: PLAYER_TWO,
            snapshot,
        })
    }

    async fn publish_snapshot(
        &self,
        game_id: &str,
        snapshot: &GameSnapshot,
    ) -> Result<(), SyncError> {
        self.channel
            .publish(
                &self.topics.game_state(game_id),
                encode_snapshot(snapshot)?,
                PublishOptions::RETAINED,
            )
            .await?;
        Ok(())
    }

    async fn unsubscribe_quietly(&self, topic: &str) {
        if let Err(e) = self.channel.unsubscribe(topic).await {
            tracing::warn!(topic, error = %e, "Unsubscribe failed");
        }
    }
}

/// Run `fut`, mapping deadline expiry to [`SyncError::ChannelTimeout`].
pub(crate) async fn with_deadline<T, F>(
    deadline: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = deadline.as_millis() as u64,
                "Deadline expired"
            );
            Err(SyncError::ChannelTimeout(operation))
        },
    }
}

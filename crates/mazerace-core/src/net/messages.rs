use serde::{Deserialize, Serialize};

use crate::config::StartPosition;
use crate::player::{Player, PlayerId};

/// What a peer announces about itself when looking for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub name: String,
    pub walls_left: u32,
}

/// Broadcast on the lobby topic by a peer looking for an opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequestMsg {
    /// Per-search id; replies go to the lobby match topic for this id.
    pub lobby_id: String,
    pub player_data: PlayerProfile,
    pub start_pos: StartPosition,
    /// Turn duration in seconds.
    pub duration: u32,
}

/// Sent by the peer that creates the match back to the requester, carrying
/// both fully placed players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFoundMsg {
    pub game_id: String,
    pub player1: Player,
    pub player2: Player,
    pub duration: u32,
}

/// Messages exchanged on lobby topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyMessage {
    JoinRequest(JoinRequestMsg),
    MatchFound(MatchFoundMsg),
}

/// Ephemeral emoji reaction. Never retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmojiEvent {
    pub emoji: String,
    pub sender_id: PlayerId,
    pub timestamp: u64,
}

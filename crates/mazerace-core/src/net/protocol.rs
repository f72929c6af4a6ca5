use serde::{Deserialize, Serialize};

use crate::snapshot::GameSnapshot;

use super::messages::{EmojiEvent, LobbyMessage};

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Retained payload that marks a game as gone.
pub const TOMBSTONE: &[u8] = b"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    EmptyPayload,
    PayloadTooLarge(usize),
    Serialize(String),
    Deserialize(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::Serialize(e) => write!(f, "serialize error: {e}"),
            Self::Deserialize(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Topic names under a shared prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Retained snapshot topic of one game.
    pub fn game_state(&self, game_id: &str) -> String {
        format!("{}/game/{game_id}/state", self.prefix)
    }

    pub fn game_emoji(&self, game_id: &str) -> String {
        format!("{}/game/{game_id}/emoji", self.prefix)
    }

    /// Shared topic where searching peers announce themselves.
    pub fn lobby_join(&self) -> String {
        format!("{}/lobby/join", self.prefix)
    }

    /// Reply topic of one search.
    pub fn lobby_match(&self, lobby_id: &str) -> String {
        format!("{}/lobby/match/{lobby_id}", self.prefix)
    }
}

/// Serialize any wire value to JSON bytes, enforcing the size limit.
pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(value).map_err(|e| ProtocolError::Serialize(e.to_string()))?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Parse JSON bytes into a wire value.
pub fn decode_json<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyPayload);
    }
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    serde_json::from_slice(data).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

pub fn encode_snapshot(snapshot: &GameSnapshot) -> Result<Vec<u8>, ProtocolError> {
    encode_json(snapshot)
}

/// Decode a retained snapshot payload. A tombstone decodes to `None`.
pub fn decode_snapshot(data: &[u8]) -> Result<Option<GameSnapshot>, ProtocolError> {
    if data == TOMBSTONE {
        return Ok(None);
    }
    decode_json(data).map(Some)
}

pub fn encode_lobby_message(msg: &LobbyMessage) -> Result<Vec<u8>, ProtocolError> {
    encode_json(msg)
}

pub fn decode_lobby_message(data: &[u8]) -> Result<LobbyMessage, ProtocolError> {
    decode_json(data)
}

pub fn encode_emoji(event: &EmojiEvent) -> Result<Vec<u8>, ProtocolError> {
    encode_json(event)
}

pub fn decode_emoji(data: &[u8]) -> Result<EmojiEvent, ProtocolError> {
    decode_json(data)
}

use mazerace_core::error::RuleViolation;
use mazerace_core::net::protocol::ProtocolError;

use crate::channel::ChannelError;
use crate::coordinator::SnapshotOutcome;

/// Failures of the online layer. Rule violations are reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A bounded wait expired. Carries the operation name.
    ChannelTimeout(&'static str),
    JoinRejected(String),
    Channel(ChannelError),
    Protocol(ProtocolError),
    NoActiveGame,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChannelTimeout(op) => write!(f, "timed out waiting for {op}"),
            Self::JoinRejected(reason) => write!(f, "cannot join game: {reason}"),
            Self::Channel(e) => write!(f, "channel error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::NoActiveGame => write!(f, "no active game"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<ChannelError> for SyncError {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

impl From<ProtocolError> for SyncError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// Why a local action produced nothing to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalActionError {
    /// The rules refused the action.
    Rule(RuleViolation),
    /// The engine's result could not replace the current snapshot.
    NotAdopted(SnapshotOutcome),
}

impl std::fmt::Display for LocalActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule(reason) => write!(f, "{reason}"),
            Self::NotAdopted(outcome) => write!(f, "local snapshot not adopted: {outcome:?}"),
        }
    }
}

impl std::error::Error for LocalActionError {}

impl From<RuleViolation> for LocalActionError {
    fn from(e: RuleViolation) -> Self {
        Self::Rule(e)
    }
}

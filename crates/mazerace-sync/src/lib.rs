//! Peer-to-peer state sync for online Maze Race matches.
//!
//! Two clients share one canonical [`GameSnapshot`](mazerace_core::snapshot::GameSnapshot)
//! over a retain-latest pub/sub [`Channel`]. There is no authority: every
//! snapshot is ordered by its logical clock and adopted only if newer.

pub mod agent;
pub mod channel;
pub mod coordinator;
pub mod error;
pub mod lobby;
pub mod memory;
pub mod perspective;
pub mod session;

pub use agent::{LocalAgent, MoveSupplier};
pub use channel::{Channel, ChannelError, Publication, PublishOptions, Subscription};
pub use coordinator::{SnapshotOutcome, SyncCoordinator};
pub use error::{LocalActionError, SyncError};
pub use lobby::{Lobby, MatchAssignment};
pub use memory::{MemoryBroker, MemoryClient};
pub use perspective::Perspective;
pub use session::{GameSession, SessionCommand, SessionEnd, SessionEvent, spawn_session};

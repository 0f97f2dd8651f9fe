//! Vertex Consensus - Genesis approval for the VERTEX block DAG.
//!
//! A bootstrap node proposes a candidate block and collects signatures
//! from trusted validators until a threshold is met and the ceremony
//! window has elapsed; the approved block seeds the DAG and regular
//! consensus takes over.

pub mod approval;
pub mod env;
pub mod error;
pub mod last_approved;

pub use approval::{
    approve_candidate, ApprovalConfig, ApproveBlockProtocol, COUNTER_GENESIS,
    TAG_APPROVED_BLOCK, TAG_UNAPPROVED_BLOCK,
};
pub use env::{
    Broadcast, CeremonyEnv, ChannelBroadcast, Clock, CountingMetrics, ManualClock, Metrics,
    NoopBroadcast, NoopMetrics, SystemClock,
};
pub use error::ConsensusError;
pub use last_approved::LastApprovedBlock;

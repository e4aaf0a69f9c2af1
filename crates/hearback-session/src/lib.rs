//! Feedback session coordination for Hearback.
//!
//! A session launches a collection agent, waits for it to exit, reads the
//! result it left in a single-use [`ResultChannel`], copies attachments into
//! session-scoped storage with the [`AttachmentIngestor`], and removes the
//! channel. The [`RetentionSweeper`] prunes the transient capture directory
//! independently of any session.

/// Single-use file handoff between agent and coordinator.
pub mod channel;
/// Coordinator configuration and agent command line.
pub mod config;
/// End-to-end session orchestration.
pub mod coordinator;
/// Attachment copy into persistent storage.
pub mod ingest;
/// Transient cache pruning.
pub mod sweep;

pub use channel::{decode_payload, ChannelState, ResultChannel};
pub use config::{AgentCommand, CoordinatorConfig};
pub use coordinator::SessionCoordinator;
pub use ingest::{AttachmentError, AttachmentIngestor};
pub use sweep::{RetentionSweeper, SweepReport, DEFAULT_MAX_AGE};

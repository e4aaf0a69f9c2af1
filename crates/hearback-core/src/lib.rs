//! Core types and error definitions for Hearback.
//!
//! This crate provides the types shared across all Hearback crates: the
//! error taxonomy of a feedback session and the data model exchanged between
//! the coordinator, the collection agent, and the MCP caller.
//!
//! # Main types
//!
//! - [`HearbackError`]: Unified error enum for all Hearback subsystems.
//! - [`HearbackResult`]: Convenience alias for `Result<T, HearbackError>`.
//! - [`AgentFailure`]: Why a collection agent run did not succeed.
//! - [`FeedbackResult`]: The final, persisted output of a session.
//! - [`AttachmentRecord`]: An attachment as reported by the collection agent.
//! - [`PersistedAttachment`]: An attachment after ingestion.
//! - [`ChannelPayload`]: The JSON document a collection agent writes.

/// Collection agent command-line contract.
pub mod contract;
/// Feedback data model.
pub mod feedback;

pub use feedback::{
    AttachmentKind, AttachmentRecord, ChannelPayload, FeedbackResult, PersistedAttachment,
};

use std::time::Duration;

// --- Error types ---

/// Why a collection agent process did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentFailure {
    /// The agent exited with a non-zero status code.
    ExitCode(i32),
    /// The agent was terminated by a signal (no exit code available).
    Signal,
    /// The agent did not exit within the configured timeout and was killed.
    TimedOut(Duration),
}

impl std::fmt::Display for AgentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentFailure::ExitCode(code) => write!(f, "exited with status {code}"),
            AgentFailure::Signal => write!(f, "terminated by signal"),
            AgentFailure::TimedOut(limit) => {
                write!(f, "timed out after {}s and was killed", limit.as_secs())
            }
        }
    }
}

/// Top-level error type for Hearback.
///
/// Only [`HearbackError::Spawn`], [`HearbackError::AgentFailure`] and
/// [`HearbackError::ChannelCorrupt`] are produced by a feedback session on
/// its own; the rest come from the surrounding plumbing.
#[derive(Debug, thiserror::Error)]
pub enum HearbackError {
    /// The collection agent process could not be started.
    #[error("Failed to launch collection agent: {0}")]
    Spawn(String),

    /// The collection agent ran but did not finish successfully.
    #[error("Collection agent failed: {0}")]
    AgentFailure(AgentFailure),

    /// The result channel held bytes that are not a valid feedback document.
    #[error("Result channel is corrupt: {0}")]
    ChannelCorrupt(String),

    /// The result channel could not be created, read or was misused.
    #[error("Channel error: {0}")]
    Channel(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A malformed or unsupported protocol message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`HearbackError`].
pub type HearbackResult<T> = Result<T, HearbackError>;

use hearback_core::{ChannelPayload, HearbackError, HearbackResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a [`ResultChannel`] is in its single-use lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// The file exists and the agent may write to it.
    Created,
    /// The coordinator has read the channel; `fulfilled` is false when the
    /// agent left it absent or empty.
    Consumed {
        /// Whether the agent wrote a document.
        fulfilled: bool,
    },
    /// The file has been removed.
    Deleted,
}

/// A single-use, file-backed handoff slot.
///
/// The coordinator creates the channel before the agent starts, reads it
/// exactly once after the agent exits, and deletes it. Dropping an undeleted
/// channel removes the file as well, so an abandoned session leaves nothing
/// behind.
#[derive(Debug)]
pub struct ResultChannel {
    path: PathBuf,
    state: ChannelState,
}

impl ResultChannel {
    /// Create an empty channel file with a fresh, owner-only name in `dir`,
    /// or in the system temp directory when `dir` is `None`.
    pub fn create(dir: Option<&Path>) -> HearbackResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hearback-").suffix(".json");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| HearbackError::Channel(format!("Failed to create result channel: {e}")))?;

        let (_file, path) = file
            .keep()
            .map_err(|e| HearbackError::Channel(format!("Failed to keep result channel: {e}")))?;

        debug!(path = %path.display(), "Result channel created");
        Ok(Self {
            path,
            state: ChannelState::Created,
        })
    }

    /// Filesystem location handed to the agent.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Agent side: write one feedback document to the channel at `path`.
    pub async fn write(path: &Path, payload: &ChannelPayload) -> HearbackResult<()> {
        let json = serde_json::to_vec(payload)?;
        tokio::fs::write(path, json).await.map_err(|e| {
            HearbackError::Channel(format!(
                "Failed to write result channel '{}': {e}",
                path.display()
            ))
        })
    }

    /// Read the channel. Returns `None` when the agent left the file absent
    /// or blank. A channel can be read only once.
    pub async fn read(&mut self) -> HearbackResult<Option<Vec<u8>>> {
        if self.state != ChannelState::Created {
            return Err(HearbackError::Channel(format!(
                "Result channel '{}' was already consumed",
                self.path.display()
            )));
        }

        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => None,
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                self.state = ChannelState::Consumed { fulfilled: false };
                return Err(HearbackError::Channel(format!(
                    "Failed to read result channel '{}': {e}",
                    self.path.display()
                )));
            }
        };

        self.state = ChannelState::Consumed {
            fulfilled: contents.is_some(),
        };
        Ok(contents)
    }

    /// Remove the channel file. A file that is already gone is not an error.
    pub async fn delete(&mut self) -> HearbackResult<()> {
        if self.state == ChannelState::Deleted {
            return Ok(());
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(HearbackError::Channel(format!(
                    "Failed to delete result channel '{}': {e}",
                    self.path.display()
                )));
            }
        }
        self.state = ChannelState::Deleted;
        debug!(path = %self.path.display(), "Result channel deleted");
        Ok(())
    }
}

impl Drop for ResultChannel {
    fn drop(&mut self) {
        if self.state == ChannelState::Deleted {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Abandoned result channel removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove abandoned result channel"
            ),
        }
    }
}

/// Parse channel bytes into a [`ChannelPayload`].
pub fn decode_payload(bytes: &[u8]) -> HearbackResult<ChannelPayload> {
    serde_json::from_slice(bytes).map_err(|e| HearbackError::ChannelCorrupt(e.to_string()))
}

//! Terminal collection agent for Hearback.
//!
//! Implements the agent side of the session contract: show the prompt and
//! predefined options to a human, gather free text and file attachments,
//! and write one feedback document to the result channel. A dismissed
//! prompt writes nothing.
//!
//! Stdio belongs to the MCP transport of the parent server, so the prompt
//! talks to the controlling terminal directly.

/// Attachment records built from local paths.
pub mod attachment;
/// Line-oriented interactive prompt.
pub mod terminal;

pub use attachment::{build_record, MAX_PREVIEW_BYTES};
pub use terminal::{FeedbackPrompt, RESOLVED_TEXT};

use hearback_core::{ChannelPayload, HearbackError, HearbackResult};
use hearback_session::ResultChannel;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::info;

/// One collection request, as received on the agent command line.
#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    /// Question shown to the human.
    pub prompt: String,
    /// Result channel to fill. Without one the document goes to stdout.
    pub output_file: Option<PathBuf>,
    /// Quick-pick answers, possibly empty.
    pub predefined_options: Vec<String>,
}

/// Open the controlling terminal for reading and writing.
#[cfg(unix)]
pub fn open_terminal() -> io::Result<(File, File)> {
    let input = File::open("/dev/tty")?;
    let output = OpenOptions::new().write(true).open("/dev/tty")?;
    Ok((input, output))
}

/// Open the console for reading and writing.
#[cfg(windows)]
pub fn open_terminal() -> io::Result<(File, File)> {
    let input = File::open("CONIN$")?;
    let output = OpenOptions::new().write(true).open("CONOUT$")?;
    Ok((input, output))
}

/// Run the interactive prompt on the terminal and deliver the result.
///
/// Returns `Ok(false)` when the human dismissed the prompt.
pub async fn collect(request: CollectRequest) -> HearbackResult<bool> {
    let prompt = request.prompt.clone();
    let options = request.predefined_options.clone();

    let payload = tokio::task::spawn_blocking(move || -> io::Result<Option<ChannelPayload>> {
        let (input, output) = open_terminal()?;
        FeedbackPrompt::new(BufReader::new(input), output).run(&prompt, &options)
    })
    .await
    .map_err(|e| HearbackError::Io(io::Error::other(e)))??;

    let Some(payload) = payload else {
        info!("Feedback prompt dismissed");
        return Ok(false);
    };

    deliver(&request, &payload).await?;
    Ok(true)
}

/// Write `payload` to the request's result channel, or print it to stdout
/// when no channel was given.
pub async fn deliver(request: &CollectRequest, payload: &ChannelPayload) -> HearbackResult<()> {
    match &request.output_file {
        Some(path) => {
            ResultChannel::write(path, payload).await?;
            info!(
                path = %path.display(),
                attachments = payload.attachments.len(),
                "Feedback written to result channel"
            );
        }
        None => println!("{}", serde_json::to_string_pretty(payload)?),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearback_session::decode_payload;

    #[tokio::test]
    async fn test_deliver_writes_channel_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.json");
        let request = CollectRequest {
            prompt: "Done?".into(),
            output_file: Some(path.clone()),
            predefined_options: vec![],
        };

        deliver(&request, &ChannelPayload::text("looks good"))
            .await
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let payload = decode_payload(&bytes).unwrap();
        assert_eq!(payload.interactive_feedback, "looks good");
        assert!(payload.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_deliver_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let request = CollectRequest {
            output_file: Some(dir.path().join("gone").join("channel.json")),
            ..Default::default()
        };
        assert!(deliver(&request, &ChannelPayload::text("x")).await.is_err());
    }
}

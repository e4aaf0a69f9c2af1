use crate::channel::{decode_payload, ResultChannel};
use crate::config::CoordinatorConfig;
use crate::ingest::AttachmentIngestor;
use hearback_core::{AgentFailure, FeedbackResult, HearbackError, HearbackResult};
use std::path::Path;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Runs feedback sessions end to end.
///
/// Each call to [`run_session`](Self::run_session) mints its own session id
/// and channel, so one coordinator can be shared (`Arc`) across concurrent
/// callers.
pub struct SessionCoordinator {
    config: CoordinatorConfig,
    ingestor: AttachmentIngestor,
}

impl SessionCoordinator {
    /// Coordinator for the given configuration.
    pub fn new(config: CoordinatorConfig) -> Self {
        let ingestor = AttachmentIngestor::new(&config.attachments_root);
        Self { config, ingestor }
    }

    /// Active configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Ask the human for feedback and wait for the answer.
    ///
    /// A dismissed agent (exit 0, nothing written) yields
    /// [`FeedbackResult::empty`]. The channel file is removed before this
    /// returns, whatever the outcome.
    pub async fn run_session(
        &self,
        prompt: &str,
        predefined_options: Option<&[String]>,
    ) -> HearbackResult<FeedbackResult> {
        let session_id = Uuid::new_v4().simple().to_string();
        let mut channel = ResultChannel::create(self.config.channel_dir.as_deref())?;
        info!(
            session_id = %session_id,
            channel = %channel.path().display(),
            options = predefined_options.map_or(0, <[String]>::len),
            "Feedback session started"
        );

        let outcome = self
            .collect(&session_id, &mut channel, prompt, predefined_options)
            .await;

        if let Err(e) = channel.delete().await {
            warn!(session_id = %session_id, error = %e, "Result channel cleanup failed");
        }

        match &outcome {
            Ok(result) => info!(
                session_id = %session_id,
                text_len = result.text.len(),
                attachments = result.attachments.len(),
                "Feedback session finished"
            ),
            Err(e) => error!(session_id = %session_id, error = %e, "Feedback session failed"),
        }
        outcome
    }

    async fn collect(
        &self,
        session_id: &str,
        channel: &mut ResultChannel,
        prompt: &str,
        predefined_options: Option<&[String]>,
    ) -> HearbackResult<FeedbackResult> {
        self.launch_agent(channel.path(), prompt, predefined_options)
            .await?;

        let Some(bytes) = channel.read().await? else {
            info!(session_id = %session_id, "Agent closed without submitting feedback");
            return Ok(FeedbackResult::empty());
        };

        let payload = decode_payload(&bytes)?;
        let reported = payload.attachments.len();
        let attachments = self.ingestor.ingest(session_id, payload.attachments).await;
        if attachments.len() < reported {
            warn!(
                session_id = %session_id,
                reported,
                kept = attachments.len(),
                "Some attachments could not be persisted"
            );
        }

        Ok(FeedbackResult {
            text: payload.interactive_feedback,
            attachments,
        })
    }

    /// Start the agent and wait for it to exit.
    async fn launch_agent(
        &self,
        channel: &Path,
        prompt: &str,
        predefined_options: Option<&[String]>,
    ) -> HearbackResult<()> {
        let agent = &self.config.agent;
        let mut child = agent
            .command(prompt, channel, predefined_options)
            .spawn()
            .map_err(|e| HearbackError::Spawn(format!("'{}': {e}", agent.program.display())))?;

        let status = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(
                        program = %agent.program.display(),
                        timeout_secs = limit.as_secs(),
                        "Collection agent timed out, killing it"
                    );
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "Failed to kill timed-out collection agent");
                    }
                    return Err(HearbackError::AgentFailure(AgentFailure::TimedOut(limit)));
                }
            },
            None => child.wait().await?,
        };

        if status.success() {
            return Ok(());
        }
        let failure = match status.code() {
            Some(code) => AgentFailure::ExitCode(code),
            None => AgentFailure::Signal,
        };
        Err(HearbackError::AgentFailure(failure))
    }
}

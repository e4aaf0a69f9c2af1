use hearback_core::contract::{join_options, OPTIONS_FLAG, OUTPUT_FILE_FLAG, PROMPT_FLAG};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// The program started for each session, plus any leading arguments that
/// precede the contract flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments placed before `--prompt`.
    pub args: Vec<String>,
}

impl AgentCommand {
    /// An agent invoked with no leading arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Replace the leading arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument vector for one session.
    pub fn session_args(
        &self,
        prompt: &str,
        channel: &Path,
        predefined_options: Option<&[String]>,
    ) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.args.iter().map(OsString::from).collect();
        argv.push(PROMPT_FLAG.into());
        argv.push(prompt.into());
        argv.push(OUTPUT_FILE_FLAG.into());
        argv.push(channel.as_os_str().to_os_string());
        argv.push(OPTIONS_FLAG.into());
        argv.push(join_options(predefined_options).into());
        argv
    }

    /// Build the child process with detached stdio; the hosting process may
    /// be using its own stdio as a protocol transport.
    pub(crate) fn command(
        &self,
        prompt: &str,
        channel: &Path,
        predefined_options: Option<&[String]>,
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.session_args(prompt, channel, predefined_options))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Settings for a [`SessionCoordinator`](crate::SessionCoordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Collection agent to launch.
    pub agent: AgentCommand,
    /// Root under which `attachments/{session_id}/` directories are created.
    pub attachments_root: PathBuf,
    /// Directory for result channels; the system temp dir when `None`.
    pub channel_dir: Option<PathBuf>,
    /// Upper bound on how long to wait for the agent; unbounded when `None`.
    pub timeout: Option<Duration>,
}

impl CoordinatorConfig {
    /// Config with no timeout and channels in the system temp directory.
    pub fn new(agent: AgentCommand, attachments_root: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            attachments_root: attachments_root.into(),
            channel_dir: None,
            timeout: None,
        }
    }

    /// Kill the agent and fail the session after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create result channels in `dir`.
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = Some(dir.into());
        self
    }
}

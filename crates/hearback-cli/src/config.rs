use anyhow::Context;
use hearback_session::{AgentCommand, CoordinatorConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct HearbackConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct AgentConfig {
    /// Collection agent program. Defaults to this executable.
    #[serde(default)]
    pub command: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Unset means wait for the agent indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_attachments_root")]
    pub attachments_root: PathBuf,
    #[serde(default = "default_transient_root")]
    pub transient_root: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default)]
    pub channel_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            attachments_root: default_attachments_root(),
            transient_root: default_transient_root(),
            retention_days: default_retention_days(),
            channel_dir: None,
        }
    }
}

fn default_attachments_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("hearback"))
        .unwrap_or_else(|| PathBuf::from("./hearback-data"))
}
fn default_transient_root() -> PathBuf {
    dirs::home_dir()
        .map(|d| d.join(".feedback_temp"))
        .unwrap_or_else(|| PathBuf::from("./.feedback_temp"))
}
fn default_retention_days() -> u64 {
    7
}

impl HearbackConfig {
    /// Read `path`; a missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file '{}'", path.display()))
            }
        };
        Self::parse(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Retention window; absurdly large values clamp to the maximum.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.storage.retention_days.saturating_mul(24 * 60 * 60))
    }

    /// Build the session coordinator settings. Without a configured command
    /// the agent is this executable's own `collect` subcommand.
    pub fn coordinator_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let agent = match &self.agent.command {
            Some(program) => AgentCommand::new(program).with_args(self.agent.args.iter()),
            None => {
                let exe = std::env::current_exe()
                    .context("Cannot locate the hearback executable")?;
                let args = if self.agent.args.is_empty() {
                    vec!["collect".to_string()]
                } else {
                    self.agent.args.clone()
                };
                AgentCommand::new(exe).with_args(args)
            }
        };

        let mut config = CoordinatorConfig::new(agent, &self.storage.attachments_root);
        if let Some(secs) = self.agent.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.storage.channel_dir {
            config = config.with_channel_dir(dir);
        }
        Ok(config)
    }
}

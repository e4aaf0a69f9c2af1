mod config;

use clap::{Parser, Subcommand};
use config::HearbackConfig;
use hearback_collector::CollectRequest;
use hearback_core::contract::split_options;
use hearback_mcp::{feedback_registry, McpServer};
use hearback_session::{RetentionSweeper, SessionCoordinator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hearback", about = "Hearback: human feedback for AI agents over MCP")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "hearback.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Run one feedback session and print the result
    Ask {
        /// Question shown to the human
        #[arg(allow_hyphen_values = true)]
        message: String,
        /// Predefined option (repeatable)
        #[arg(short, long = "option")]
        options: Vec<String>,
    },
    /// Terminal collection agent, started by the server for each session
    Collect {
        /// Any text, including Markdown lists that start with `-`
        #[arg(long, allow_hyphen_values = true)]
        prompt: String,
        /// Result channel to write; stdout when omitted
        #[arg(long)]
        output_file: Option<PathBuf>,
        /// Options joined with `|||`
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        predefined_options: String,
    },
    /// Prune the transient capture directory
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is the MCP transport in `serve`; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = HearbackConfig::load(&cli.config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            sweep(&config).await;

            let coordinator = Arc::new(SessionCoordinator::new(config.coordinator_config()?));
            let registry = Arc::new(feedback_registry(coordinator));
            info!(tools = registry.tool_count(), "Starting Hearback MCP server on stdio");

            McpServer::new(registry, "hearback", env!("CARGO_PKG_VERSION"))
                .serve(tokio::io::stdin(), tokio::io::stdout())
                .await?;
            info!("MCP client disconnected, shutting down");
        }
        Commands::Ask { message, options } => {
            sweep(&config).await;

            let coordinator = SessionCoordinator::new(config.coordinator_config()?);
            let options = (!options.is_empty()).then_some(options);
            let result = coordinator
                .run_session(&message, options.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Collect {
            prompt,
            output_file,
            predefined_options,
        } => {
            let request = CollectRequest {
                prompt,
                output_file,
                predefined_options: split_options(&predefined_options),
            };
            hearback_collector::collect(request).await?;
        }
        Commands::Sweep => {
            let report = sweep(&config).await;
            println!(
                "Scanned {} file(s), deleted {}, failed {}",
                report.scanned, report.deleted, report.failed
            );
        }
    }

    Ok(())
}

async fn sweep(config: &HearbackConfig) -> hearback_session::SweepReport {
    RetentionSweeper::new(&config.storage.transient_root, config.retention())
        .sweep()
        .await
}

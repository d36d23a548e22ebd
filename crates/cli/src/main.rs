mod config_commands;
mod gateway_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "toolgate", about = "Toolgate: policy-checked MCP tool gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./toolgate.toml and ~/.config/toolgate/).
    #[arg(long, global = true, env = "TOOLGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a batch of tool calls against the configured policies.
    Evaluate {
        /// Agent requesting the calls.
        #[arg(long)]
        agent: String,
        /// JSON file holding an array of tool calls.
        #[arg(long)]
        calls: PathBuf,
        /// Treat the conversation context as untrusted.
        #[arg(long, default_value_t = false)]
        untrusted: bool,
    },
    /// Execute one tool call through its provider.
    Call {
        #[arg(long)]
        agent: String,
        /// JSON file holding a single tool call.
        #[arg(long)]
        call: PathBuf,
        /// Caller's team, used for dynamic team credentials.
        #[arg(long)]
        team: Option<String>,
        /// Overrides `gateway.call_timeout_secs`.
        #[arg(long)]
        timeout: Option<u64>,
        /// Treat the conversation context as untrusted when checking policies.
        #[arg(long, default_value_t = false)]
        untrusted: bool,
    },
    /// Render a response template over provider content.
    Render {
        /// Template file.
        #[arg(long)]
        template: PathBuf,
        /// JSON file holding the content array.
        #[arg(long)]
        content: PathBuf,
    },
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "toolgate starting");

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Evaluate {
            agent,
            calls,
            untrusted,
        } => gateway_commands::evaluate(config_path, &agent, &calls, untrusted).await,
        Commands::Call {
            agent,
            call,
            team,
            timeout,
            untrusted,
        } => gateway_commands::call(config_path, &agent, &call, team, timeout, untrusted).await,
        Commands::Render { template, content } => gateway_commands::render(&template, &content),
        Commands::Check { verbose } => config_commands::check(config_path, verbose),
    }
}

//! `roster`: read player names, levels, and classes off roster screenshots.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{batch, config, engines, process};

/// Extract player rosters from game screenshots
#[derive(Parser)]
#[command(name = "roster", author, version, about, long_about = None)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace); RUST_LOG wins if set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: <config dir>/roster/config.json)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn default_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract players from one screenshot or a saved detections file
    Process(process::ProcessArgs),

    /// Extract players from every screenshot matching a glob
    Batch(batch::BatchArgs),

    /// Show which OCR engines can be loaded
    Engines(engines::EnginesArgs),

    /// Show or edit the configuration file
    Config(config::ConfigArgs),
}

impl Commands {
    async fn run(self, config_path: Option<&str>) -> anyhow::Result<()> {
        match self {
            Commands::Process(args) => process::run(args, config_path).await,
            Commands::Batch(args) => batch::run(args, config_path).await,
            Commands::Engines(args) => engines::run(args, config_path).await,
            Commands::Config(args) => config::run(args).await,
        }
    }
}

/// Logs go to stderr so stdout stays clean for extracted records.
fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.default_directive())?;

    let Cli {
        config, command, ..
    } = cli;
    command.run(config.as_deref()).await
}

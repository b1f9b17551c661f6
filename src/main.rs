pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod processing;
pub mod chart;
pub mod render;
pub mod pipeline;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the clustered map from the workbook (the default)
    Generate {
        /// Optional TOML file overriding the built-in settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Serve the generated map over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Generate { config: None }) {
        Commands::Generate { config } => {
            let app_config = config::AppConfig::resolve(config.as_deref())?;

            let path = pipeline::generate(&app_config)?;

            println!("Map created and saved as '{}'", path.display());
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::resolve(config.as_deref())?;

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(server::start_server(app_config))?;
        }
    }

    Ok(())
}

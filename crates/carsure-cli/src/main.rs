mod analyze;
mod dashboard;
mod parse;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "carsure-cli")]
#[command(about = "Car damage assessment command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Turn a saved model reply into the structured result, offline
    Parse {
        /// Text file holding the reply; `-` reads stdin
        file: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Assess one image with the configured provider and detector
    Analyze {
        image: PathBuf,

        /// Also print the model's raw reply to stderr
        #[arg(long)]
        show_raw: bool,
    },
    /// Aggregate dashboard statistics across stored users
    Dashboard {
        /// Maximum number of users to read
        #[arg(long, default_value_t = 100)]
        max_users: usize,

        /// Number of recent analyses to include
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Database auth token forwarded as `?auth=`
        #[arg(long, env = "FIREBASE_AUTH_TOKEN")]
        auth_token: Option<String>,

        /// Print the full JSON payload instead of a summary
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Parse { file, pretty }) => parse::run_parse(&file, pretty)?,
        Some(Commands::Analyze { image, show_raw }) => {
            let config = carsure_core::load_app_config()?;
            analyze::run_analyze(&config, &image, show_raw).await?;
        }
        Some(Commands::Dashboard {
            max_users,
            limit,
            auth_token,
            json,
        }) => {
            let config = carsure_core::load_app_config()?;
            dashboard::run_dashboard(&config, max_users, limit, auth_token.as_deref(), json)
                .await?;
        }
        None => println!("carsure-cli: run with --help to list commands"),
    }

    Ok(())
}

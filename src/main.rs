use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragchat::app;
use ragchat::config::{Config, ENDPOINT_ENV, FormEncoding};
use ragchat::HttpAnswerService;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(version)]
#[command(about = "Chat with a retrieval-augmented answer service from the terminal", long_about = None)]
struct Cli {
    /// Base URL of the answer service (overrides config and RAGCHAT_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Path to the config file
    #[arg(long, global = true, env = "RAGCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Request body encoding
    #[arg(long, global = true, value_enum)]
    encoding: Option<FormEncoding>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Question text
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RAGCHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so logs go to a file when possible
    let writer = Config::home_dir()
        .and_then(|dir| {
            fs::create_dir_all(&dir).context("Failed to create .ragchat directory")?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("ragchat.log"))
                .context("Failed to open log file")
        })
        .map(|file| BoxMakeWriter::new(Mutex::new(file)))
        .unwrap_or_else(|_| BoxMakeWriter::new(std::io::sink));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(std::env::var(ENDPOINT_ENV).ok(), cli.endpoint);
    if let Some(encoding) = cli.encoding {
        config.encoding = encoding;
    }

    let session = tracing::info_span!("session", id = %uuid::Uuid::new_v4());

    match cli.command {
        None => app::run(config).instrument(session).await,
        Some(Commands::Ask { text }) => {
            let service = HttpAnswerService::new(&config)?;
            let reply = app::ask(&service, &text.join(" ")).instrument(session).await?;
            println!("{}", reply);
            Ok(())
        }
        Some(Commands::Config { save }) => {
            print!("{}", config.to_toml()?);
            if save {
                let path = match cli.config {
                    Some(path) => path,
                    None => Config::default_path()?,
                };
                config.save(&path)?;
                eprintln!("Saved to {}", path.display());
            }
            Ok(())
        }
    }
}

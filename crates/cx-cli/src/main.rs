//! Cindex terminal client
//!
//! Chats with the Cindex backend over its WebSocket endpoint and prints the
//! streamed replies.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cindex::commands::{self, ChatOptions};
use cx_core::config::ClientConfig;
use cx_protocol::Lang;

// Wrapper to implement clap::ValueEnum for Lang
#[derive(Debug, Clone, Copy)]
struct LangArg(Lang);

impl From<LangArg> for Lang {
    fn from(arg: LangArg) -> Self {
        arg.0
    }
}

impl clap::ValueEnum for LangArg {
    fn value_variants<'a>() -> &'a [Self] {
        &[LangArg(Lang::En), LangArg(Lang::Zh)]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.0.as_str()))
    }
}

#[derive(Parser)]
#[command(name = "cindex")]
#[command(author, version, about = "Terminal client for the Cindex conversation backend")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend WebSocket URL (overrides config)
    #[arg(short, long, global = true, env = "CINDEX_URL")]
    url: Option<String>,

    /// Request language (overrides config)
    #[arg(short, long, global = true, value_enum)]
    lang: Option<LangArg>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat {
        /// Queue every request typed while offline instead of only the latest
        #[arg(short, long)]
        keep_queued: bool,
        /// Ask the backend for a greeting on connect
        #[arg(short, long)]
        welcome: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // logs go to stderr so streamed replies on stdout stay readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_deref();

    match &cli.command {
        None => {
            let config = client_config(&cli)?;
            commands::chat_command(config, ChatOptions::default()).await?;
        }

        Some(Commands::Chat {
            keep_queued,
            welcome,
        }) => {
            let config = client_config(&cli)?;
            let options = ChatOptions {
                keep_queued: *keep_queued,
                welcome: *welcome,
            };
            commands::chat_command(config, options).await?;
        }

        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Get { key } => commands::config_get(config_path, key)?,
            ConfigAction::Init { force } => commands::config_init(config_path, *force)?,
            ConfigAction::Path => commands::config_path(config_path),
        },
    }

    Ok(())
}

/// Config file values with command-line overrides applied
fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = commands::load_client_config(cli.config.as_deref())?;

    if let Some(url) = &cli.url {
        config.server_url = url.clone();
    }
    if let Some(lang) = cli.lang {
        config.lang = lang.into();
    }

    tracing::debug!(url = %config.server_url, lang = %config.lang, "Resolved client config");
    Ok(config)
}

//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod character_list;
pub mod chat;
pub mod history;
pub mod key;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::character_list::list_characters;
use crate::cli::chat::run_chat;
use crate::cli::history::run_history;
use crate::cli::key::run_key;
use crate::core::config::data::ConfigKey;
use crate::core::config::Config;

#[derive(Parser)]
#[command(name = "intervistai")]
#[command(about = "Interview historical characters played by Gemini")]
#[command(
    long_about = "IntervistAI lets you interview famous historical characters. Each character \
is played by a Google Gemini model guided by its own instructions, and finished \
interviews can be kept in a local history.\n\n\
Getting started:\n\
  intervistai key set       Store your Gemini API key (from Google AI Studio)\n\
  intervistai characters    List who can be interviewed\n\
  intervistai chat -c 1     Interview the first character\n\n\
Environment Variables:\n\
  RUST_LOG          Log filter for diagnostics (defaults to intervistai=warn)\n\n\
Chat commands:\n\
  /save             End the interview and keep it in the history\n\
  /discard          End the interview without saving\n\
  /quit             End the interview, asking whether to save\n\
  /help             Show chat commands"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Print debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// List the characters available for interviews
    Characters,
    /// Start an interview (default)
    Chat {
        /// Character to interview, by number or name
        #[arg(short = 'c', long, value_name = "CHARACTER")]
        character: Option<String>,
        /// Append the conversation to this file as it happens
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Review archived interviews
    History {
        #[command(subcommand)]
        command: Option<HistoryCommands>,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the current configuration
    Config,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum KeyCommands {
    /// Store an API key, prompting for it when not given
    Set {
        value: Option<String>,
        /// Store the key without checking it against the API
        #[arg(long)]
        skip_verify: bool,
    },
    /// Show the stored key, masked
    Show,
    /// Check the stored key against the API
    Test,
    /// Remove the stored key
    Clear,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum HistoryCommands {
    /// List archived interviews, most recent first (default)
    List,
    /// Print one archived interview
    Show { id: String },
    /// Delete one archived interview
    Delete { id: String },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "intervistai=debug"
    } else {
        "intervistai=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command.unwrap_or(Commands::Chat {
        character: None,
        log: None,
    }) {
        Commands::Key { command } => run_key(command).await,
        Commands::Characters => list_characters(),
        Commands::Chat { character, log } => run_chat(character, log).await,
        Commands::History { command } => run_history(command.unwrap_or(HistoryCommands::List)),
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let config_key = parse_config_key(&key);
            let value = value.join(" ");
            if value.trim().is_empty() {
                config.print_all();
                return Ok(());
            }
            if let Err(message) = config.set_value(config_key, &value) {
                eprintln!("❌ {message}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {} to: {}", config_key.as_str(), value.trim());
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            let config_key = parse_config_key(&key);
            config.unset_value(config_key);
            config.save()?;
            println!("✅ Unset {}", config_key.as_str());
            Ok(())
        }
        Commands::Config => {
            let config = Config::load()?;
            config.print_all();
            Ok(())
        }
    }
}

fn parse_config_key(key: &str) -> ConfigKey {
    match ConfigKey::parse(key) {
        Some(config_key) => config_key,
        None => {
            eprintln!("❌ Unknown config key: {key}");
            let known: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
            eprintln!("Valid keys: {}", known.join(", "));
            std::process::exit(1);
        }
    }
}

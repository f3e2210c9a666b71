use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use murmur_cli::cli::{commands, CliConfig};
use murmur_core::CoreRuntime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Command-line client for the murmur chat backend")]
struct Cli {
    /// Path to JSON config file (backend URL, keys, data dir)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a chat message in the selected conversation
    Chat {
        /// Message text (words are joined with spaces)
        message: Vec<String>,
    },

    /// Manage conversations
    #[command(subcommand)]
    Conversations(ConversationsCommand),

    /// Show or change settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Synthesize speech for a text
    Speak {
        text: String,
        /// Voice name; defaults to the configured voice
        #[arg(long)]
        voice: Option<String>,
        /// Output file for the mp3 audio
        #[arg(long, short = 'o', default_value = "speech.mp3")]
        output: PathBuf,
    },

    /// Run a source file in the execution sandbox
    Run {
        file: PathBuf,
        /// Language, e.g. "python" or "rust"
        #[arg(long, short = 'l')]
        language: String,
    },

    /// Search the web
    Search {
        /// Query terms (joined with spaces)
        query: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConversationsCommand {
    /// List conversations, newest first ('+' separates AND filter terms)
    List {
        #[arg(long, short = 'f')]
        filter: Option<String>,
    },
    /// Create a conversation and select it
    New { title: String },
    /// Show the messages of a conversation
    Show { id: String },
    /// Delete one conversation
    Rm { id: String },
    /// Delete every conversation and message
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the effective settings
    Show,
    /// Change one setting, e.g. `settings set theme dark`
    Set { key: String, value: String },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::resolve(cli.config.as_deref())?;
    let runtime = CoreRuntime::new(config.into_core_config()?)?;

    match cli.command {
        Commands::Chat { message } => commands::chat(&runtime, &message.join(" ")).await,
        Commands::Conversations(command) => match command {
            ConversationsCommand::List { filter } => {
                commands::list_conversations(&runtime, filter.as_deref()).await
            }
            ConversationsCommand::New { title } => {
                commands::new_conversation(&runtime, &title).await
            }
            ConversationsCommand::Show { id } => commands::show_conversation(&runtime, &id).await,
            ConversationsCommand::Rm { id } => commands::remove_conversation(&runtime, &id).await,
            ConversationsCommand::Clear { yes } => {
                commands::clear_conversations(&runtime, yes).await
            }
        },
        Commands::Settings(command) => match command {
            SettingsCommand::Show => commands::show_settings(&runtime).await,
            SettingsCommand::Set { key, value } => {
                commands::set_setting(&runtime, &key, &value).await
            }
        },
        Commands::Speak {
            text,
            voice,
            output,
        } => commands::speak(&runtime, &text, voice.as_deref(), &output).await,
        Commands::Run { file, language } => commands::run_code(&runtime, &file, &language).await,
        Commands::Search { query } => commands::search(&runtime, &query.join(" ")).await,
    }
}

mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "donkey-cli", about = "Donkey Cards flashcard catalog and progress", version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List active languages
    Languages {
        /// Skip the cache and fetch from the remote store
        #[arg(long)]
        refresh: bool,
    },

    /// List the decks of a language
    Decks {
        /// Language name, e.g. EN
        language: String,
        /// Skip the cache and fetch from the remote store
        #[arg(long)]
        refresh: bool,
    },

    /// List the topics of a language
    Topics {
        /// Language name
        language: String,
    },

    /// Refresh languages and every cached language's decks
    Refresh {
        /// Ignore the refresh window
        #[arg(long)]
        force: bool,
    },

    /// Show progress for a deck
    Progress {
        /// Deck id, e.g. EN_Animals
        deck_id: String,
    },

    /// Record an answer for a card
    Answer {
        deck_id: String,
        /// Card id, e.g. EN_Animals_dog
        card_id: String,
        #[arg(long, conflicts_with = "incorrect", required_unless_present = "incorrect")]
        correct: bool,
        #[arg(long)]
        incorrect: bool,
        /// Number of cards in the deck (looked up from the catalog if omitted)
        #[arg(long)]
        total: Option<usize>,
    },

    /// Remember the card index to resume a deck at
    Resume {
        deck_id: String,
        index: usize,
    },

    /// Discard progress for a deck, or for all decks
    Reset {
        #[arg(required_unless_present = "all")]
        deck_id: Option<String>,
        #[arg(long, conflicts_with = "deck_id")]
        all: bool,
    },

    /// List completed decks
    Completed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut app = app::App::new(cli.config)?;

    match cli.command {
        Command::Languages { refresh } => {
            commands::languages::run(&app, refresh, &cli.format).await?;
        }
        Command::Decks { language, refresh } => {
            commands::decks::run(&app, &language, refresh, &cli.format).await?;
        }
        Command::Topics { language } => {
            commands::topics::run(&app, &language, &cli.format).await?;
        }
        Command::Refresh { force } => {
            commands::refresh::run(&app, force, &cli.format).await?;
        }
        Command::Progress { deck_id } => {
            commands::progress::run_show(&mut app, &deck_id, &cli.format)?;
        }
        Command::Answer { deck_id, card_id, correct, incorrect: _, total } => {
            commands::progress::run_answer(&mut app, &deck_id, &card_id, correct, total, &cli.format).await?;
        }
        Command::Resume { deck_id, index } => {
            commands::progress::run_resume(&mut app, &deck_id, index, &cli.format)?;
        }
        Command::Reset { deck_id, all } => {
            commands::progress::run_reset(&mut app, deck_id.as_deref(), all, &cli.format)?;
        }
        Command::Completed => {
            commands::progress::run_completed(&app, &cli.format)?;
        }
    }

    Ok(())
}

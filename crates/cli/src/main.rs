//! Tagtree CLI - tt command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Tagtree - browse documents as a tree of their tags
#[derive(Parser)]
#[command(name = "tt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log build passes (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print the tag tree
    Tree {
        /// JSON array of document records
        #[arg(long)]
        documents: PathBuf,
        /// Settings file (default: tagtree.toml next to the documents)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Tag-info JSON (pins, redirects, marks)
        #[arg(long)]
        tag_info: Option<PathBuf>,
        /// Search string, e.g. "rust -draft | web"
        #[arg(long)]
        search: Option<String>,
        /// Open a folder by tag path; repeatable
        #[arg(long)]
        expand: Vec<String>,
        /// Show item counts on folders
        #[arg(long)]
        counts: bool,
        /// Print folder tags and item paths instead of display labels
        #[arg(long)]
        outline: bool,
    },
    /// Show or edit tree settings
    Config {
        /// Settings file
        #[arg(long, default_value = tagtree_core::CONFIG_FILE_NAME)]
        config: PathBuf,
        /// Print one value
        #[arg(long, conflicts_with = "set")]
        get: Option<String>,
        /// Set a value: --set KEY VALUE
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        set: Option<Vec<String>>,
    },
    /// List or edit pinned tags
    Pins {
        /// Tag-info JSON
        #[arg(long)]
        tag_info: PathBuf,
        #[command(subcommand)]
        action: Option<PinCommands>,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Pin a tag with a sort key
    Add {
        tag: String,
        /// Pins sort by this key among themselves
        #[arg(default_value = "0")]
        key: String,
    },
    /// Remove a pin
    Remove { tag: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tree {
            documents,
            config,
            tag_info,
            search,
            expand,
            counts,
            outline,
        } => {
            cmd::tree::run(cmd::tree::TreeArgs {
                documents,
                config,
                tag_info,
                search,
                expand,
                counts,
                outline,
            })
            .await
        }
        Commands::Config { config, get, set } => match (get, set) {
            (Some(key), _) => cmd::config::run_get(&config, &key),
            (None, Some(pair)) => match pair.as_slice() {
                [key, value] => cmd::config::run_set(&config, key, value),
                _ => anyhow::bail!("--set takes exactly KEY VALUE"),
            },
            (None, None) => cmd::config::run_list(&config),
        },
        Commands::Pins { tag_info, action } => match action {
            None => cmd::pins::run_list(&tag_info),
            Some(PinCommands::Add { tag, key }) => cmd::pins::run_pin(&tag_info, &tag, &key),
            Some(PinCommands::Remove { tag }) => cmd::pins::run_unpin(&tag_info, &tag),
        },
    }
}

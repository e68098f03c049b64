pub mod commands;
pub mod output;

use crate::errors::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "gst")]
#[command(about = "gitstack - manage stacks of dependent git branches")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a branch on top of a parent and track it
    #[command(visible_alias = "b", alias = "branch")]
    New {
        /// Name of the new branch
        name: String,

        /// Parent branch (`.` for the current branch, trunk when omitted)
        parent: Option<String>,
    },

    /// Track the current branch on top of an existing parent
    #[command(visible_alias = "t")]
    Track {
        /// Parent branch (trunk or a tracked branch)
        parent: String,
    },

    /// Stop tracking a branch without deleting it
    Untrack {
        /// Branch to untrack (defaults to the current branch)
        name: Option<String>,
    },

    /// Untrack a branch and delete it from git
    Delete {
        /// Branch to delete
        name: String,
    },

    /// Show the stack as a tree rooted at trunk
    #[command(visible_alias = "p")]
    Print,

    /// Check out the child of the current branch
    #[command(visible_alias = "u")]
    Up,

    /// Check out the parent of the current branch
    #[command(visible_alias = "d")]
    Down,

    /// Rebase every tracked branch onto its parent's current tip
    #[command(visible_alias = "s")]
    Sync,

    /// Resume a sync after resolving its conflict
    Continue,

    /// Abandon a sync suspended on a conflict
    Abort,

    /// Show trunk, current branch and any suspended sync
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Configuration actions
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective value of a key
    Get {
        /// Configuration key (e.g., stack.trunk)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., sync.prune_missing_branches)
        key: String,
        /// Configuration value
        value: String,
        /// Write to the global config instead of the repository's
        #[arg(long)]
        global: bool,
    },

    /// Remove a configuration value
    Unset {
        /// Configuration key
        key: String,
        /// Remove from the global config instead of the repository's
        #[arg(long)]
        global: bool,
    },

    /// List every key with its effective value
    List,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        self.setup_logging();

        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        match self.command {
            Commands::New { name, parent } => commands::branch::new_branch(name, parent),
            Commands::Track { parent } => commands::branch::track(parent),
            Commands::Untrack { name } => commands::branch::untrack(name),
            Commands::Delete { name } => commands::branch::delete(name),
            Commands::Print => commands::print::run(),
            Commands::Up => commands::navigate::up(),
            Commands::Down => commands::navigate::down(),
            Commands::Sync => commands::sync::sync(),
            Commands::Continue => commands::sync::continue_sync(),
            Commands::Abort => commands::sync::abort(),
            Commands::Status => commands::status::run(),
            Commands::Config { action } => commands::config::run(action),
            Commands::Completions { shell } => commands::completions::generate_completions(shell),
        }
    }

    fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr);

        if self.no_color {
            subscriber.with_ansi(false).init();
        } else {
            subscriber.init();
        }
    }
}

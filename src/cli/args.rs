//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Compose sellable combo offerings out of a merchant's category tree
#[derive(Parser, Debug)]
#[command(name = "rscombo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Catalog JSON file (default: from config)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub catalog: Option<PathBuf>,

    /// Combo store directory (default: from config)
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the category tree under a root
    Tree {
        /// Root category id
        root: String,
    },

    /// Show leaves, last-level parents, and orphan groups under a root
    Classify {
        /// Root category id
        root: String,
    },

    /// Compile a composition session file and submit the combo
    Compile {
        /// Session TOML file
        #[arg(long, value_hint = ValueHint::FilePath)]
        session: PathBuf,

        /// Validate and print the document without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a persisted combo document
    Show {
        /// Combo id
        id: String,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

//! Command-line interface for kitchen-timer
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Voice commands for kitchen timers
#[derive(Parser, Debug)]
#[command(name = "kitchen-timer", version, about = "Voice commands for kitchen timers")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: interim phrases, -vv: debug logs, -vvv: trace logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Parse mode override (simple, robust)
    #[arg(long, global = true, value_name = "MODE")]
    pub mode: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse transcripts given on the command line (ranked alternatives, best first)
    Parse {
        /// One or more alternatives of a single utterance
        #[arg(required = true, value_name = "TEXT")]
        text: Vec<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a recorded speech session from a JSON script
    Replay {
        /// Script file: an array of sessions, each an array of engine events
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },

    /// Read typed utterances from stdin, one per line ("|" separates alternatives)
    Listen {
        /// Print one JSON object per event
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Config management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., parser.mode)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., parser.mode)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configuration values (optionally filter by section)
    List {
        /// Section to show (recognition, parser, logging)
        key: Option<String>,
    },

    /// Print a commented configuration template
    Dump,
}

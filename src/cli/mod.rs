//! CLI Module
//!
//! Command-line interface for inspecting sound files through libsndfile.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::sample::SampleKind;

/// NSndfile - inspect sound files through libsndfile
#[derive(Parser, Debug)]
#[command(name = "nsndfile-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the libsndfile shared library
    #[arg(long, global = true, env = "NSNDFILE_LIBRARY")]
    pub library: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the stream description as JSON
    #[command(name = "info")]
    Info {
        /// Sound file to open
        path: PathBuf,
    },

    /// Print normalized per-channel peaks
    #[command(name = "peak")]
    Peak {
        /// Sound file to open
        path: PathBuf,
    },

    /// Print the library version
    #[command(name = "version")]
    Version,

    /// Print the first items of a file
    #[command(name = "dump")]
    Dump {
        /// Sound file to open
        path: PathBuf,

        /// Element type to read as (short, int, float, double)
        #[arg(short, long, default_value = "float")]
        kind: SampleKind,

        /// Number of items to read
        #[arg(short = 'n', long, default_value_t = 16)]
        items: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dump() {
        let cli = Cli::try_parse_from(["nsndfile-cli", "dump", "in.wav", "--kind", "short", "-n", "50"])
            .unwrap();
        match cli.command {
            Commands::Dump { path, kind, items } => {
                assert_eq!(path, PathBuf::from("in.wav"));
                assert_eq!(kind, SampleKind::Int16);
                assert_eq!(items, 50);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["nsndfile-cli", "dump", "in.wav", "--kind", "long"]).is_err());
    }
}

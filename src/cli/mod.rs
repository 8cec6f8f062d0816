//! Command-line interface module
//!
//! This module contains the implementations for the CLI subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod inline;
pub mod show;

#[derive(Parser)]
#[command(name = "stackir")]
#[command(about = "Nest flat stack-machine listings into expression trees")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inline one or more JSON listings and print the nested trees
    Inline {
        /// Input listing files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fold constant subexpressions after inlining
        #[arg(long)]
        fold: bool,

        /// Skip flag and structure verification
        #[arg(long)]
        no_verify: bool,

        /// Print per-function statistics as JSON after the trees
        #[arg(long)]
        stats: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a listing as its flat instruction sequence
    Show {
        /// Input listing file
        input: PathBuf,
    },
}

impl Cli {
    pub fn run(self) -> crate::error::Result<()> {
        match self.command {
            Commands::Inline {
                inputs,
                config,
                fold,
                no_verify,
                stats,
                output,
            } => {
                let args = inline::InlineArgs {
                    inputs,
                    config_path: config,
                    fold,
                    no_verify,
                    stats,
                    output_path: output,
                };
                inline::inline(&args)
            }
            Commands::Show { input } => show::show(&input),
        }
    }
}

/// Common CLI utilities
pub mod utils {
    use crate::error::Result;
    use std::path::Path;

    /// Write output to file or stdout
    pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
        match output_path {
            Some(path) => Ok(std::fs::write(path, content)?),
            None => {
                print!("{}", content);
                Ok(())
            }
        }
    }
}

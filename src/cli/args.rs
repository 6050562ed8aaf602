//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Copy-number reconstruction from inferred event trees and cell attachments
#[derive(Parser, Debug)]
#[command(name = "cntree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Inputs shared by commands that load an inference result
#[derive(clap::Args, Debug, Clone)]
pub struct InferenceArgs {
    /// Corrected counts CSV (chr,start,end,width,candidate_brkp,<cells>)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub counts: PathBuf,

    /// Directory holding inferred_tree and inferred_attachment
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub input: PathBuf,

    /// Append synthetic chromosome-end bins before loading
    #[arg(long, overrides_with = "no_add_chr_ends")]
    pub add_chr_ends: bool,

    /// Do not append chromosome-end bins, even if configured
    #[arg(long, overrides_with = "add_chr_ends")]
    pub no_add_chr_ends: bool,

    /// Width of synthetic chromosome-end bins
    #[arg(long)]
    pub end_bin_length: Option<u64>,

    /// Copy number of bins no event resolves
    #[arg(long)]
    pub neutral_cn: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconstruct the copy-number matrix and dump results
    Reconstruct {
        #[command(flatten)]
        inference: InferenceArgs,

        /// Output directory (default: configured output_dir)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,
    },

    /// Print the inferred tree with genomic coordinates
    Show {
        #[command(flatten)]
        inference: InferenceArgs,

        /// Print tree and attachment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Inference directory with a local .cntree.toml
        #[arg(value_hint = ValueHint::DirPath)]
        input: Option<PathBuf>,
    },

    /// Show config paths
    Path,
}

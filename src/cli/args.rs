//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Classify samples by their mutations and enumerate mutation types
#[derive(Parser, Debug)]
#[command(name = "mutree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Record file and the levels to build a tree over.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Record file (.json array of objects, anything else tab-separated)
    #[arg(value_hint = ValueHint::FilePath)]
    pub records: PathBuf,

    /// Annotation levels, outermost first (default: from config)
    #[arg(short, long, value_delimiter = ',')]
    pub levels: Option<Vec<String>>,
}

/// Options shared by the enumeration commands.
#[derive(Args, Debug, Clone)]
pub struct EnumerateArgs {
    /// Restrict enumeration to this type (JSON set key)
    #[arg(short = 't', long = "type")]
    pub mtype: Option<String>,

    /// Levels to enumerate over (default: every level of the tree)
    #[arg(long, value_delimiter = ',')]
    pub sub_levels: Option<Vec<String>>,

    /// Minimum number of samples per type (default: from config)
    #[arg(short, long)]
    pub min_size: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the mutation tree
    Tree {
        #[command(flatten)]
        tree: TreeArgs,

        /// Draw the tree with box characters
        #[arg(long)]
        graph: bool,
    },

    /// List samples carrying a mutation type
    Samples {
        #[command(flatten)]
        tree: TreeArgs,

        /// Mutation type as JSON set key (default: any mutation)
        #[arg(short = 't', long = "type")]
        mtype: Option<String>,
    },

    /// Show the mutation status of every sample
    Status {
        #[command(flatten)]
        tree: TreeArgs,

        /// Mutation type as JSON set key (default: any mutation)
        #[arg(short = 't', long = "type")]
        mtype: Option<String>,
    },

    /// Sample overlap of two mutation types
    Overlap {
        #[command(flatten)]
        tree: TreeArgs,

        /// First mutation type (JSON set key)
        first: String,

        /// Second mutation type (JSON set key)
        second: String,
    },

    /// Enumerate single-branch subtypes
    Subtypes {
        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        enumerate: EnumerateArgs,
    },

    /// Enumerate unions of subtypes
    Combos {
        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        enumerate: EnumerateArgs,

        /// Subset sizes (default: from config)
        #[arg(short, long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,
    },

    /// Enumerate combinations of any size at every level
    Treetypes {
        #[command(flatten)]
        tree: TreeArgs,

        #[command(flatten)]
        enumerate: EnumerateArgs,
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
        /// Directory searched for a local .mutree.toml
        #[arg(value_hint = ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}

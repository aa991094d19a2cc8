//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::{DEFAULT_SHARDS, DEFAULT_WORKERS};

#[derive(Parser)]
#[command(name = "hyperproofs")]
#[command(about = "Hyperproofs - aggregatable vector commitment CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where keys live and how they are sharded on disk.
#[derive(Args, Clone, Debug)]
pub struct KeyArgs {
    /// Directory holding the key files
    #[arg(long, default_value = "keys")]
    pub key_dir: PathBuf,

    /// Number of opening-key shard files
    #[arg(long, default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Maximum number of concurrent shard workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate parameters and keys
    Keygen {
        /// Tree height; vectors have 2^height entries
        #[arg(long)]
        height: u8,

        #[command(flatten)]
        keys: KeyArgs,

        /// Also write the trapdoors (secret) next to the keys
        #[arg(long)]
        with_trapdoors: bool,

        /// Only write the verification key
        #[arg(long)]
        skip_opening_key: bool,
    },

    /// Print a summary of stored keys
    Info {
        /// Height to load
        #[arg(long)]
        height: u8,

        #[command(flatten)]
        keys: KeyArgs,

        /// Check this many random opening-key paths against the verification key
        #[arg(long, default_value = "0")]
        check_paths: usize,

        /// Output file (JSON); stdout if omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Commit to a vector and write openings for selected indices
    Open {
        /// Tree height
        #[arg(long)]
        height: u8,

        #[command(flatten)]
        keys: KeyArgs,

        /// Directory with a stored vector; a random vector is generated if omitted
        #[arg(long)]
        vector_dir: Option<PathBuf>,

        /// Indices to open (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        indices: Vec<u64>,

        /// Output file (JSON)
        #[arg(long, short = 'o', default_value = "bundle.json")]
        output: PathBuf,
    },

    /// Verify an opening bundle
    Verify {
        #[command(flatten)]
        keys: KeyArgs,

        /// Bundle written by `open`
        #[arg(long)]
        bundle: PathBuf,
    },

    /// Run commit, update, verify and aggregate end to end in memory
    Demo {
        /// Tree height
        #[arg(long, default_value = "8")]
        height: u8,

        /// Number of random updates applied in bulk
        #[arg(long, default_value = "32")]
        updates: usize,

        /// Openings per aggregate proof
        #[arg(long, default_value = "16")]
        txn_limit: usize,

        /// Output file (JSON); stdout if omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

//! Command-line interface for Hyperproofs.
//!
//! - [`commands`]: argument definitions (`clap` derive)
//! - `handlers`: what each command does
//! - [`output`]: JSON reports on stdout or in files
//!
//! # Available Commands
//!
//! - `keygen`: generate parameters and keys into a key directory
//! - `info`: summarize stored keys, optionally spot-checking opening-key paths
//! - `open`: commit to a vector and write an opening bundle
//! - `verify`: check an opening bundle against stored keys
//! - `demo`: commit, update, verify and aggregate in memory
//!
//! ```bash
//! cargo run --bin hyperproofs -- keygen --height 12 --key-dir keys
//! cargo run --bin hyperproofs -- open --height 12 --key-dir keys --indices 1,7,4000 -o bundle.json
//! cargo run --bin hyperproofs -- verify --key-dir keys --bundle bundle.json
//! ```

pub mod commands;
mod handlers;
pub mod output;

use clap::Parser;
use commands::Cli;

/// Parses arguments and runs the selected command.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    handlers::execute(cli.command)
}

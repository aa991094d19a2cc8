//! Hyperproofs CLI
//!
//! Usage:
//!   hyperproofs keygen --height <L> [--key-dir <dir>] [--with-trapdoors]
//!   hyperproofs info --height <L> [--key-dir <dir>] [--check-paths <N>]
//!   hyperproofs open --height <L> --indices <i,j,..> [--output <file>]
//!   hyperproofs verify --bundle <file> [--key-dir <dir>]
//!   hyperproofs demo [--height <L>] [--updates <N>] [--txn-limit <T>]

use tracing_subscriber::fmt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    hyperproofs::cli::run()
}

//! JSON input and output for the CLI.

use std::fs;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

/// Writes `data` as pretty JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(data)?)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
    Ok(serde_json::from_str(&data)?)
}

/// Prints a report to stdout, or writes it to `path` and says where it went.
pub fn emit_report<T: Serialize>(
    report: &T,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            write_json(path, report)?;
            println!("✓ Report written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `repokit_core` linkage and print its version.
//! - Validate a connection settings file and print the resulting URI.

use repokit_core::{ConfigError, ConnectionParams, ConnectionSettings};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("repokit_core version={}", repokit_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match load_params(&path) {
        Ok(params) => {
            println!("connection={params}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn load_params(path: &str) -> Result<ConnectionParams, ConfigError> {
    let settings = ConnectionSettings::from_json_file(path)?;
    Ok(ConnectionParams::new(settings)?)
}

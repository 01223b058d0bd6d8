//! Init command - write a configuration file with default settings.

use std::path::Path;

use triptrack::config::ConfigFile;

use crate::error::CliError;

/// Run the init command.
///
/// An existing file is left untouched unless `force` is set.
pub fn run(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save(path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Set backend_url and backend_api_key in [providers] to enable live tracking.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

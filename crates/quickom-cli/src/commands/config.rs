//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::secret;

/// Dump the current configuration to stdout, API key masked.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let mut shown = config.clone();
    if let Some(key) = shown.provider.api_key.as_mut()
        && !secret::is_reference(key)
    {
        *key = "********".to_string();
    }
    println!("# config.toml ({})", path.display());
    println!("{}", shown.to_toml()?);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

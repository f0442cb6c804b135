use anyhow::Result;
use colored::Colorize;

use pricebook::config;

/// Display the current configuration as TOML
pub fn show() -> Result<()> {
    let cfg = config::load_config()?;
    let rendered = toml::to_string_pretty(&cfg)?;

    println!("{}", "Current configuration:".bold());
    println!();
    println!("{}", rendered);
    Ok(())
}

/// Validate the configuration file
pub fn validate() -> Result<()> {
    match config::load_config() {
        Ok(_) => {
            println!("{}", "✓ Configuration is valid".green());
            Ok(())
        }
        Err(e) => {
            println!("{}", format!("✗ Configuration is invalid: {}", e).red());
            Err(e)
        }
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pricebook", version, about = "Sales quoting and pricing engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the pricing server (default)
    Start,

    /// Compute a quote from a line-items JSON file and print it
    Quote {
        /// Path to the line-items JSON file
        file: PathBuf,

        /// Billing cycle: annual or monthly
        #[arg(short = 'y', long, default_value = "annual")]
        cycle: String,
    },

    /// Reconcile an extracted competitor quote JSON file against the price book
    Reconcile {
        /// Path to the extracted line-items JSON file
        file: PathBuf,
    },

    /// Test configuration and price book validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_start() {
        let cli = Cli {
            config: PathBuf::from("config.toml"),
            command: None,
        };

        assert!(matches!(cli.get_command(), Commands::Start));
    }

    #[test]
    fn test_cli_parsing_quote() {
        let args = vec!["pricebook", "quote", "line-items.json", "--cycle", "monthly"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Quote { file, cycle } => {
                assert_eq!(file, PathBuf::from("line-items.json"));
                assert_eq!(cycle, "monthly");
            }
            _ => panic!("Expected Quote command"),
        }
    }

    #[test]
    fn test_cli_parsing_reconcile() {
        let args = vec!["pricebook", "reconcile", "extract.json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Reconcile { file } => {
                assert_eq!(file, PathBuf::from("extract.json"));
            }
            _ => panic!("Expected Reconcile command"),
        }
    }

    #[test]
    fn test_cli_parsing_config_show() {
        let args = vec!["pricebook", "config", "show"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Config { action } => {
                matches!(action, ConfigCommands::Show);
            }
            _ => panic!("Expected Config command"),
        }
    }
}

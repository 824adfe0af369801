use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cost-advisor", version, about = "AWS cost analysis and optimization advisor")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server (default)
    Start,

    /// Test configuration file validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Analyze a monthly bill and print the result as JSON
    Analyze {
        /// Monthly bill in USD
        #[arg(short, long)]
        bill: String,

        /// Declared services, comma separated (e.g. EC2,S3,RDS)
        #[arg(short, long, value_delimiter = ',')]
        services: Vec<String>,

        /// AWS region
        #[arg(short, long)]
        region: Option<String>,

        /// Workload type: web, data, ml, storage, compute
        #[arg(short, long, default_value = "web")]
        workload: String,

        /// Subscription plan: starter, professional, enterprise
        #[arg(short, long, default_value = "starter")]
        plan: String,
    },

    /// Decode a billing file (json, csv, xlsx), analyze it and print the result
    Decode {
        /// Billing file path
        file: PathBuf,

        /// Subscription plan: starter, professional, enterprise
        #[arg(short, long, default_value = "starter")]
        plan: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
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
    fn test_cli_parsing_analyze() {
        let args = vec![
            "cost-advisor",
            "analyze",
            "--bill",
            "1250",
            "--services",
            "EC2,S3,RDS",
            "--workload",
            "compute",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.get_command() {
            Commands::Analyze {
                bill,
                services,
                region,
                workload,
                plan,
            } => {
                assert_eq!(bill, "1250");
                assert_eq!(services, vec!["EC2", "S3", "RDS"]);
                assert!(region.is_none());
                assert_eq!(workload, "compute");
                assert_eq!(plan, "starter");
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parsing_decode_with_global_config() {
        let args = vec!["cost-advisor", "decode", "bill.csv", "--config", "/etc/advisor.toml"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/advisor.toml"));
        match cli.get_command() {
            Commands::Decode { file, plan } => {
                assert_eq!(file, PathBuf::from("bill.csv"));
                assert_eq!(plan, "starter");
            }
            _ => panic!("Expected Decode command"),
        }
    }

    #[test]
    fn test_cli_parsing_config_show() {
        let args = vec!["cost-advisor", "config", "show"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert!(matches!(
            cli.get_command(),
            Commands::Config {
                action: ConfigCommands::Show
            }
        ));
    }

    #[test]
    fn test_analyze_requires_bill() {
        assert!(Cli::try_parse_from(vec!["cost-advisor", "analyze"]).is_err());
    }
}

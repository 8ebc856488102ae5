use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verb the native managers launch the installed service with.
pub const RUN_VERB: &str = "run";

/// Install and control this executable as a native system service
#[derive(Parser, Debug)]
#[command(name = "rustle-service")]
#[command(about = "Install and control this executable as a native system service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ServiceCli {
    #[command(subcommand)]
    pub command: Verb,

    /// Settings file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Register the service; trailing arguments are passed to it on every launch
    Install {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Stop the service if it runs and remove its registration
    Uninstall,

    /// Start the service, installing it with the trailing arguments if needed
    Start {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Stop the service
    Stop,

    /// Restart the service
    Restart,

    /// Report whether the service is running
    Status,

    /// Service entry point; trailing arguments are the ones given at install
    #[command(hide = true)]
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Verb {
    pub fn name(&self) -> &'static str {
        match self {
            Verb::Install { .. } => "install",
            Verb::Uninstall => "uninstall",
            Verb::Start { .. } => "start",
            Verb::Stop => "stop",
            Verb::Restart => "restart",
            Verb::Status => "status",
            Verb::Run { .. } => RUN_VERB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_forwards_trailing_args() {
        let cli = ServiceCli::try_parse_from([
            "rustle-service",
            "install",
            "--port",
            "8080",
            "--log-level=debug",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Verb::Install {
                args: vec![
                    "--port".to_string(),
                    "8080".to_string(),
                    "--log-level=debug".to_string()
                ]
            }
        );
    }

    #[test]
    fn test_global_flags_before_verb() {
        let cli =
            ServiceCli::try_parse_from(["rustle-service", "-v", "--config", "svc.yml", "status"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("svc.yml")));
        assert_eq!(cli.command, Verb::Status);
    }

    #[test]
    fn test_unknown_verb_is_rejected() {
        assert!(ServiceCli::try_parse_from(["rustle-service", "reload"]).is_err());
    }

    #[test]
    fn test_hidden_run_verb_parses() {
        let cli = ServiceCli::try_parse_from(["rustle-service", "run"]).unwrap();
        assert_eq!(cli.command.name(), "run");

        let cli = ServiceCli::try_parse_from(["rustle-service", "run", "--port", "9000"]).unwrap();
        assert_eq!(
            cli.command,
            Verb::Run {
                args: vec!["--port".to_string(), "9000".to_string()]
            }
        );
    }
}

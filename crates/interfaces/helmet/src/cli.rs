use std::net::SocketAddr;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use helmet_config::{DEFAULT_STARTUP_TIMEOUT_SECS, SETTINGS_FILE_ENV};

#[derive(Parser, Debug)]
#[command(name = "helmet", author, version, about = "Run Helmet model system scenarios on Emme")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Settings file to use instead of the one in the user config folder
    #[arg(long, global = true, env = SETTINGS_FILE_ENV)]
    pub settings_file: Option<Utf8PathBuf>,
    #[command(flatten)]
    pub coordinator: CoordinatorArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct CoordinatorArgs {
    /// Seconds each endpoint gets to start and report ready
    #[arg(long, default_value_t = DEFAULT_STARTUP_TIMEOUT_SECS)]
    pub startup_timeout_secs: u64,
    /// Let the worker write to the terminal instead of discarding its output
    #[arg(long)]
    pub show_worker_output: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Operator interface endpoint; started by the coordinator
    #[command(hide = true)]
    Ui {
        #[arg(long)]
        connect: SocketAddr,
    },
    /// Scenario worker endpoint; started by the coordinator
    #[command(hide = true)]
    Worker {
        #[arg(long)]
        connect: SocketAddr,
    },
}

impl Cli {
    /// Global flags the coordinator passes on to the endpoints it starts.
    pub fn endpoint_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.verbose {
            args.push("--verbose".to_string());
        }
        if let Some(path) = &self.settings_file {
            args.push("--settings-file".to_string());
            args.push(path.to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_coordinator() {
        let cli = Cli::try_parse_from(["helmet", "--startup-timeout-secs", "5"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.coordinator.startup_timeout_secs, 5);
    }

    #[test]
    fn endpoint_roles_take_an_address() {
        let cli = Cli::try_parse_from(["helmet", "worker", "--connect", "127.0.0.1:4100"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Worker {
                connect: "127.0.0.1:4100".parse().unwrap()
            })
        );
        assert!(Cli::try_parse_from(["helmet", "ui"]).is_err());
    }

    #[test]
    fn global_flags_are_forwarded_to_endpoints() {
        let cli = Cli::try_parse_from(["helmet", "-v", "--settings-file", "/tmp/h.json"]).unwrap();
        assert_eq!(
            cli.endpoint_args(),
            ["--verbose", "--settings-file", "/tmp/h.json"]
        );
    }
}

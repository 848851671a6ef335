use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::app;

/// Task-scheduling control plane: management server and workers.
#[derive(Parser, Debug)]
#[command(name = "taskgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the management server
    Server(ConfArgs),
    /// Run a worker that registers with the server
    Client(ConfArgs),
}

#[derive(Args, Debug)]
pub struct ConfArgs {
    /// Path to the dotenv-style configuration file
    #[arg(short, long, value_name = "FILE")]
    pub conf: Option<PathBuf>,
}

fn print_usage(subcommand: &str) -> io::Result<()> {
    let mut cmd = Cli::command();
    match cmd.find_subcommand_mut(subcommand) {
        Some(sub) => sub.print_help(),
        None => cmd.print_help(),
    }
}

/// Without `--conf` the subcommand prints its usage and returns without starting.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Server(ConfArgs { conf: None }) => print_usage("server")?,
        Command::Server(ConfArgs { conf: Some(path) }) => app::server::run(&path)
            .await
            .context("server bootstrap failed")?,
        Command::Client(ConfArgs { conf: None }) => print_usage("client")?,
        Command::Client(ConfArgs { conf: Some(path) }) => app::worker::run(&path)
            .await
            .context("worker bootstrap failed")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["taskgate", "server", "-c", "/etc/taskgate.env"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Server(ConfArgs { conf: Some(ref p) }) if p == &PathBuf::from("/etc/taskgate.env")
        ));

        let cli = Cli::try_parse_from(["taskgate", "client"]).unwrap();
        assert!(matches!(cli.command, Command::Client(ConfArgs { conf: None })));
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn missing_conf_does_not_start() {
        let cli = Cli::try_parse_from(["taskgate", "server"]).unwrap();
        assert!(run(cli).await.is_ok());
    }
}

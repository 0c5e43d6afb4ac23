// ABOUTME: Entry point for the hmd CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hmd::error::Result;
use hmd::output::{Output, OutputMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli.command, Output::new(mode)).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: Commands, output: Output) -> Result<()> {
    match command {
        Commands::Init { ssh, project } => {
            commands::init(ssh.ssh_address, project.project, output).await
        }
        Commands::Deploy { dirty } => commands::deploy(dirty, output).await,
        Commands::Stop { ssh, project } => {
            commands::stop(ssh.ssh_address, project.project, output).await
        }
        Commands::Restart { ssh, project } => {
            commands::restart(ssh.ssh_address, project.project, output).await
        }
        Commands::Status {
            follow,
            ssh,
            project,
        } => commands::status(ssh.ssh_address, project.project, follow, output).await,
        Commands::Log {
            lines,
            ssh,
            project,
        } => commands::log(ssh.ssh_address, project.project, lines, output).await,
        Commands::List { ssh } => commands::list(ssh.ssh_address, output).await,
        Commands::Remove { ssh, project } => {
            commands::remove(ssh.ssh_address, project, output).await
        }
        Commands::Pipeline { file } => commands::pipeline(&file).await,
    }
}

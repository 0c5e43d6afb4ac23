// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use hmd::config::{SshAddress, Stages};
use hmd::types::ProjectName;
use std::path::PathBuf;

/// Home deploy tool
///
/// Pushes your project to an SSH server with git and runs its stages there
/// as one detached process. The last stage may launch the application; it
/// keeps running until the next deploy or `hmd stop`.
///
/// Prerequisites: git locally, git and hmd on the server.
#[derive(Parser)]
#[command(name = "hmd")]
#[command(version)]
pub struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the project repository on the server and write hmd.yml
    Init {
        #[command(flatten)]
        ssh: SshOption,
        #[command(flatten)]
        project: ProjectOption,
    },

    /// Push HEAD to the server and run the pipeline
    #[command(visible_alias = "d")]
    Deploy {
        /// Include staged and unstaged changes
        #[arg(long)]
        dirty: bool,
    },

    /// Stop the running pipeline
    Stop {
        #[command(flatten)]
        ssh: SshOption,
        #[command(flatten)]
        project: ProjectOption,
    },

    /// Run the last deployed pipeline again
    Restart {
        #[command(flatten)]
        ssh: SshOption,
        #[command(flatten)]
        project: ProjectOption,
    },

    /// Show pipeline stage status
    #[command(visible_alias = "s")]
    Status {
        /// Keep printing updates
        #[arg(short, long)]
        follow: bool,
        #[command(flatten)]
        ssh: SshOption,
        #[command(flatten)]
        project: ProjectOption,
    },

    /// Stream pipeline output
    #[command(visible_alias = "l")]
    Log {
        /// Number of earlier lines to show
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
        #[command(flatten)]
        ssh: SshOption,
        #[command(flatten)]
        project: ProjectOption,
    },

    /// List projects on the server
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        ssh: SshOption,
    },

    /// Stop the pipeline and delete the project from the server
    Remove {
        #[command(flatten)]
        ssh: SshOption,
        /// Project to remove
        #[arg(short, long)]
        project: ProjectName,
    },

    /// Run stages in the current directory (invoked on the server by deploy)
    #[command(hide = true)]
    Pipeline {
        /// Stage definitions
        #[arg(long, default_value = Stages::FILENAME)]
        file: PathBuf,
    },
}

#[derive(Args)]
pub struct ProjectOption {
    /// Project name, defaults to hmd.yml
    #[arg(short, long)]
    pub project: Option<ProjectName>,
}

#[derive(Args)]
pub struct SshOption {
    /// Server address: [user@]host[:port], host may be an ~/.ssh/config alias
    #[arg(long = "ssh")]
    pub ssh_address: Option<SshAddress>,
}

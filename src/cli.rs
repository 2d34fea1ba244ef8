use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use declarative::IntentFlags;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "debrig")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Idempotent provisioning for Debian hosts",
    long_about = "Registers third-party APT repositories, installs and purges the package \
                  families they provide, and builds interpreters from source. Every run \
                  observes the host first and only changes what differs."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: /etc/debrig/config.toml, then ~/.config/debrig/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a repository profile and install its packages
    Repo {
        /// Profile name (built-in: docker, llvm, postgresql)
        name: String,

        #[command(flatten)]
        intent: IntentArgs,
    },

    /// Build a Python release from source with a compatible compiler
    Python {
        /// Release to build instead of the configured one (e.g. 3.12.8)
        #[arg(long, value_name = "VERSION")]
        release: Option<String>,

        #[command(flatten)]
        intent: IntentArgs,
    },

    /// Report host readiness and the state of every repository profile
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// What to do with the target; with no flag, purge then install
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct IntentArgs {
    /// Only install
    #[arg(long)]
    pub install: bool,

    /// Only purge
    #[arg(long)]
    pub purge: bool,

    /// Purge, then install (the default)
    #[arg(long)]
    pub replace: bool,
}

impl From<IntentArgs> for IntentFlags {
    fn from(args: IntentArgs) -> Self {
        Self {
            install: args.install,
            purge: args.purge,
            replace: args.replace,
        }
    }
}

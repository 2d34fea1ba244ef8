mod cli;
mod commands;
mod config;
mod distro;
mod engine;
mod error;
mod host;
mod paths;
mod progress;
mod resource;
mod runner;
mod schema;
mod targets;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Repo { name, intent } => commands::repo::run(&ctx, &name, intent),
        Command::Python { release, intent } => {
            commands::python::run(&ctx, release.as_deref(), intent)
        }
        Command::Doctor => commands::doctor::run(&ctx),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "debrig", &mut io::stdout());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&e.to_string());
            if let Some(advice) = e.advice() {
                ui::dim(advice);
            }
            log::debug!("Exiting with code {}", e.exit_code());
            ExitCode::from(e.exit_code())
        }
    }
}

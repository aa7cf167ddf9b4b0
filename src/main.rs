mod catalog;
mod cli;
mod commands;
mod config;
mod display;
mod manifest;
mod paths;
mod progress;
mod provider;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, OutputFormat};
use config::ProviderKind;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
    /// `--provider` override
    pub provider: Option<ProviderKind>,
    pub output: OutputFormat,
}

impl Context {
    pub fn json(&self) -> bool {
        self.output == OutputFormat::Json
    }

    /// Whether human-oriented chatter should be printed
    pub fn chatty(&self) -> bool {
        !self.quiet && !self.json()
    }
}

fn main() -> Result<()> {
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
        config_path: cli.config,
        provider: cli.provider,
        output: cli.output,
    };

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::Plan(args) => commands::apply::run(&ctx, &args.into()),
        Command::Validate { manifest } => commands::validate::run(&ctx, &manifest),
        Command::Kinds { command } => commands::kinds::run(&ctx, command),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "converge", &mut io::stdout());
            Ok(())
        }
    }
}

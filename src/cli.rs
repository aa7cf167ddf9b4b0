use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::ProviderKind;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Describe cloud resources, converge them", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/converge/config.toml)
    #[arg(long, global = true, env = "CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend to reconcile against, overriding the config
    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make the resources in a manifest match their declaration
    Apply(ApplyArgs),

    /// Show what apply would change, without changing anything
    Plan(PlanArgs),

    /// Check a manifest against the kind catalog
    Validate {
        /// Manifest file (.toml or .json)
        manifest: String,
    },

    /// Inspect the resource kinds
    Kinds {
        #[command(subcommand)]
        command: Option<KindsCommand>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest file (.toml or .json)
    pub manifest: String,

    /// Preview changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Show full before/after diffs
    #[arg(long)]
    pub diff: bool,

    /// Only these resources: `kind` or `kind.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Parallel reconciliations per wave (default: from config)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Manifest file (.toml or .json)
    pub manifest: String,

    /// Only these resources: `kind` or `kind.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show field-level changes only, without full diffs
    #[arg(long)]
    pub brief: bool,
}

#[derive(Subcommand)]
pub enum KindsCommand {
    /// List known kinds
    List,

    /// Show parameters, bindings and compare rules of a kind
    Show {
        /// Kind name
        kind: String,
    },
}

impl From<PlanArgs> for ApplyArgs {
    fn from(args: PlanArgs) -> Self {
        Self {
            manifest: args.manifest,
            dry_run: true,
            diff: !args.brief,
            target: args.target,
            jobs: None,
            yes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from([
            "converge", "apply", "infra.toml", "--target", "managed_disk", "-j", "2", "-y",
            "--provider", "local",
        ]);
        assert_eq!(cli.provider, Some(ProviderKind::Local));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.manifest, "infra.toml");
        assert_eq!(args.target.as_deref(), Some("managed_disk"));
        assert_eq!(args.jobs, Some(2));
        assert!(args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_plan_is_a_dry_run() {
        let cli = Cli::parse_from(["converge", "plan", "infra.json", "-o", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        let apply = ApplyArgs::from(args);
        assert!(apply.dry_run);
        assert!(apply.diff);
    }
}

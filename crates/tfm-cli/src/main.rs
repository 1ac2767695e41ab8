//! TFM CLI - Command-line interface for the audit lifecycle
//!
//! Provides commands for:
//! - Starting, updating and finalizing audits
//! - Saving drafts and copying audits into drafts
//! - Listing an owner's audits and drafts
//! - Checking store readiness and allocating sequence numbers

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tfm_core::config::{Config, LoggingConfig};
use tfm_core::domain::{AuditError, DomainError};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    audit::{FinalizeCommand, MergeCommand, ShowCommand, StartCommand, SubmitCommand},
    draft::{DraftCommand, SnapshotCommand},
    list::{AuditsCommand, InProgressCommand, ListCommand},
    status::{NextSeqCommand, StatusCommand},
    CommandContext,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(name = "tfm", version, about = "Asset audit lifecycle service")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use alternate database file (overrides store.path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new in-progress audit
    Start(StartCommand),
    /// Save a new draft
    Draft(DraftCommand),
    /// Copy an audit into a new draft
    Snapshot(SnapshotCommand),
    /// Merge answers into an in-progress audit
    Merge(MergeCommand),
    /// Complete an audit and compute its summary
    Finalize(FinalizeCommand),
    /// Store an audit that is already complete
    Submit(SubmitCommand),
    /// Show a single audit or draft
    Show(ShowCommand),
    /// List an owner's records in a given state
    List(ListCommand),
    /// Show an owner's most recent in-progress audit
    InProgress(InProgressCommand),
    /// List every audit
    Audits(AuditsCommand),
    /// Allocate the next sequence number of a scope
    NextSeq(NextSeqCommand),
    /// Show document store status
    Status(StatusCommand),
}

/// Loads the configuration from `--config`, or the default path if present
fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

/// Sets up tracing; `-v` flags raise the configured level and `RUST_LOG` wins over both
fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Exit code for a failed command: 2 for caller errors, 1 otherwise
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AuditError>() {
        Some(AuditError::Validation(_))
        | Some(AuditError::NotFound(_))
        | Some(AuditError::InvalidState(_))
        | Some(AuditError::Duplicate(_)) => 2,
        Some(_) => 1,
        None if err.downcast_ref::<DomainError>().is_some() => 2,
        None => 1,
    }
}

async fn run(cli: Cli, ctx: &CommandContext) -> Result<()> {
    match cli.command {
        Commands::Start(cmd) => cmd.execute(ctx).await,
        Commands::Draft(cmd) => cmd.execute(ctx).await,
        Commands::Snapshot(cmd) => cmd.execute(ctx).await,
        Commands::Merge(cmd) => cmd.execute(ctx).await,
        Commands::Finalize(cmd) => cmd.execute(ctx).await,
        Commands::Submit(cmd) => cmd.execute(ctx).await,
        Commands::Show(cmd) => cmd.execute(ctx).await,
        Commands::List(cmd) => cmd.execute(ctx).await,
        Commands::InProgress(cmd) => cmd.execute(ctx).await,
        Commands::Audits(cmd) => cmd.execute(ctx).await,
        Commands::NextSeq(cmd) => cmd.execute(ctx).await,
        Commands::Status(cmd) => cmd.execute(ctx).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = get_formatter(cli.json);

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::from(1);
        }
    };
    init_tracing(&config.logging, cli.verbose);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CommandContext::new(config, cli.db.clone(), format);

    match run(cli, &ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            match e.downcast_ref::<AuditError>() {
                Some(audit_err) => {
                    formatter.error(&format!("{} [{}]", audit_err, audit_err.kind()))
                }
                None => formatter.error(&format!("{e:#}")),
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tfm",
            "list",
            "--owner",
            "u1",
            "--state",
            "en_progreso",
            "--json",
            "--db",
            "/tmp/a.db",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
        assert!(matches!(cli.command, Commands::List(ref cmd) if cmd.owner_id == "u1"));
    }

    #[test]
    fn test_parses_kebab_case_subcommands() {
        let cli = Cli::try_parse_from(["tfm", "next-seq", "borradores"]).unwrap();
        assert!(matches!(cli.command, Commands::NextSeq(ref cmd) if cmd.scope == "borradores"));

        let cli = Cli::try_parse_from(["tfm", "in-progress", "--owner", "u1"]).unwrap();
        assert!(matches!(cli.command, Commands::InProgress(_)));
    }

    #[test]
    fn test_exit_codes() {
        let caller: anyhow::Error = AuditError::NotFound("x".into()).into();
        assert_eq!(exit_code(&caller), 2);

        let store: anyhow::Error = AuditError::StoreUnavailable("down".into()).into();
        assert_eq!(exit_code(&store), 1);

        let parse: anyhow::Error = DomainError::InvalidId("empty".into()).into();
        assert_eq!(exit_code(&parse), 2);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_invalid_config_file_is_rejected() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"store:\n  max_connections: 0\n").unwrap();
        tmp.flush().unwrap();

        let err = load_config(Some(&tmp.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("store.max_connections"));
    }
}

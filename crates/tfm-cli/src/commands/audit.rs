//! Audit commands - Create, update and complete audits
//!
//! Provides the `tfm start`, `tfm merge`, `tfm finalize`, `tfm submit` and
//! `tfm show` CLI commands.

use std::str::FromStr;

use anyhow::Result;
use clap::Args;
use tfm_core::domain::{OwnerInput, RecordId};

use super::{parse_object, parse_optional_object, CommandContext, OwnerArgs};
use crate::output::{get_formatter, print_record};

/// Start a new in-progress audit
#[derive(Debug, Args)]
pub struct StartCommand {
    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Initial answers as a JSON object (or @file)
    #[arg(long)]
    pub answers: Option<String>,
}

impl StartCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let answers = parse_optional_object("--answers", self.answers.as_deref())?;
        let owner = self.owner.to_input().unwrap_or_default();

        let record = ctx.lifecycle().await?.start_in_progress(owner, answers).await?;
        print_record(&*formatter, ctx.format, "Audit started", &record);
        Ok(())
    }
}

/// Merge answers into an in-progress audit
#[derive(Debug, Args)]
pub struct MergeCommand {
    /// Audit identifier
    pub id: String,

    /// Answers to merge, as a JSON object keyed by category (or @file)
    #[arg(long)]
    pub answers: String,
}

impl MergeCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let id = RecordId::from_str(&self.id)?;
        let answers = parse_object("--answers", &self.answers)?;

        let record = ctx.lifecycle().await?.merge_answers(&id, answers).await?;
        print_record(&*formatter, ctx.format, "Answers merged", &record);
        Ok(())
    }
}

/// Complete an audit and compute its summary
#[derive(Debug, Args)]
pub struct FinalizeCommand {
    /// Audit identifier
    pub id: String,
}

impl FinalizeCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let id = RecordId::from_str(&self.id)?;

        let record = ctx.lifecycle().await?.finalize(&id).await?;
        print_record(&*formatter, ctx.format, "Audit finalized", &record);
        Ok(())
    }
}

/// Store an audit that is already complete
#[derive(Debug, Args)]
pub struct SubmitCommand {
    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Answers as a JSON object (or @file)
    #[arg(long)]
    pub answers: Option<String>,
}

impl SubmitCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let answers = parse_optional_object("--answers", self.answers.as_deref())?;
        let owner: Option<OwnerInput> = self.owner.to_input();

        let record = ctx.lifecycle().await?.submit_completed(owner, answers).await?;
        print_record(&*formatter, ctx.format, "Completed audit stored", &record);
        Ok(())
    }
}

/// Show a single audit or draft
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Audit or draft identifier
    pub id: String,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let id = RecordId::from_str(&self.id)?;

        let record = ctx.lifecycle().await?.get(&id).await?;
        print_record(&*formatter, ctx.format, "Record", &record);
        Ok(())
    }
}

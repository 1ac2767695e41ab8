//! Draft commands - Save drafts and copy audits into drafts

use std::str::FromStr;

use anyhow::Result;
use clap::Args;
use tfm_core::domain::RecordId;

use super::{parse_object, parse_optional_object, CommandContext, OwnerArgs};
use crate::output::{get_formatter, print_record};

/// Save a new draft
#[derive(Debug, Args)]
pub struct DraftCommand {
    #[command(flatten)]
    pub owner: OwnerArgs,

    /// Answers as a JSON object (or @file)
    #[arg(long)]
    pub answers: Option<String>,

    /// Draft metadata as a JSON object (or @file)
    #[arg(long)]
    pub metadata: Option<String>,
}

impl DraftCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let answers = parse_optional_object("--answers", self.answers.as_deref())?;
        let metadata = parse_optional_object("--metadata", self.metadata.as_deref())?;

        let record = ctx
            .lifecycle()
            .await?
            .save_draft(self.owner.to_input(), answers, metadata)
            .await?;
        print_record(&*formatter, ctx.format, "Draft saved", &record);
        Ok(())
    }
}

/// Copy an audit into a new draft, leaving the audit untouched
#[derive(Debug, Args)]
pub struct SnapshotCommand {
    /// Audit identifier
    pub id: String,

    /// Draft metadata as a JSON object (or @file)
    #[arg(long, default_value = "{}")]
    pub metadata: String,
}

impl SnapshotCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let id = RecordId::from_str(&self.id)?;
        let metadata = parse_object("--metadata", &self.metadata)?;

        let record = ctx
            .lifecycle()
            .await?
            .snapshot_to_draft(&id, metadata)
            .await?;
        print_record(&*formatter, ctx.format, "Draft created from audit", &record);
        Ok(())
    }
}

//! Listing commands - Query audits and drafts

use std::str::FromStr;

use anyhow::Result;
use clap::Args;
use tfm_core::domain::{AuditState, OwnerId};

use super::CommandContext;
use crate::output::{get_formatter, print_record, print_records};

/// List an owner's records in a given state, newest first
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Owner (client) identifier
    #[arg(long = "owner")]
    pub owner_id: String,

    /// State to list: en_progreso, borrador or completada
    #[arg(long, default_value = "borrador")]
    pub state: String,
}

impl ListCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let owner = OwnerId::from_str(&self.owner_id)?;
        let state = AuditState::from_str(&self.state)?;

        let records = ctx.lifecycle().await?.list_by_owner(&owner, state).await?;
        tracing::info!(owner_id = %owner, state = %state, count = records.len(), "Listed records");

        print_records(
            &*formatter,
            ctx.format,
            &format!("Records of {owner} in state {state}"),
            &records,
        );
        Ok(())
    }
}

/// Show the owner's most recent in-progress audit
#[derive(Debug, Args)]
pub struct InProgressCommand {
    /// Owner (client) identifier
    #[arg(long = "owner")]
    pub owner_id: String,
}

impl InProgressCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let owner = OwnerId::from_str(&self.owner_id)?;

        match ctx.lifecycle().await?.find_in_progress(&owner).await? {
            Some(record) => print_record(&*formatter, ctx.format, "In-progress audit", &record),
            None if ctx.is_json() => formatter.print_json(&serde_json::Value::Null),
            None => formatter.info(&format!("No in-progress audit for {owner}.")),
        }
        Ok(())
    }
}

/// List every audit, highest sequence first
#[derive(Debug, Args)]
pub struct AuditsCommand {}

impl AuditsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let records = ctx.lifecycle().await?.list_audits().await?;
        print_records(&*formatter, ctx.format, "Audits", &records);
        Ok(())
    }
}

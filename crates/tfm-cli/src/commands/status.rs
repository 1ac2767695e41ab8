//! Status commands - Store readiness and sequence allocation
//!
//! Provides the `tfm status` CLI command which:
//! 1. Checks that the document store is reachable
//! 2. Shows the database path and document counts per collection and state
//!
//! and `tfm next-seq`, which allocates a sequence number from a scope.

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use tfm_core::domain::{AuditState, Collection, SequenceScope};
use tfm_core::ports::{fields, DocumentFilter, IDocumentStore};
use tfm_store::{DatabasePool, SqliteDocumentStore};

use super::CommandContext;
use crate::output::get_formatter;

/// States stored in each collection
fn states_of(collection: Collection) -> &'static [AuditState] {
    match collection {
        Collection::Auditorias => &[AuditState::InProgress, AuditState::Completed],
        Collection::Borradores => &[AuditState::Draft],
    }
}

/// Show store readiness and document counts
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only count this collection (auditorias or borradores)
    #[arg(long)]
    pub collection: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let db_path = ctx.config.store.path.display().to_string();
        let selected: Vec<Collection> = match &self.collection {
            Some(name) => vec![Collection::from_str(name)?],
            None => Collection::ALL.to_vec(),
        };

        // A single attempt: status reports unreachability instead of waiting it out.
        // The failure is printed once, by the caller.
        let pool = DatabasePool::new(&ctx.config.store)
            .await
            .with_context(|| format!("Document store at {db_path} is not ready"))?;
        let store = SqliteDocumentStore::new(pool.pool().clone());
        let ready = store.is_ready().await;

        let mut collections = serde_json::Map::new();
        for collection in selected {
            let mut counts = serde_json::Map::new();
            for state in states_of(collection) {
                let filter = DocumentFilter::new().eq(fields::STATE, state.as_str());
                let count = store
                    .count_documents(collection, &filter)
                    .await
                    .with_context(|| format!("Failed to count {collection}"))?;
                counts.insert(state.as_str().to_string(), count.into());
            }
            collections.insert(collection.as_str().to_string(), counts.into());
        }

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "ready": ready,
                "database": db_path,
                "collections": collections,
            }));
            return Ok(());
        }

        if ready {
            formatter.success("Document store ready");
        } else {
            formatter.warn("Document store opened but not answering queries");
        }
        formatter.info(&format!("Database: {db_path}"));
        for (collection, counts) in &collections {
            formatter.info(&format!("{collection}:"));
            if let Some(counts) = counts.as_object() {
                for (state, count) in counts {
                    formatter.info(&format!("  {state:<12} {count}"));
                }
            }
        }
        Ok(())
    }
}

/// Allocate the next sequence number of a scope
#[derive(Debug, Args)]
pub struct NextSeqCommand {
    /// Counter scope: auditorias or borradores
    pub scope: String,
}

impl NextSeqCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.is_json());
        let scope = SequenceScope::from_str(&self.scope)?;

        let sequence = ctx.lifecycle().await?.next_sequence(scope).await;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "scope": scope.as_str(),
                "sequence": sequence,
            }));
        } else {
            formatter.success(&format!("Next {scope} sequence: {sequence}"));
        }
        Ok(())
    }
}

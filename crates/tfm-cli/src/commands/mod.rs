//! CLI subcommands and the plumbing they share

pub mod audit;
pub mod draft;
pub mod list;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use serde_json::{Map, Value};
use tfm_core::config::Config;
use tfm_core::domain::OwnerInput;
use tfm_core::usecases::AuditLifecycleUseCase;
use tfm_store::{DatabasePool, ReconnectPolicy, SqliteDocumentStore};

use crate::output::OutputFormat;

/// Settings every subcommand runs with
pub struct CommandContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Applies the `--db` override on top of the loaded configuration
    pub fn new(mut config: Config, db: Option<PathBuf>, format: OutputFormat) -> Self {
        if let Some(path) = db {
            config.store.path = path;
        }
        Self { config, format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Opens the database, retrying per the `connection` section
    pub async fn open_pool(&self) -> Result<DatabasePool> {
        let policy = ReconnectPolicy::from(&self.config.connection);
        let store_config = &self.config.store;

        policy
            .connect_with_retry(|| DatabasePool::new(store_config))
            .await
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    store_config.path.display()
                )
            })
    }

    /// Builds the lifecycle use case over the configured SQLite store
    pub async fn lifecycle(&self) -> Result<AuditLifecycleUseCase> {
        let pool = self.open_pool().await?;
        let store = Arc::new(SqliteDocumentStore::new(pool.pool().clone()));
        Ok(AuditLifecycleUseCase::new(store))
    }
}

/// Owner fields accepted by the creating subcommands
#[derive(Debug, Clone, Args)]
pub struct OwnerArgs {
    /// Owner (client) identifier
    #[arg(long = "owner")]
    pub owner_id: Option<String>,

    /// Owner display name
    #[arg(long)]
    pub name: Option<String>,

    /// Owner e-mail
    #[arg(long)]
    pub email: Option<String>,

    /// Owner organization
    #[arg(long)]
    pub organization: Option<String>,
}

impl OwnerArgs {
    /// Returns `None` when no owner field was given
    pub fn to_input(&self) -> Option<OwnerInput> {
        if self.owner_id.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.organization.is_none()
        {
            return None;
        }
        Some(OwnerInput {
            id: self.owner_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            organization: self.organization.clone(),
        })
    }
}

/// Parses a JSON object given inline or as `@path/to/file.json`
pub fn parse_object(flag: &str, raw: &str) -> Result<Map<String, Value>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {flag} from {path}"))?,
        None => raw.to_string(),
    };

    match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("Invalid JSON in {flag}"))?
    {
        Value::Object(map) => Ok(map),
        other => bail!("{flag} must be a JSON object, got {}", json_kind(&other)),
    }
}

/// Parses an optional JSON object flag
pub fn parse_optional_object(flag: &str, raw: Option<&str>) -> Result<Option<Map<String, Value>>> {
    raw.map(|raw| parse_object(flag, raw)).transpose()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

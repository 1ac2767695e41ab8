//! Audit lifecycle use case
//!
//! Creates, sequences, updates and finalizes audit records. Every operation
//! loads what it needs from the store, applies the domain rules on an
//! [`AuditRecord`] and persists the result; nothing is kept in memory
//! between calls.
//!
//! ## Concurrency
//!
//! Sequence numbers come from the store's atomic counter. Answer merges
//! are read-modify-write without compare-and-swap: two concurrent merges
//! on the same record race and the last write of the merged answers wins.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::{
    Answers, AuditError, AuditRecord, AuditState, Collection, OwnerId, OwnerInput, RecordId,
    SequenceScope,
};
use crate::ports::{fields, Document, DocumentFilter, DuplicateKey, IDocumentStore, Sort};

use super::next_sequence::SequenceGenerator;

/// Result type of every lifecycle operation
pub type AuditResult<T> = Result<T, AuditError>;

/// Use case for the audit draft/in-progress/finalize lifecycle
pub struct AuditLifecycleUseCase {
    store: Arc<dyn IDocumentStore>,
    sequences: SequenceGenerator,
}

impl AuditLifecycleUseCase {
    /// Creates a new AuditLifecycleUseCase over the given store
    ///
    /// # Arguments
    ///
    /// * `store` - Document store holding audits, drafts and counters
    pub fn new(store: Arc<dyn IDocumentStore>) -> Self {
        let sequences = SequenceGenerator::new(Arc::clone(&store));
        Self { store, sequences }
    }

    /// Returns true if the underlying store is reachable
    pub async fn is_ready(&self) -> bool {
        self.store.is_ready().await
    }

    /// Allocates the next sequence number of `scope`
    ///
    /// Falls back to a clock-derived value when the counter is unreachable.
    pub async fn next_sequence(&self, scope: SequenceScope) -> i64 {
        self.sequences.next(scope).await
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Starts a new in-progress audit for `owner`
    ///
    /// # Errors
    ///
    /// * `AuditError::Validation` if `owner.id` is missing
    /// * `AuditError::StoreUnavailable` if the record cannot be persisted
    pub async fn start_in_progress(
        &self,
        owner: OwnerInput,
        initial_answers: Option<Answers>,
    ) -> AuditResult<AuditRecord> {
        let owner = owner.validate()?;
        let sequence = self.sequences.next(SequenceScope::Auditorias).await;

        let record = AuditRecord::new_in_progress(
            sequence,
            owner,
            initial_answers.unwrap_or_default(),
            now(),
        );
        self.insert(Collection::Auditorias, &record).await?;

        info!(
            record_id = %record.id(),
            owner_id = %record.owner().id,
            sequence,
            "Started in-progress audit"
        );
        Ok(record)
    }

    /// Saves a new draft in the `Borradores` collection
    ///
    /// The draft identifier is derived from the creation millisecond and
    /// the owner id; saving twice for the same owner within one
    /// millisecond fails with `AuditError::Duplicate`.
    ///
    /// # Errors
    ///
    /// * `AuditError::Validation` if answers, owner (with id) or metadata are missing
    /// * `AuditError::StoreUnavailable` if the store is not ready
    /// * `AuditError::Duplicate` on identifier collision
    pub async fn save_draft(
        &self,
        owner: Option<OwnerInput>,
        answers: Option<Answers>,
        metadata: Option<Map<String, Value>>,
    ) -> AuditResult<AuditRecord> {
        let (Some(owner), Some(answers), Some(metadata)) = (owner, answers, metadata) else {
            return Err(AuditError::Validation(
                "answers, owner and metadata are required".to_string(),
            ));
        };
        let owner = owner.validate()?;

        if !self.store.is_ready().await {
            return Err(AuditError::StoreUnavailable(
                "no connection to the document store".to_string(),
            ));
        }

        let sequence = self.sequences.next(SequenceScope::Borradores).await;
        let record = AuditRecord::new_draft(sequence, owner, answers, metadata, now());
        self.insert(Collection::Borradores, &record).await?;

        info!(
            record_id = %record.id(),
            owner_id = %record.owner().id,
            sequence,
            "Saved draft"
        );
        Ok(record)
    }

    /// Stores an audit that is completed on arrival
    ///
    /// # Errors
    ///
    /// * `AuditError::Validation` if owner (with id) or answers are missing,
    ///   or if the asset total overflows
    /// * `AuditError::StoreUnavailable` if the record cannot be persisted
    pub async fn submit_completed(
        &self,
        owner: Option<OwnerInput>,
        answers: Option<Answers>,
    ) -> AuditResult<AuditRecord> {
        let (Some(owner), Some(answers)) = (owner, answers) else {
            return Err(AuditError::Validation(
                "answers and owner are required".to_string(),
            ));
        };
        let owner = owner.validate()?;
        let sequence = self.sequences.next(SequenceScope::Auditorias).await;

        let record = AuditRecord::new_completed(sequence, owner, answers, now())?;
        self.insert(Collection::Auditorias, &record).await?;

        info!(
            record_id = %record.id(),
            owner_id = %record.owner().id,
            sequence,
            total_assets = record.summary().map_or(0, |s| s.total_assets),
            "Stored completed audit"
        );
        Ok(record)
    }

    /// Copies an in-progress or completed audit into a new draft
    ///
    /// The source audit is not modified.
    ///
    /// # Errors
    ///
    /// * `AuditError::NotFound` if no audit has `record_id`
    /// * `AuditError::StoreUnavailable` if the store fails
    pub async fn snapshot_to_draft(
        &self,
        record_id: &RecordId,
        metadata: Map<String, Value>,
    ) -> AuditResult<AuditRecord> {
        let source = self.load(Collection::Auditorias, record_id).await?;
        let sequence = self.sequences.next(SequenceScope::Borradores).await;

        let draft = source.to_draft(sequence, metadata, now())?;
        self.insert(Collection::Borradores, &draft).await?;

        info!(
            record_id = %draft.id(),
            source_id = %record_id,
            sequence,
            "Copied audit into draft"
        );
        Ok(draft)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Merges `new_answers` into an existing audit, category by category
    ///
    /// # Errors
    ///
    /// * `AuditError::NotFound` if no audit has `record_id`
    /// * `AuditError::InvalidState` if the audit is completed
    /// * `AuditError::StoreUnavailable` if the store fails
    pub async fn merge_answers(
        &self,
        record_id: &RecordId,
        new_answers: Answers,
    ) -> AuditResult<AuditRecord> {
        let mut record = self.load(Collection::Auditorias, record_id).await?;
        let categories: Vec<String> = new_answers.keys().cloned().collect();

        record.merge_answers(new_answers, now())?;
        self.save_fields(
            &record,
            &[fields::ANSWERS, fields::LAST_MODIFIED],
        )
        .await?;

        info!(
            record_id = %record_id,
            categories = ?categories,
            "Merged answers into audit"
        );
        Ok(record)
    }

    /// Completes an audit and computes its summary
    ///
    /// Finalizing an already completed audit recomputes the summary.
    ///
    /// # Errors
    ///
    /// * `AuditError::NotFound` if no audit has `record_id`
    /// * `AuditError::Validation` if the asset total overflows
    /// * `AuditError::StoreUnavailable` if the store fails
    pub async fn finalize(&self, record_id: &RecordId) -> AuditResult<AuditRecord> {
        let mut record = self.load(Collection::Auditorias, record_id).await?;

        record.finalize(now())?;
        self.save_fields(
            &record,
            &[
                fields::STATE,
                fields::FINALIZED,
                fields::AI_PROCESSED,
                fields::SUMMARY,
                fields::LAST_MODIFIED,
            ],
        )
        .await?;

        info!(
            record_id = %record_id,
            total_assets = record.summary().map_or(0, |s| s.total_assets),
            "Finalized audit"
        );
        Ok(record)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Looks up a record by id, in `Borradores` for draft ids and in
    /// `Auditorias` otherwise
    ///
    /// # Errors
    ///
    /// * `AuditError::NotFound` if the record does not exist
    pub async fn get(&self, record_id: &RecordId) -> AuditResult<AuditRecord> {
        let collection = if record_id.is_draft() {
            Collection::Borradores
        } else {
            Collection::Auditorias
        };
        self.load(collection, record_id).await
    }

    /// Lists the owner's records in `state`, most recently modified first
    ///
    /// Returns an empty list when the owner has none.
    pub async fn list_by_owner(
        &self,
        owner_id: &OwnerId,
        state: AuditState,
    ) -> AuditResult<Vec<AuditRecord>> {
        let collection = Collection::for_state(&state);
        let filter = DocumentFilter::new()
            .eq(fields::OWNER_ID, owner_id.as_str())
            .eq(fields::STATE, state.as_str());

        let documents = self
            .store
            .find(collection, &filter, &recency())
            .await
            .map_err(|e| store_error(e, "Failed to list records by owner"))?;

        debug!(
            owner_id = %owner_id,
            state = %state,
            count = documents.len(),
            "Listed records by owner"
        );
        documents.into_iter().map(from_document).collect()
    }

    /// Returns the owner's most recently modified in-progress audit
    pub async fn find_in_progress(&self, owner_id: &OwnerId) -> AuditResult<Option<AuditRecord>> {
        let filter = DocumentFilter::new()
            .eq(fields::OWNER_ID, owner_id.as_str())
            .eq(fields::STATE, AuditState::InProgress.as_str());

        let document = self
            .store
            .find_one(Collection::Auditorias, &filter, &recency())
            .await
            .map_err(|e| store_error(e, "Failed to look up in-progress audit"))?;

        document.map(from_document).transpose()
    }

    /// Lists every audit, highest sequence first
    pub async fn list_audits(&self) -> AuditResult<Vec<AuditRecord>> {
        let documents = self
            .store
            .find(
                Collection::Auditorias,
                &DocumentFilter::new(),
                &Sort::none().desc(fields::SEQUENCE),
            )
            .await
            .map_err(|e| store_error(e, "Failed to list audits"))?;

        debug!(count = documents.len(), "Listed audits");
        documents.into_iter().map(from_document).collect()
    }

    // ========================================================================
    // Store helpers
    // ========================================================================

    async fn load(&self, collection: Collection, record_id: &RecordId) -> AuditResult<AuditRecord> {
        let document = self
            .store
            .find_one(
                collection,
                &DocumentFilter::by_id(record_id.as_str()),
                &Sort::none(),
            )
            .await
            .map_err(|e| store_error(e, "Failed to load record"))?;

        match document {
            Some(document) => from_document(document),
            None => Err(AuditError::NotFound(format!(
                "{record_id} in {collection}"
            ))),
        }
    }

    async fn insert(&self, collection: Collection, record: &AuditRecord) -> AuditResult<()> {
        let document = to_document(record)?;
        self.store
            .insert(collection, &document)
            .await
            .map_err(|e| store_error(e, "Failed to insert record"))
    }

    /// Writes the listed top-level fields of `record` back to `Auditorias`
    async fn save_fields(&self, record: &AuditRecord, names: &[&str]) -> AuditResult<()> {
        let document = to_document(record)?;
        let patch: Document = names
            .iter()
            .filter_map(|name| {
                document
                    .get(*name)
                    .map(|value| ((*name).to_string(), value.clone()))
            })
            .collect();

        let matched = self
            .store
            .update_one(
                Collection::Auditorias,
                &DocumentFilter::by_id(record.id().as_str()),
                &patch,
            )
            .await
            .map_err(|e| store_error(e, "Failed to update record"))?;

        if matched == 0 {
            return Err(AuditError::NotFound(format!(
                "{} in {}",
                record.id(),
                Collection::Auditorias
            )));
        }
        Ok(())
    }
}

/// Current time at the millisecond precision documents are stored with
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Most recently modified first, ties broken by higher sequence
fn recency() -> Sort {
    Sort::none()
        .desc(fields::LAST_MODIFIED)
        .desc(fields::SEQUENCE)
}

fn to_document(record: &AuditRecord) -> AuditResult<Document> {
    match serde_json::to_value(record) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(AuditError::Serialization(
            "audit record did not serialize to an object".to_string(),
        )),
        Err(e) => Err(AuditError::Serialization(e.to_string())),
    }
}

fn from_document(document: Document) -> AuditResult<AuditRecord> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| AuditError::Serialization(format!("Invalid audit document: {e}")))
}

/// Classifies an adapter error into the lifecycle taxonomy
fn store_error(e: anyhow::Error, context: &str) -> AuditError {
    if let Some(duplicate) = e.downcast_ref::<DuplicateKey>() {
        return AuditError::Duplicate(duplicate.to_string());
    }
    AuditError::StoreUnavailable(format!("{context}: {e:#}"))
}

// ============================================================================
// Tests
// ============================================================================

//! AuditRecord domain entity
//!
//! An audit record collects a client's answers, grouped by asset category,
//! and moves through a small forward-only state machine:
//!
//! ```text
//!   ┌─────────────┐     finalize      ┌─────────────┐
//!   │ en_progreso │ ────────────────► │ completada  │ ──┐ finalize
//!   └─────────────┘                   └─────────────┘ ◄─┘ (idempotent)
//!          │                                 │
//!          │ snapshot                        │ snapshot
//!          ▼                                 ▼
//!   ┌─────────────────────────────────────────────┐
//!   │      borrador  (new record in Borradores)    │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! Documents are stored with the field names the existing clients read
//! (`_id`, `cliente`, `respuestas`, `estado`, `resumen`, ...), so the serde
//! attributes below define the persisted layout.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::DomainError;
use super::newtypes::{OwnerId, RecordId};

/// Answers keyed by category name
pub type Answers = Map<String, Value>;

/// Field inside each category payload that holds the asset count
pub const QUANTITY_FIELD: &str = "cantidad";

// ============================================================================
// AuditState
// ============================================================================

/// Lifecycle state of an audit record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditState {
    /// Answers are still being collected
    #[serde(rename = "en_progreso")]
    InProgress,
    /// Saved copy kept for later editing
    #[serde(rename = "borrador")]
    Draft,
    /// Finalized; summary computed
    #[serde(rename = "completada")]
    Completed,
}

impl AuditState {
    /// Stored name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditState::InProgress => "en_progreso",
            AuditState::Draft => "borrador",
            AuditState::Completed => "completada",
        }
    }

    /// Returns true if answers may still be merged into a record in this state
    pub fn accepts_answers(&self) -> bool {
        !matches!(self, AuditState::Completed)
    }

    /// Returns true if moving from this state to `target` is allowed
    ///
    /// Re-finalizing a completed record is accepted so that finalize stays
    /// idempotent.
    pub fn can_transition_to(&self, target: &AuditState) -> bool {
        matches!(
            (self, target),
            (AuditState::InProgress, AuditState::Completed)
                | (AuditState::Completed, AuditState::Completed)
                | (AuditState::InProgress, AuditState::Draft)
                | (AuditState::Completed, AuditState::Draft)
        )
    }

    fn check_transition(&self, target: &AuditState) -> Result<(), DomainError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(DomainError::InvalidState {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuditState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "en_progreso" => Ok(AuditState::InProgress),
            "borrador" => Ok(AuditState::Draft),
            "completada" => Ok(AuditState::Completed),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown audit state: {other}"
            ))),
        }
    }
}

// ============================================================================
// Owner
// ============================================================================

/// The client that submitted an audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "empresa", default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl Owner {
    /// Creates an owner with only an identifier
    pub fn new(id: OwnerId) -> Self {
        Self {
            id,
            name: None,
            email: None,
            organization: None,
        }
    }
}

/// Unvalidated owner as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "empresa", default)]
    pub organization: Option<String>,
}

impl OwnerInput {
    /// Creates an input carrying only an identifier
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Validates the input, requiring a non-blank `id`
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` when the id is missing or blank
    pub fn validate(self) -> Result<Owner, DomainError> {
        let id = self
            .id
            .ok_or_else(|| DomainError::ValidationFailed("owner.id is required".to_string()))?;
        Ok(Owner {
            id: OwnerId::new(id)?,
            name: self.name,
            email: self.email,
            organization: self.organization,
        })
    }
}

// ============================================================================
// AuditSummary
// ============================================================================

/// Figures derived from the answers when an audit is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Sum of every category's `cantidad` (missing values count as 0)
    #[serde(rename = "totalActivos")]
    pub total_assets: i64,
    /// Category names present in the answers
    #[serde(rename = "categorias")]
    pub categories: Vec<String>,
    /// Completion date in Spanish long form
    #[serde(rename = "fechaFormateada", default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
}

impl AuditSummary {
    /// Computes the summary of a set of answers at a given instant
    ///
    /// Fractional quantities are truncated toward zero.
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if the total does not fit in an `i64`
    pub fn compute(answers: &Answers, at: DateTime<Utc>) -> Result<Self, DomainError> {
        let total_assets = answers
            .iter()
            .try_fold(0i64, |total, (category, payload)| {
                total.checked_add(quantity_of(payload)).ok_or_else(|| {
                    DomainError::ValidationFailed(format!(
                        "total asset count overflows at category {category}"
                    ))
                })
            })?;
        let categories = answers.keys().cloned().collect();

        Ok(Self {
            total_assets,
            categories,
            formatted_date: Some(format_spanish_long(at)),
        })
    }
}

/// Reads the `cantidad` field of a category payload, defaulting to 0
fn quantity_of(payload: &Value) -> i64 {
    match payload.get(QUANTITY_FIELD) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Formats a date like `19 de octubre de 2026, 14:05`
pub fn format_spanish_long(at: DateTime<Utc>) -> String {
    format!(
        "{} de {} de {}, {:02}:{:02}",
        at.day(),
        SPANISH_MONTHS[at.month0() as usize],
        at.year(),
        at.hour(),
        at.minute()
    )
}

// ============================================================================
// Timestamp serialization
// ============================================================================

/// Serde adapter storing timestamps as RFC 3339 with millisecond precision
///
/// A fixed-width format keeps stored timestamps lexically ordered.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Formats a timestamp the way it is stored
    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// AuditRecord
// ============================================================================

/// A single audit, in progress, drafted or completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "_id")]
    id: RecordId,
    /// Position within the record's collection, assigned once at creation
    sequence: i64,
    /// Creation instant in epoch milliseconds
    timestamp: i64,
    #[serde(rename = "cliente")]
    owner: Owner,
    #[serde(rename = "respuestas", default)]
    answers: Answers,
    #[serde(rename = "estado")]
    state: AuditState,
    #[serde(rename = "fechaCreacion", with = "iso_millis")]
    created_at: DateTime<Utc>,
    #[serde(rename = "ultimaModificacion", with = "iso_millis")]
    last_modified_at: DateTime<Utc>,
    #[serde(rename = "resumen", default, skip_serializing_if = "Option::is_none")]
    summary: Option<AuditSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
    #[serde(rename = "finalizado", default)]
    finalized: bool,
    #[serde(rename = "procesadoIA", default)]
    ai_processed: bool,
}

impl AuditRecord {
    fn build(
        id: RecordId,
        sequence: i64,
        owner: Owner,
        answers: Answers,
        state: AuditState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sequence,
            timestamp: now.timestamp_millis(),
            owner,
            answers,
            state,
            created_at: now,
            last_modified_at: now,
            summary: None,
            metadata: None,
            finalized: false,
            ai_processed: false,
        }
    }

    /// Creates a new in-progress audit with a generated identifier
    pub fn new_in_progress(
        sequence: i64,
        owner: Owner,
        answers: Answers,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(
            RecordId::generate(),
            sequence,
            owner,
            answers,
            AuditState::InProgress,
            now,
        )
    }

    /// Creates an audit that is completed from the start
    ///
    /// # Errors
    /// Returns `DomainError::ValidationFailed` if the summary cannot be computed
    pub fn new_completed(
        sequence: i64,
        owner: Owner,
        answers: Answers,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let summary = AuditSummary::compute(&answers, now)?;
        let mut record = Self::build(
            RecordId::generate(),
            sequence,
            owner,
            answers,
            AuditState::Completed,
            now,
        );
        record.finalized = true;
        record.summary = Some(summary);
        Ok(record)
    }

    /// Creates a draft whose identifier derives from `now` and the owner
    ///
    /// The metadata is stamped with the modification time.
    pub fn new_draft(
        sequence: i64,
        owner: Owner,
        answers: Answers,
        metadata: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        let id = RecordId::for_draft(now.timestamp_millis(), &owner.id);
        let mut record = Self::build(id, sequence, owner, answers, AuditState::Draft, now);
        record.set_metadata(metadata, now);
        record
    }

    fn set_metadata(&mut self, mut metadata: Map<String, Value>, now: DateTime<Utc>) {
        metadata.insert(
            "ultimaModificacion".to_string(),
            Value::String(iso_millis::format(&now)),
        );
        self.metadata = Some(metadata);
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Creation instant in epoch milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn state(&self) -> AuditState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> DateTime<Utc> {
        self.last_modified_at
    }

    pub fn summary(&self) -> Option<&AuditSummary> {
        self.summary.as_ref()
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_ai_processed(&self) -> bool {
        self.ai_processed
    }

    /// Refreshes the modification timestamp
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified_at = now;
    }

    /// Overlays `new_answers` onto the existing answers, category by category
    ///
    /// Categories absent from `new_answers` are kept; a category present in
    /// both takes the new payload as a whole.
    ///
    /// # Errors
    /// Returns `DomainError::RecordLocked` if the record is completed
    pub fn merge_answers(
        &mut self,
        new_answers: Answers,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.state.accepts_answers() {
            return Err(DomainError::RecordLocked {
                id: self.id.to_string(),
                state: self.state.to_string(),
            });
        }

        for (category, payload) in new_answers {
            self.answers.insert(category, payload);
        }
        self.touch(now);
        Ok(())
    }

    /// Marks the audit completed and recomputes its summary
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if the record is a draft, or
    /// `DomainError::ValidationFailed` if the summary cannot be computed.
    /// The record is left unchanged on error.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.state.check_transition(&AuditState::Completed)?;
        let summary = AuditSummary::compute(&self.answers, now)?;

        self.state = AuditState::Completed;
        self.finalized = true;
        self.ai_processed = false;
        self.summary = Some(summary);
        self.touch(now);
        Ok(())
    }

    /// Copies this audit into a new draft record
    ///
    /// The source record is left unchanged.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidState` if this record is already a draft
    pub fn to_draft(
        &self,
        sequence: i64,
        metadata: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<AuditRecord, DomainError> {
        self.state.check_transition(&AuditState::Draft)?;

        let mut metadata = metadata;
        metadata
            .entry("origen".to_string())
            .or_insert_with(|| Value::String(self.id.to_string()));

        Ok(Self::new_draft(
            sequence,
            self.owner.clone(),
            self.answers.clone(),
            metadata,
            now,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn owner(id: &str) -> Owner {
        Owner::new(OwnerId::new(id.to_string()).unwrap())
    }

    fn answers(value: Value) -> Answers {
        value.as_object().cloned().unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 14, minute, 0).unwrap()
    }

    #[test]
    fn test_state_serialization_uses_stored_names() {
        assert_eq!(
            serde_json::to_string(&AuditState::InProgress).unwrap(),
            "\"en_progreso\""
        );
        assert_eq!(
            serde_json::to_string(&AuditState::Draft).unwrap(),
            "\"borrador\""
        );
        assert_eq!(
            serde_json::to_string(&AuditState::Completed).unwrap(),
            "\"completada\""
        );
        assert_eq!(
            AuditState::from_str("en-progreso").unwrap(),
            AuditState::InProgress
        );
    }

    #[test]
    fn test_state_transitions_are_forward_only() {
        assert!(AuditState::InProgress.can_transition_to(&AuditState::Completed));
        assert!(AuditState::InProgress.can_transition_to(&AuditState::Draft));
        assert!(AuditState::Completed.can_transition_to(&AuditState::Draft));
        assert!(AuditState::Completed.can_transition_to(&AuditState::Completed));

        assert!(!AuditState::Completed.can_transition_to(&AuditState::InProgress));
        assert!(!AuditState::Draft.can_transition_to(&AuditState::Completed));
        assert!(!AuditState::Draft.can_transition_to(&AuditState::InProgress));
    }

    #[test]
    fn test_owner_input_requires_id() {
        let err = OwnerInput::default().validate().unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));

        let blank = OwnerInput::with_id("  ").validate();
        assert!(blank.is_err());

        let owner = OwnerInput::with_id("u1").validate().unwrap();
        assert_eq!(owner.id.as_str(), "u1");
    }

    #[test]
    fn test_merge_is_shallow_union() {
        let mut record =
            AuditRecord::new_in_progress(1, owner("u1"), answers(json!({"a": 1})), at(0));
        record.merge_answers(answers(json!({"b": 2})), at(1)).unwrap();
        assert_eq!(Value::Object(record.answers().clone()), json!({"a": 1, "b": 2}));

        record
            .merge_answers(answers(json!({"a": {"cantidad": 4}})), at(2))
            .unwrap();
        assert_eq!(
            Value::Object(record.answers().clone()),
            json!({"a": {"cantidad": 4}, "b": 2})
        );
        assert_eq!(record.last_modified_at(), at(2));
        assert_eq!(record.created_at(), at(0));
    }

    #[test]
    fn test_merge_rejected_once_completed() {
        let mut record = AuditRecord::new_in_progress(1, owner("u1"), Answers::new(), at(0));
        record.finalize(at(1)).unwrap();

        let err = record
            .merge_answers(answers(json!({"a": 1})), at(2))
            .unwrap_err();
        assert!(matches!(err, DomainError::RecordLocked { .. }));
        assert_eq!(record.last_modified_at(), at(1));
    }

    #[test]
    fn test_finalize_computes_summary() {
        let mut record = AuditRecord::new_in_progress(
            1,
            owner("u1"),
            answers(json!({"cat1": {"cantidad": 3}, "cat2": {"cantidad": 5}})),
            at(0),
        );
        record.finalize(at(5)).unwrap();

        assert_eq!(record.state(), AuditState::Completed);
        assert!(record.is_finalized());
        let summary = record.summary().unwrap();
        assert_eq!(summary.total_assets, 8);
        assert_eq!(summary.categories, vec!["cat1", "cat2"]);
        assert_eq!(
            summary.formatted_date.as_deref(),
            Some("19 de octubre de 2026, 14:05")
        );
    }

    #[test]
    fn test_summary_defaults_missing_quantity_to_zero() {
        let summary = AuditSummary::compute(
            &answers(json!({
                "hardware": {"cantidad": 2},
                "software": {"notas": "sin inventario"},
                "redes": "n/a",
                "personal": {"cantidad": 1.0}
            })),
            at(0),
        )
        .unwrap();
        assert_eq!(summary.total_assets, 3);
        assert_eq!(summary.categories.len(), 4);
    }

    #[test]
    fn test_finalize_rejects_overflowing_total() {
        let mut record = AuditRecord::new_in_progress(
            1,
            owner("u1"),
            answers(json!({"a": {"cantidad": i64::MAX}, "b": {"cantidad": 1}})),
            at(0),
        );

        let err = record.finalize(at(1)).unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert_eq!(record.state(), AuditState::InProgress);
        assert!(record.summary().is_none());
        assert_eq!(record.last_modified_at(), at(0));
    }

    #[test]
    fn test_summary_truncates_fractional_quantities() {
        let summary = AuditSummary::compute(
            &answers(json!({"a": {"cantidad": 2.9}, "b": {"cantidad": -0.5}})),
            at(0),
        )
        .unwrap();
        assert_eq!(summary.total_assets, 2);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut record = AuditRecord::new_in_progress(
            1,
            owner("u1"),
            answers(json!({"cat1": {"cantidad": 2}})),
            at(0),
        );
        record.finalize(at(1)).unwrap();
        record.finalize(at(2)).unwrap();
        assert_eq!(record.state(), AuditState::Completed);
        assert_eq!(record.summary().unwrap().total_assets, 2);
        assert_eq!(record.last_modified_at(), at(2));
    }

    #[test]
    fn test_draft_identifier_and_metadata() {
        let mut metadata = Map::new();
        metadata.insert("version".to_string(), json!("1.0"));
        let record = AuditRecord::new_draft(7, owner("u1"), Answers::new(), metadata, at(3));

        assert_eq!(
            record.id().as_str(),
            format!("BORRADOR_{}_u1", at(3).timestamp_millis())
        );
        assert_eq!(record.state(), AuditState::Draft);
        assert_eq!(record.sequence(), 7);
        let metadata = record.metadata().unwrap();
        assert_eq!(metadata["version"], json!("1.0"));
        assert_eq!(metadata["ultimaModificacion"], json!("2026-10-19T14:03:00.000Z"));
    }

    #[test]
    fn test_to_draft_copies_without_touching_source() {
        let source = AuditRecord::new_in_progress(
            4,
            owner("u1"),
            answers(json!({"cat1": {"cantidad": 1}})),
            at(0),
        );
        let draft = source.to_draft(9, Map::new(), at(1)).unwrap();

        assert_eq!(draft.state(), AuditState::Draft);
        assert_eq!(draft.answers(), source.answers());
        assert_eq!(draft.sequence(), 9);
        assert_eq!(
            draft.metadata().unwrap()["origen"],
            json!(source.id().as_str())
        );
        assert_eq!(source.state(), AuditState::InProgress);

        let err = draft.to_draft(10, Map::new(), at(2)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[test]
    fn test_record_document_layout() {
        let record = AuditRecord::new_completed(
            3,
            owner("u1"),
            answers(json!({"cat1": {"cantidad": 2}})),
            at(0),
        )
        .unwrap();
        let doc = serde_json::to_value(&record).unwrap();

        assert_eq!(doc["_id"], json!(record.id().as_str()));
        assert_eq!(doc["cliente"]["id"], json!("u1"));
        assert_eq!(doc["estado"], json!("completada"));
        assert_eq!(doc["resumen"]["totalActivos"], json!(2));
        assert_eq!(doc["fechaCreacion"], json!("2026-10-19T14:00:00.000Z"));
        assert_eq!(doc["finalizado"], json!(true));
        assert_eq!(doc["procesadoIA"], json!(false));

        let back: AuditRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(back, record);
    }
}

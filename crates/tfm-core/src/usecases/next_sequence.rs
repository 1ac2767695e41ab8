//! Sequence generation use case
//!
//! Hands out per-scope sequence numbers through the store's atomic counter.
//! When the counter cannot be reached the generator fails open and returns
//! a value derived from the wall clock, so record creation keeps working
//! while the counter store is down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::domain::SequenceScope;
use crate::ports::IDocumentStore;

/// Width of the random suffix appended to clock-derived fallback values
///
/// Fallback values are `epoch_ms * FALLBACK_SUFFIX_RANGE + suffix`, so two
/// callers falling back within the same millisecond collide with
/// probability `1 / FALLBACK_SUFFIX_RANGE` instead of always.
pub const FALLBACK_SUFFIX_RANGE: i64 = 1000;

/// Use case for allocating sequence numbers
pub struct SequenceGenerator {
    store: Arc<dyn IDocumentStore>,
}

impl SequenceGenerator {
    /// Creates a new SequenceGenerator over the given store
    pub fn new(store: Arc<dyn IDocumentStore>) -> Self {
        Self { store }
    }

    /// Returns the next sequence number for `scope`
    ///
    /// Never fails: store errors degrade to [`fallback_sequence`]. The
    /// fallback values are far above any counter value, which keeps them
    /// increasing but gives up the uniqueness guarantee of the counter.
    pub async fn next(&self, scope: SequenceScope) -> i64 {
        match self.store.increment_counter(scope).await {
            Ok(value) => {
                tracing::trace!(scope = %scope, sequence = value, "Allocated sequence");
                value
            }
            Err(e) => {
                let value = fallback_sequence(Utc::now());
                let detail = format!("{e:#}");
                tracing::warn!(
                    scope = %scope,
                    error = %detail,
                    fallback = value,
                    "Sequence counter unavailable, using clock-derived fallback"
                );
                value
            }
        }
    }
}

/// Clock-derived sequence value with a random suffix
pub fn fallback_sequence(now: DateTime<Utc>) -> i64 {
    let suffix = rand::thread_rng().gen_range(0..FALLBACK_SUFFIX_RANGE);
    now.timestamp_millis() * FALLBACK_SUFFIX_RANGE + suffix
}

//! In-memory document store used by the use case tests

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Collection, SequenceScope};
use crate::ports::{
    Document, DocumentFilter, DuplicateKey, IDocumentStore, Sort, SortDirection, ID_FIELD,
};

/// Mock store keeping every collection in a `Vec` behind a mutex
pub(crate) struct MemoryDocumentStore {
    collections: Mutex<HashMap<Collection, Vec<Document>>>,
    counters: Mutex<HashMap<SequenceScope, i64>>,
    counters_failing: AtomicBool,
    documents_failing: AtomicBool,
}

impl MemoryDocumentStore {
    pub(crate) fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            counters_failing: AtomicBool::new(false),
            documents_failing: AtomicBool::new(false),
        }
    }

    /// Makes `increment_counter` fail as if the counter store were down
    pub(crate) fn set_counters_failing(&self, failing: bool) {
        self.counters_failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Makes every document operation fail and `is_ready` return false
    pub(crate) fn set_documents_failing(&self, failing: bool) {
        self.documents_failing.store(failing, AtomicOrdering::SeqCst);
    }

    pub(crate) fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// Removes a document behind the use case's back
    pub(crate) fn remove(&self, collection: Collection, id: &str) {
        if let Some(docs) = self.collections.lock().unwrap().get_mut(&collection) {
            docs.retain(|d| d.get(ID_FIELD).and_then(Value::as_str) != Some(id));
        }
    }

    fn check_documents(&self) -> anyhow::Result<()> {
        if self.documents_failing.load(AtomicOrdering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }

    fn select(&self, collection: Collection, filter: &DocumentFilter, sort: &Sort) -> Vec<Document> {
        let guard = self.collections.lock().unwrap();
        let mut docs: Vec<Document> = guard
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| compare(a, b, sort));
        docs
    }
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn matches(doc: &Document, filter: &DocumentFilter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|(path, expected)| lookup(doc, path) == Some(expected))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare(a: &Document, b: &Document, sort: &Sort) -> Ordering {
    for (field, direction) in sort.keys() {
        let ordering = compare_values(lookup(a, field), lookup(b, field));
        let ordering = match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl IDocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: Collection, document: &Document) -> anyhow::Result<()> {
        self.check_documents()?;
        let id = document
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("document has no _id"))?
            .to_string();

        let mut guard = self.collections.lock().unwrap();
        let docs = guard.entry(collection).or_default();
        if docs
            .iter()
            .any(|d| d.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()))
        {
            return Err(DuplicateKey { collection, id }.into());
        }
        docs.push(document.clone());
        Ok(())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Option<Document>> {
        self.check_documents()?;
        Ok(self.select(collection, filter, sort).into_iter().next())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Vec<Document>> {
        self.check_documents()?;
        Ok(self.select(collection, filter, sort))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        patch: &Document,
    ) -> anyhow::Result<u64> {
        self.check_documents()?;
        let mut guard = self.collections.lock().unwrap();
        let Some(doc) = guard
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches(d, filter)))
        else {
            return Ok(0);
        };
        for (field, value) in patch {
            doc.insert(field.clone(), value.clone());
        }
        Ok(1)
    }

    async fn count_documents(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> anyhow::Result<u64> {
        self.check_documents()?;
        Ok(self.select(collection, filter, &Sort::none()).len() as u64)
    }

    async fn increment_counter(&self, scope: SequenceScope) -> anyhow::Result<i64> {
        if self.counters_failing.load(AtomicOrdering::SeqCst) {
            return Err(anyhow!("counter store unreachable"));
        }
        let mut guard = self.counters.lock().unwrap();
        let value = guard.entry(scope).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn is_ready(&self) -> bool {
        !self.documents_failing.load(AtomicOrdering::SeqCst)
    }
}

//! SQLite implementation of IDocumentStore
//!
//! Every logical collection lives in the single `documents` table, keyed by
//! `(collection, id)`, with the document body stored as JSON text. Filters
//! and sorts on dotted field paths translate to `json_extract` calls, and
//! patches to `json_set`, so no column layout is tied to the audit schema.
//!
//! ## Type Mapping
//!
//! | Document value | SQL comparison value              |
//! |----------------|-----------------------------------|
//! | string         | TEXT                              |
//! | integer        | INTEGER                           |
//! | float          | REAL                              |
//! | bool           | INTEGER (0 / 1, as `json_extract`) |
//! | null           | `IS NULL`                         |
//!
//! Field paths are validated and always bound as parameters.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, SqlitePool};

use tfm_core::domain::{Collection, SequenceScope};
use tfm_core::ports::{
    validate_field_path, Document, DocumentFilter, DuplicateKey, IDocumentStore, Sort,
    SortDirection, ID_FIELD,
};

use crate::StoreError;

/// SQLite-based implementation of the document store port
///
/// All operations are performed through a connection pool and hold no
/// state between calls.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Query building
// ============================================================================

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
enum SqlValue {
    Text(String),
    Int(i64),
    Real(f64),
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Real(f) => query.bind(f),
        };
    }
    query
}

/// Converts a dotted field path to a SQLite JSON path (`cliente.id` -> `$.cliente.id`)
fn json_path(field: &str) -> Result<String, StoreError> {
    validate_field_path(field).map_err(|e| StoreError::UnsupportedQuery(e.to_string()))?;
    Ok(format!("$.{field}"))
}

/// Appends the filter conditions to `sql` as `AND ...` clauses
fn push_filter(
    sql: &mut String,
    binds: &mut Vec<SqlValue>,
    filter: &DocumentFilter,
) -> Result<(), StoreError> {
    for (field, value) in filter.conditions() {
        if field == ID_FIELD {
            let Value::String(id) = value else {
                return Err(StoreError::UnsupportedQuery(format!(
                    "{ID_FIELD} must be compared to a string"
                )));
            };
            sql.push_str(" AND id = ?");
            binds.push(SqlValue::Text(id.clone()));
            continue;
        }

        let path = json_path(field)?;
        let compared = match value {
            Value::Null => None,
            Value::String(s) => Some(SqlValue::Text(s.clone())),
            Value::Bool(b) => Some(SqlValue::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(SqlValue::Int(i)),
                None => Some(SqlValue::Real(n.as_f64().unwrap_or_default())),
            },
            Value::Array(_) | Value::Object(_) => {
                return Err(StoreError::UnsupportedQuery(format!(
                    "cannot compare '{field}' to a composite value"
                )));
            }
        };

        binds.push(SqlValue::Text(path));
        match compared {
            Some(v) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(v);
            }
            None => sql.push_str(" AND json_extract(body, ?) IS NULL"),
        }
    }
    Ok(())
}

/// Appends an `ORDER BY` clause for `sort`, if any
fn push_sort(sql: &mut String, binds: &mut Vec<SqlValue>, sort: &Sort) -> Result<(), StoreError> {
    let mut keys = Vec::with_capacity(sort.keys().len());
    for (field, direction) in sort.keys() {
        binds.push(SqlValue::Text(json_path(field)?));
        let direction = match direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        keys.push(format!("json_extract(body, ?) {direction}"));
    }
    if !keys.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }
    Ok(())
}

/// Builds the `SELECT body ...` statement for a filtered, sorted read
fn select_sql(
    collection: Collection,
    filter: &DocumentFilter,
    sort: &Sort,
    limit: Option<u32>,
) -> Result<(String, Vec<SqlValue>), StoreError> {
    let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");
    let mut binds = vec![SqlValue::Text(collection.as_str().to_string())];
    push_filter(&mut sql, &mut binds, filter)?;
    push_sort(&mut sql, &mut binds, sort)?;
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok((sql, binds))
}

fn document_from_row(row: &SqliteRow) -> Result<Document, StoreError> {
    let body: String = row.get("body");
    serde_json::from_str(&body)
        .map_err(|e| StoreError::SerializationError(format!("Invalid document JSON: {}", e)))
}

/// Returns true if `e` is a primary key / unique constraint violation
fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ============================================================================
// IDocumentStore implementation
// ============================================================================

#[async_trait]
impl IDocumentStore for SqliteDocumentStore {
    async fn insert(&self, collection: Collection, document: &Document) -> anyhow::Result<()> {
        let id = document
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Document has no string {ID_FIELD} field"))?
            .to_string();
        let body = serde_json::to_string(document)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let result = sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(&body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                tracing::trace!(collection = %collection, id = %id, "Inserted document");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(DuplicateKey { collection, id }.into()),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Option<Document>> {
        let (sql, binds) = select_sql(collection, filter, sort, Some(1))?;
        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?;

        Ok(row.as_ref().map(document_from_row).transpose()?)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        sort: &Sort,
    ) -> anyhow::Result<Vec<Document>> {
        let (sql, binds) = select_sql(collection, filter, sort, None)?;
        let rows = bind_all(sqlx::query(&sql), binds)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            documents.push(document_from_row(row)?);
        }

        tracing::trace!(collection = %collection, count = documents.len(), "Queried documents");
        Ok(documents)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        patch: &Document,
    ) -> anyhow::Result<u64> {
        if patch.is_empty() {
            return Ok(self.count_documents(collection, filter).await?.min(1));
        }

        let mut binds = Vec::with_capacity(patch.len() * 2 + filter.conditions().len() * 2 + 1);
        let mut assignments = Vec::with_capacity(patch.len());
        for (field, value) in patch {
            if field == ID_FIELD || field.contains('.') {
                return Err(StoreError::UnsupportedQuery(format!(
                    "cannot patch field '{field}'"
                ))
                .into());
            }
            binds.push(SqlValue::Text(json_path(field)?));
            binds.push(SqlValue::Text(
                serde_json::to_string(value)
                    .map_err(|e| StoreError::SerializationError(e.to_string()))?,
            ));
            assignments.push("?, json(?)");
        }

        let mut sql = format!(
            "UPDATE documents SET body = json_set(body, {}) WHERE rowid = \
             (SELECT rowid FROM documents WHERE collection = ?",
            assignments.join(", ")
        );
        binds.push(SqlValue::Text(collection.as_str().to_string()));
        push_filter(&mut sql, &mut binds, filter)?;
        sql.push_str(" LIMIT 1)");

        let result = bind_all(sqlx::query(&sql), binds)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        let fields: Vec<&String> = patch.keys().collect();
        tracing::trace!(
            collection = %collection,
            fields = ?fields,
            matched = result.rows_affected(),
            "Updated document"
        );
        Ok(result.rows_affected())
    }

    async fn count_documents(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> anyhow::Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM documents WHERE collection = ?");
        let mut binds = vec![SqlValue::Text(collection.as_str().to_string())];
        push_filter(&mut sql, &mut binds, filter)?;

        let row = bind_all(sqlx::query(&sql), binds)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from)?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn increment_counter(&self, scope: SequenceScope) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "INSERT INTO counters (scope_id, sequence_value) VALUES (?, 1) \
             ON CONFLICT(scope_id) DO UPDATE SET sequence_value = sequence_value + 1 \
             RETURNING sequence_value",
        )
        .bind(scope.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        let value: i64 = row.get("sequence_value");
        tracing::trace!(scope = %scope, value, "Incremented counter");
        Ok(value)
    }

    async fn is_ready(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Store readiness check failed");
                false
            }
        }
    }
}

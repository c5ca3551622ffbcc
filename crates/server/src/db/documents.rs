//! JSON document store.
//!
//! Documents are JSON objects keyed by id and tagged with a [`DocumentKind`].
//! Queries select one kind, optionally restricted by "array field contains
//! value" predicates, newest first.

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::RepositoryError;
use crate::models::DocumentKind;

/// Array-valued product fields that can be filtered on.
///
/// Field names only ever come from this enum, never from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayField {
    Categories,
    AgeGroups,
    Seasons,
    Occasions,
}

impl ArrayField {
    /// Key of the field inside the document body.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::AgeGroups => "ageGroups",
            Self::Seasons => "seasons",
            Self::Occasions => "occasions",
        }
    }
}

/// A predicate on a document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    /// The array at `field` contains `value` exactly.
    ArrayContains { field: ArrayField, value: String },
}

impl DocumentFilter {
    /// Whether `body` satisfies this predicate.
    #[must_use]
    pub fn matches(&self, body: &Value) -> bool {
        match self {
            Self::ArrayContains { field, value } => body
                .get(field.as_str())
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(value))),
        }
    }
}

/// Documents of one kind, filtered conjunctively, ordered by creation time
/// descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub kind: DocumentKind,
    pub filters: Vec<DocumentFilter>,
}

impl DocumentQuery {
    #[must_use]
    pub const fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
        }
    }

    /// Add an array-contains restriction.
    #[must_use]
    pub fn array_contains(mut self, field: ArrayField, value: impl Into<String>) -> Self {
        self.filters.push(DocumentFilter::ArrayContains {
            field,
            value: value.into(),
        });
        self
    }
}

/// Lazily produced query results. Polled once; not restartable.
pub type DocumentStream<'a> = BoxStream<'a, Result<Value, RepositoryError>>;

/// Storage for JSON documents.
///
/// Every body must carry an RFC 3339 `createdAt` string, which is what
/// queries sort on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, id: &str, kind: DocumentKind, body: Value)
    -> Result<(), RepositoryError>;

    async fn get(&self, id: &str, kind: DocumentKind) -> Result<Option<Value>, RepositoryError>;

    /// Overwrite the whole body of an existing document.
    ///
    /// Fails with `RepositoryError::NotFound` if there is no such document.
    async fn replace(&self, id: &str, body: Value) -> Result<(), RepositoryError>;

    /// Delete a document. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    fn query(&self, query: DocumentQuery) -> DocumentStream<'_>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Documents in a `PostgreSQL` JSONB table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the listing statement. Every value, including field names, is bound.
fn build_query(query: &DocumentQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT body FROM documents WHERE doc_type = ");
    builder.push_bind(query.kind.as_str());

    for filter in &query.filters {
        match filter {
            DocumentFilter::ArrayContains { field, value } => {
                builder.push(" AND body -> ");
                builder.push_bind(field.as_str());
                builder.push(" ? ");
                builder.push_bind(value.clone());
            }
        }
    }

    builder.push(" ORDER BY created_at DESC, id");
    builder
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(
        &self,
        id: &str,
        kind: DocumentKind,
        body: Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO documents (id, doc_type, body, created_at)
            VALUES ($1, $2, $3, ($3->>'createdAt')::timestamptz)
            ",
        )
        .bind(id)
        .bind(kind.as_str())
        .bind(&body)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(())
    }

    async fn get(&self, id: &str, kind: DocumentKind) -> Result<Option<Value>, RepositoryError> {
        let body = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE id = $1 AND doc_type = $2",
        )
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(body)
    }

    async fn replace(&self, id: &str, body: Value) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE documents SET body = $2 WHERE id = $1")
            .bind(id)
            .bind(&body)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn query(&self, query: DocumentQuery) -> DocumentStream<'_> {
        Box::pin(stream! {
            use futures::TryStreamExt;

            let mut builder = build_query(&query);
            let mut rows = builder.build_query_scalar::<Value>().fetch(&self.pool);

            loop {
                match rows.try_next().await {
                    Ok(Some(body)) => yield Ok(body),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(RepositoryError::Database(e));
                        break;
                    }
                }
            }
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_query_without_filters() {
        let builder = build_query(&DocumentQuery::new(DocumentKind::Product));
        assert_eq!(
            builder.sql(),
            "SELECT body FROM documents WHERE doc_type = $1 ORDER BY created_at DESC, id"
        );
    }

    #[test]
    fn test_filters_are_bound() {
        let query = DocumentQuery::new(DocumentKind::Product)
            .array_contains(ArrayField::Categories, "Boys'; DROP TABLE documents; --")
            .array_contains(ArrayField::Seasons, "Summer");
        let builder = build_query(&query);
        let sql = builder.sql();

        assert!(sql.contains("AND body -> $2 ? $3"));
        assert!(sql.contains("AND body -> $4 ? $5"));
        assert!(!sql.contains("DROP TABLE"));
    }

    #[test]
    fn test_filter_matches() {
        let body = json!({ "categories": ["Boys", "Unisex"], "seasons": [] });
        let boys = DocumentFilter::ArrayContains {
            field: ArrayField::Categories,
            value: "Boys".to_owned(),
        };
        let girls = DocumentFilter::ArrayContains {
            field: ArrayField::Categories,
            value: "Girls".to_owned(),
        };
        let summer = DocumentFilter::ArrayContains {
            field: ArrayField::Seasons,
            value: "Summer".to_owned(),
        };
        let occasion = DocumentFilter::ArrayContains {
            field: ArrayField::Occasions,
            value: "Party".to_owned(),
        };

        assert!(boys.matches(&body));
        assert!(!girls.matches(&body));
        assert!(!summer.matches(&body));
        assert!(!occasion.matches(&body));
    }
}

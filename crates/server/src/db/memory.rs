//! In-memory stores for tests and local development.

use std::collections::HashMap;

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use little_threads_core::{AccessLevel, AccountId, Email};

use super::{AccountStore, DocumentQuery, DocumentStore, DocumentStream, RepositoryError};
use crate::models::{AccountAccess, DocumentKind, LoginRecord, NewAccount};

struct StoredAccount {
    id: AccountId,
    first_name: String,
    last_name: String,
    email: Email,
    phone: Option<String>,
    access_level: AccessLevel,
    active: bool,
    deleted: bool,
    password_hash: String,
    failed_login_count: i32,
    last_login_at: Option<DateTime<Utc>>,
}

/// Accounts held in memory, enforcing the same unique constraints as the
/// `PostgreSQL` schema.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<StoredAccount>>,
}

fn unique_violation(constraint: &str) -> RepositoryError {
    RepositoryError::UniqueViolation {
        constraint: Some(constraint.to_owned()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active flag. Returns `false` if the account does not exist.
    pub async fn set_active(&self, id: AccountId, active: bool) -> bool {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        account.active = active;
        true
    }

    /// Soft-delete an account. Returns `false` if the account does not exist.
    pub async fn soft_delete(&self, id: AccountId) -> bool {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        account.deleted = true;
        true
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_access(&self, id: AccountId) -> Result<Option<AccountAccess>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.id == id && !a.deleted)
            .map(|a| AccountAccess {
                active: a.active,
                access_level: a.access_level,
            }))
    }

    async fn create_account(&self, account: NewAccount) -> Result<AccountId, RepositoryError> {
        let mut accounts = self.accounts.write().await;

        if accounts.iter().any(|a| a.email == account.email) {
            return Err(unique_violation("accounts_email_key"));
        }
        if let Some(phone) = &account.phone
            && accounts.iter().any(|a| a.phone.as_ref() == Some(phone))
        {
            return Err(unique_violation("accounts_phone_key"));
        }

        let id = AccountId::generate();
        accounts.push(StoredAccount {
            id,
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
            phone: account.phone,
            access_level: account.access_level,
            active: true,
            deleted: false,
            password_hash: account.password_hash,
            failed_login_count: 0,
            last_login_at: None,
        });
        Ok(id)
    }

    async fn find_login(&self, email: &Email) -> Result<Option<LoginRecord>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| &a.email == email && !a.deleted)
            .map(|a| LoginRecord {
                id: a.id,
                email: a.email.clone(),
                first_name: a.first_name.clone(),
                last_name: a.last_name.clone(),
                access_level: a.access_level,
                active: a.active,
                password_hash: a.password_hash.clone(),
                failed_login_count: a.failed_login_count,
                last_login_at: a.last_login_at,
            }))
    }

    async fn record_failed_login(&self, id: AccountId) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.iter_mut().find(|a| a.id == id) {
            account.failed_login_count += 1;
        }
        Ok(())
    }

    async fn record_successful_login(
        &self,
        id: AccountId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepositoryError::NotFound)?;

        let recorded = match account.last_login_at {
            Some(previous) if previous >= at => previous + chrono::Duration::microseconds(1),
            _ => at,
        };
        account.failed_login_count = 0;
        account.last_login_at = Some(recorded);
        Ok(recorded)
    }

    async fn promote_to_admin(&self, email: &Email) -> Result<Option<AccountId>, RepositoryError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .iter_mut()
            .find(|a| &a.email == email && !a.deleted)
            .map(|a| {
                a.access_level = AccessLevel::Admin;
                a.active = true;
                a.id
            }))
    }
}

struct StoredDocument {
    kind: DocumentKind,
    body: Value,
    created_at: DateTime<Utc>,
}

/// Documents held in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents of any kind.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn matching(&self, query: &DocumentQuery) -> Vec<Value> {
        let documents = self.documents.read().await;
        let mut hits: Vec<(&String, &StoredDocument)> = documents
            .iter()
            .filter(|(_, doc)| doc.kind == query.kind)
            .filter(|(_, doc)| query.filters.iter().all(|f| f.matches(&doc.body)))
            .collect();

        hits.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| a_id.cmp(b_id))
        });
        hits.into_iter().map(|(_, doc)| doc.body.clone()).collect()
    }
}

fn created_at(body: &Value) -> Result<DateTime<Utc>, RepositoryError> {
    body.get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::DataCorruption("document has no valid createdAt".to_owned()))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(
        &self,
        id: &str,
        kind: DocumentKind,
        body: Value,
    ) -> Result<(), RepositoryError> {
        let created_at = created_at(&body)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(id) {
            return Err(unique_violation("documents_pkey"));
        }
        documents.insert(
            id.to_owned(),
            StoredDocument {
                kind,
                body,
                created_at,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str, kind: DocumentKind) -> Result<Option<Value>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(id)
            .filter(|doc| doc.kind == kind)
            .map(|doc| doc.body.clone()))
    }

    async fn replace(&self, id: &str, body: Value) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        let doc = documents.get_mut(id).ok_or(RepositoryError::NotFound)?;
        doc.body = body;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.documents.write().await.remove(id).is_some())
    }

    fn query(&self, query: DocumentQuery) -> DocumentStream<'_> {
        Box::pin(stream! {
            for body in self.matching(&query).await {
                yield Ok(body);
            }
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;
    use crate::db::ArrayField;

    fn new_account(email: &str, phone: Option<&str>) -> NewAccount {
        NewAccount {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: phone.map(str::to_owned),
            access_level: AccessLevel::Standard,
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_unique_constraints_are_named() {
        let store = MemoryAccountStore::new();
        store
            .create_account(new_account("ada@example.com", Some("555-0100")))
            .await
            .unwrap();

        let email_dup = store
            .create_account(new_account("ADA@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(
            email_dup,
            RepositoryError::UniqueViolation { constraint: Some(ref c), .. } if c == "accounts_email_key"
        ));

        let phone_dup = store
            .create_account(new_account("grace@example.com", Some("555-0100")))
            .await
            .unwrap_err();
        assert!(matches!(
            phone_dup,
            RepositoryError::UniqueViolation { constraint: Some(ref c), .. } if c == "accounts_phone_key"
        ));
    }

    #[tokio::test]
    async fn test_soft_deleted_accounts_are_hidden() {
        let store = MemoryAccountStore::new();
        let id = store
            .create_account(new_account("ada@example.com", None))
            .await
            .unwrap();
        assert!(store.soft_delete(id).await);

        let email = Email::parse("ada@example.com").unwrap();
        assert!(store.find_login(&email).await.unwrap().is_none());
        assert!(store.find_access(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_time_is_strictly_increasing() {
        let store = MemoryAccountStore::new();
        let id = store
            .create_account(new_account("ada@example.com", None))
            .await
            .unwrap();
        let now = Utc::now();

        let first = store.record_successful_login(id, now).await.unwrap();
        let second = store.record_successful_login(id, now).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_and_filters() {
        let store = MemoryDocumentStore::new();
        for (id, created, categories) in [
            ("a", "2025-01-01T00:00:00Z", json!(["Boys"])),
            ("b", "2025-03-01T00:00:00Z", json!(["Girls"])),
            ("c", "2025-02-01T00:00:00Z", json!(["Boys", "Girls"])),
        ] {
            store
                .create(
                    id,
                    DocumentKind::Product,
                    json!({ "id": id, "createdAt": created, "categories": categories }),
                )
                .await
                .unwrap();
        }

        let all: Vec<Value> = store
            .query(DocumentQuery::new(DocumentKind::Product))
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let boys: Vec<Value> = store
            .query(
                DocumentQuery::new(DocumentKind::Product)
                    .array_contains(ArrayField::Categories, "Boys"),
            )
            .try_collect()
            .await
            .unwrap();
        let ids: Vec<&str> = boys.iter().filter_map(|d| d["id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store.replace("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert!(!store.delete("missing").await.unwrap());
    }
}

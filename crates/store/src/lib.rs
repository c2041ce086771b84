//! In-memory repository backing the library schema.
//!
//! The store is owned by the composition root: it is constructed at startup
//! (usually through [`MemoryRepository::seeded`]) and torn down with
//! [`MemoryRepository::close`]. Lookups after close fail instead of silently
//! returning empty results.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    quire_service_traits::{Repository, ServiceResult, collections},
    serde_json::{Value, json},
    tokio::sync::RwLock,
    tracing::{debug, info},
};

/// Records grouped by collection name, each collection in insertion order.
pub struct MemoryRepository {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    closed: AtomicBool,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// A repository pre-populated with the library fixtures.
    pub fn seeded() -> Self {
        let mut data = HashMap::new();
        data.insert(collections::BOOKS.to_string(), seed_books());
        data.insert(collections::AUTHORS.to_string(), seed_authors());
        data.insert(collections::USERS.to_string(), seed_users());
        info!(collections = data.len(), "opened seeded repository");
        Self {
            collections: RwLock::new(data),
            closed: AtomicBool::new(false),
        }
    }

    /// Replace a collection's contents.
    pub fn with_collection(mut self, name: &str, records: Vec<Value>) -> Self {
        self.collections
            .get_mut()
            .insert(name.to_string(), records);
        self
    }

    /// Drop all records and reject further access.
    pub async fn close(&self) {
        let mut guard = self.collections.write().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        guard.clear();
        info!("closed repository");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Call with the collections lock held.
    fn ensure_open(&self) -> ServiceResult<()> {
        if self.is_closed() {
            return Err("repository closed".into());
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_by_id(&self, collection: &str, id: &str) -> ServiceResult<Option<Value>> {
        let guard = self.collections.read().await;
        self.ensure_open()?;
        let found = guard.get(collection).and_then(|records| {
            records
                .iter()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                .cloned()
        });
        debug!(collection, id, hit = found.is_some(), "find_by_id");
        Ok(found)
    }

    async fn list_all(&self, collection: &str) -> ServiceResult<Vec<Value>> {
        let guard = self.collections.read().await;
        self.ensure_open()?;
        Ok(guard.get(collection).cloned().unwrap_or_default())
    }

    async fn insert(&self, collection: &str, record: Value) -> ServiceResult<()> {
        if !record.is_object() {
            return Err(format!("record for {collection} must be an object").into());
        }
        let mut guard = self.collections.write().await;
        self.ensure_open()?;
        guard
            .entry(collection.to_string())
            .or_default()
            .push(record);
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

fn seed_books() -> Vec<Value> {
    vec![
        json!({ "id": "1", "title": "Thank you Lord!", "color": "RED" }),
        json!({ "id": "2", "title": "All i have to say!", "color": "BLACK" }),
    ]
}

fn seed_authors() -> Vec<Value> {
    vec![
        json!({
            "id": "1",
            "name": "Zlantan Otayo",
            "phone": "0989374343",
            "email": "zlantan@yahoo.com",
        }),
        json!({
            "id": "2",
            "name": "Beyounce Qhyo",
            "phone": "08203232323",
            "email": "beyounce@gmail.com",
        }),
    ]
}

fn seed_users() -> Vec<Value> {
    vec![
        json!({
            "id": "1",
            "name": "Naira Marley",
            "phone": "0989374343",
            "email": "zlantan@yahoo.com",
        }),
        json!({
            "id": "2",
            "name": "Osunde Peter",
            "phone": "08203232323",
            "email": "beyounce@gmail.com",
        }),
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn seeded_lookup_by_id() {
        let repo = MemoryRepository::seeded();
        let user = repo.find_by_id(collections::USERS, "1").await.unwrap();
        assert_eq!(user.unwrap()["name"], "Naira Marley");
        let book = repo.find_by_id(collections::BOOKS, "2").await.unwrap();
        assert_eq!(book.unwrap()["color"], "BLACK");
    }

    #[tokio::test]
    async fn misses_are_none_not_errors() {
        let repo = MemoryRepository::seeded();
        assert!(
            repo.find_by_id(collections::BOOKS, "99")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_by_id("unknown", "1")
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.list_all("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_preserves_order() {
        let repo = MemoryRepository::seeded();
        let ids: Vec<_> = repo
            .list_all(collections::AUTHORS)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn insert_appends_and_rejects_non_objects() {
        let repo = MemoryRepository::new();
        repo.insert(collections::POSTS, json!({ "author": "A", "comment": "hi" }))
            .await
            .unwrap();
        assert!(repo.insert(collections::POSTS, json!("x")).await.is_err());
        assert_eq!(repo.list_all(collections::POSTS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_repository_rejects_access() {
        let repo = MemoryRepository::seeded();
        repo.close().await;
        assert!(repo.is_closed());
        assert!(repo.find_by_id(collections::USERS, "1").await.is_err());
        assert!(repo.list_all(collections::USERS).await.is_err());
        assert!(repo.insert(collections::POSTS, json!({})).await.is_err());
        // Idempotent.
        repo.close().await;
    }

    #[tokio::test]
    async fn close_racing_a_pending_lookup_fails_it() {
        let repo = Arc::new(MemoryRepository::seeded());
        let guard = repo.collections.write().await;
        let pending = tokio::spawn({
            let repo = Arc::clone(&repo);
            async move { repo.find_by_id(collections::BOOKS, "1").await }
        });
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        // Same steps as `close`, taken while the lookup waits for the lock.
        repo.closed.store(true, Ordering::SeqCst);
        drop(guard);
        assert!(pending.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn with_collection_replaces_records() {
        let repo = MemoryRepository::seeded()
            .with_collection(collections::BOOKS, vec![json!({ "id": "9", "title": "Only" })]);
        let books = repo.list_all(collections::BOOKS).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0]["title"], "Only");
    }
}

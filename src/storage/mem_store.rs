//! In-memory document store.
//!
//! Layout: database name → collection name → documents in insertion order.
//! A single `RwLock` guards the whole tree; reads run concurrently and writes are
//! short, so one lock is enough for a process-local backend.
//!
//! Behaviour mirrors what the gateway expects from a MongoDB-like server:
//! - inserting into a missing database or collection creates it
//! - inserting an existing `_id` fails with a duplicate key error
//! - update and remove of a missing document report not found
//! - dropping a missing collection is an error, dropping a missing database is not

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{DocumentStore, Filter, Namespace, SessionBackend, StoreError, StoreResult};
use crate::types::Document;

type Collections = BTreeMap<String, Vec<Document>>;

#[derive(Default)]
struct Inner {
    databases: RwLock<BTreeMap<String, Collections>>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicU64,
    operations: AtomicU64,
}

/// Snapshot of store activity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Sessions currently open
    pub open_sessions: usize,
    /// Sessions opened since the store was created
    pub sessions_opened: u64,
    /// Session operations executed since the store was created
    pub operations: u64,
}

/// Process-local document store
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<Inner>,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current activity counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            open_sessions: self.inner.open_sessions.load(Ordering::Acquire),
            sessions_opened: self.inner.sessions_opened.load(Ordering::Relaxed),
            operations: self.inner.operations.load(Ordering::Relaxed),
        }
    }

    /// Total number of documents across all databases
    pub fn document_count(&self) -> usize {
        self.inner
            .databases
            .read()
            .values()
            .flat_map(|collections| collections.values())
            .map(Vec::len)
            .sum()
    }
}

impl DocumentStore for MemStore {
    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn open_session(&self) -> StoreResult<Box<dyn SessionBackend>> {
        self.inner.open_sessions.fetch_add(1, Ordering::AcqRel);
        self.inner.sessions_opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemSession {
            inner: Arc::clone(&self.inner),
            closed: false,
        }))
    }
}

/// Session over a [`MemStore`]
struct MemSession {
    inner: Arc<Inner>,
    closed: bool,
}

impl MemSession {
    fn begin(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::SessionClosed);
        }
        self.inner.operations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read<T>(&self, ns: Namespace<'_>, f: impl FnOnce(&[Document]) -> T) -> StoreResult<T> {
        self.begin()?;
        let databases = self.inner.databases.read();
        let docs = databases
            .get(ns.db)
            .and_then(|collections| collections.get(ns.collection))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(f(docs))
    }

    /// Run `f` on an existing collection; missing namespaces behave as empty
    fn modify<T>(
        &self,
        ns: Namespace<'_>,
        f: impl FnOnce(&mut Vec<Document>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.begin()?;
        let mut databases = self.inner.databases.write();
        let mut empty = Vec::new();
        let docs = databases
            .get_mut(ns.db)
            .and_then(|collections| collections.get_mut(ns.collection))
            .unwrap_or(&mut empty);
        f(docs)
    }
}

impl SessionBackend for MemSession {
    fn database_names(&self) -> StoreResult<Vec<String>> {
        self.begin()?;
        Ok(self.inner.databases.read().keys().cloned().collect())
    }

    fn collection_names(&self, db: &str) -> StoreResult<Vec<String>> {
        self.begin()?;
        Ok(self
            .inner
            .databases
            .read()
            .get(db)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<usize> {
        self.read(ns, |docs| docs.iter().filter(|d| filter.matches(d)).count())
    }

    fn find_one(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<Document> {
        self.read(ns, |docs| docs.iter().find(|d| filter.matches(d)).cloned())?
            .ok_or(StoreError::NotFound)
    }

    fn find_all(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.read(ns, |docs| {
            docs.iter().filter(|d| filter.matches(d)).cloned().collect()
        })
    }

    fn insert(&self, ns: Namespace<'_>, doc: Document) -> StoreResult<()> {
        self.begin()?;
        let mut databases = self.inner.databases.write();
        let docs = databases
            .entry(ns.db.to_string())
            .or_default()
            .entry(ns.collection.to_string())
            .or_default();

        if docs.iter().any(|d| d.id() == doc.id()) {
            return Err(StoreError::DuplicateKey(format!("{} _id {}", ns, doc.id())));
        }
        docs.push(doc);
        Ok(())
    }

    fn update(&self, ns: Namespace<'_>, filter: &Filter, doc: Document) -> StoreResult<()> {
        self.modify(ns, |docs| {
            let slot = docs
                .iter_mut()
                .find(|d| filter.matches(d))
                .ok_or(StoreError::NotFound)?;
            // The replacement keeps the matched document's identity
            *slot = Document::new(slot.id().clone(), doc.fields().clone());
            Ok(())
        })
    }

    fn upsert(&self, ns: Namespace<'_>, doc: Document) -> StoreResult<bool> {
        self.begin()?;
        let mut databases = self.inner.databases.write();
        let docs = databases
            .entry(ns.db.to_string())
            .or_default()
            .entry(ns.collection.to_string())
            .or_default();

        match docs.iter_mut().find(|d| d.id() == doc.id()) {
            Some(slot) => {
                *slot = doc;
                Ok(true)
            }
            None => {
                docs.push(doc);
                Ok(false)
            }
        }
    }

    fn remove(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<()> {
        self.modify(ns, |docs| {
            let index = docs
                .iter()
                .position(|d| filter.matches(d))
                .ok_or(StoreError::NotFound)?;
            docs.remove(index);
            Ok(())
        })
    }

    fn drop_collection(&self, ns: Namespace<'_>) -> StoreResult<()> {
        self.begin()?;
        let mut databases = self.inner.databases.write();
        let collections = databases
            .get_mut(ns.db)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.to_string()))?;
        collections
            .remove(ns.collection)
            .ok_or_else(|| StoreError::NamespaceNotFound(ns.to_string()))?;

        if collections.is_empty() {
            databases.remove(ns.db);
        }
        Ok(())
    }

    fn drop_database(&self, db: &str) -> StoreResult<()> {
        self.begin()?;
        self.inner.databases.write().remove(db);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.open_sessions.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for MemSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, Fields};
    use serde_json::json;
    use std::sync::Barrier;

    const ORDERS: Namespace<'static> = Namespace {
        db: "shop",
        collection: "orders",
    };

    fn doc(id: &str, item: &str) -> Document {
        let mut fields = Fields::new();
        fields.insert("item".to_string(), json!(item));
        Document::new(DocumentId::Raw(id.to_string()), fields)
    }

    fn by_id(id: &str) -> Filter {
        Filter::ById(DocumentId::Raw(id.to_string()))
    }

    #[test]
    fn test_insert_creates_namespace() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();

        session.insert(ORDERS, doc("a", "pen")).unwrap();

        assert_eq!(session.database_names().unwrap(), vec!["shop"]);
        assert_eq!(session.collection_names("shop").unwrap(), vec!["orders"]);
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();

        session.insert(ORDERS, doc("a", "pen")).unwrap();
        let result = session.insert(ORDERS, doc("a", "cup"));
        assert!(matches!(result, Err(StoreError::DuplicateKey(_))));
    }

    #[test]
    fn test_find_and_count() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        session.insert(ORDERS, doc("a", "pen")).unwrap();
        session.insert(ORDERS, doc("b", "cup")).unwrap();

        assert_eq!(session.count(ORDERS, &Filter::All).unwrap(), 2);
        assert_eq!(session.count(ORDERS, &by_id("b")).unwrap(), 1);
        assert_eq!(session.count(ORDERS, &by_id("z")).unwrap(), 0);

        let found = session.find_one(ORDERS, &by_id("b")).unwrap();
        assert_eq!(found.fields()["item"], "cup");

        let all = session.find_all(ORDERS, &Filter::All).unwrap();
        let ids: Vec<String> = all.iter().map(|d| d.id().encode()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(session.find_one(ORDERS, &by_id("z")), Err(StoreError::NotFound));
    }

    #[test]
    fn test_missing_namespace_reads_empty() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        assert_eq!(session.count(ORDERS, &Filter::All).unwrap(), 0);
        assert!(session.find_all(ORDERS, &Filter::All).unwrap().is_empty());
        assert!(session.collection_names("nope").unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_fields() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        session.insert(ORDERS, doc("a", "pen")).unwrap();

        session.update(ORDERS, &by_id("a"), doc("a", "ink")).unwrap();
        let found = session.find_one(ORDERS, &by_id("a")).unwrap();
        assert_eq!(found.fields()["item"], "ink");

        assert_eq!(
            session.update(ORDERS, &by_id("z"), doc("z", "ink")),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();

        assert!(!session.upsert(ORDERS, doc("a", "pen")).unwrap());
        assert!(session.upsert(ORDERS, doc("a", "ink")).unwrap());

        assert_eq!(session.count(ORDERS, &Filter::All).unwrap(), 1);
        let found = session.find_one(ORDERS, &by_id("a")).unwrap();
        assert_eq!(found.fields()["item"], "ink");
    }

    #[test]
    fn test_concurrent_upserts_create_once() {
        const WRITERS: usize = 8;
        let store = MemStore::new();
        let barrier = Barrier::new(WRITERS);

        let created = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..WRITERS)
                .map(|n| {
                    let (store, barrier) = (&store, &barrier);
                    scope.spawn(move || {
                        let session = store.open_session().unwrap();
                        barrier.wait();
                        session.upsert(ORDERS, doc("a", &format!("writer {}", n)))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .filter(|replaced| !replaced)
                .count()
        });

        assert_eq!(created, 1);
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn test_remove() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        session.insert(ORDERS, doc("a", "pen")).unwrap();

        session.remove(ORDERS, &by_id("a")).unwrap();
        assert_eq!(session.remove(ORDERS, &by_id("a")), Err(StoreError::NotFound));
        // The collection survives its last document
        assert_eq!(session.collection_names("shop").unwrap(), vec!["orders"]);
    }

    #[test]
    fn test_drop_collection_and_database() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        session.insert(ORDERS, doc("a", "pen")).unwrap();
        session
            .insert(Namespace { db: "shop", collection: "users" }, doc("u", "x"))
            .unwrap();

        session.drop_collection(ORDERS).unwrap();
        assert!(matches!(
            session.drop_collection(ORDERS),
            Err(StoreError::NamespaceNotFound(_))
        ));
        assert_eq!(session.collection_names("shop").unwrap(), vec!["users"]);

        session.drop_database("shop").unwrap();
        session.drop_database("shop").unwrap();
        assert!(session.database_names().unwrap().is_empty());
    }

    #[test]
    fn test_closed_session_rejects_operations() {
        let store = MemStore::new();
        let mut session = store.open_session().unwrap();
        assert_eq!(store.stats().open_sessions, 1);

        session.close();
        session.close();
        assert_eq!(store.stats().open_sessions, 0);
        assert_eq!(session.database_names(), Err(StoreError::SessionClosed));
    }

    #[test]
    fn test_stats_count_operations() {
        let store = MemStore::new();
        let session = store.open_session().unwrap();
        session.count(ORDERS, &Filter::All).unwrap();
        session.database_names().unwrap();

        let stats = store.stats();
        assert_eq!(stats.operations, 2);
        assert_eq!(stats.sessions_opened, 1);
    }

    #[test]
    fn test_sessions_share_data() {
        let store = MemStore::new();
        let writer = store.open_session().unwrap();
        let reader = store.open_session().unwrap();

        writer.insert(ORDERS, doc("a", "pen")).unwrap();
        assert_eq!(reader.count(ORDERS, &Filter::All).unwrap(), 1);
    }
}

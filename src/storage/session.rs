//! Per-request session guard
//!
//! A [`Session`] wraps one [`SessionBackend`] and closes it when dropped, so every
//! exit path of a handler releases the session, early error returns included.

use super::{DocumentStore, Filter, Namespace, SessionBackend, StoreResult};
use crate::types::Document;

/// An open store session, closed on drop
pub struct Session {
    backend: Box<dyn SessionBackend>,
}

impl Session {
    /// Open a new session from the shared factory
    pub fn open(store: &dyn DocumentStore) -> StoreResult<Self> {
        let backend = store.open_session()?;
        Ok(Self { backend })
    }

    /// Names of all databases
    pub fn database_names(&self) -> StoreResult<Vec<String>> {
        self.backend.database_names()
    }

    /// Handle on a database
    pub fn db<'a>(&'a self, name: &'a str) -> Database<'a> {
        Database {
            backend: self.backend.as_ref(),
            name,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.backend.close();
    }
}

/// Database handle borrowed from a [`Session`]
pub struct Database<'a> {
    backend: &'a dyn SessionBackend,
    name: &'a str,
}

impl<'a> Database<'a> {
    /// Handle on a collection of this database
    pub fn collection(&self, name: &'a str) -> Collection<'a> {
        Collection {
            backend: self.backend,
            ns: Namespace {
                db: self.name,
                collection: name,
            },
        }
    }

    /// Names of the collections in this database
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        self.backend.collection_names(self.name)
    }

    /// Drop the database
    pub fn drop_database(&self) -> StoreResult<()> {
        self.backend.drop_database(self.name)
    }
}

/// Collection handle borrowed from a [`Session`]
pub struct Collection<'a> {
    backend: &'a dyn SessionBackend,
    ns: Namespace<'a>,
}

impl<'a> Collection<'a> {
    /// Namespace this handle targets
    pub fn namespace(&self) -> Namespace<'a> {
        self.ns
    }

    /// Start a query; nothing runs until `count`, `one` or `all` is called
    pub fn find(&self, filter: Filter) -> Query<'a> {
        Query {
            backend: self.backend,
            ns: self.ns,
            filter,
        }
    }

    /// Insert a new document
    pub fn insert(&self, doc: Document) -> StoreResult<()> {
        self.backend.insert(self.ns, doc)
    }

    /// Replace the document matching `filter`
    pub fn update(&self, filter: &Filter, doc: Document) -> StoreResult<()> {
        self.backend.update(self.ns, filter, doc)
    }

    /// Replace or insert `doc` by its id; `true` when it replaced one
    pub fn upsert(&self, doc: Document) -> StoreResult<bool> {
        self.backend.upsert(self.ns, doc)
    }

    /// Remove the document matching `filter`
    pub fn remove(&self, filter: &Filter) -> StoreResult<()> {
        self.backend.remove(self.ns, filter)
    }

    /// Drop the whole collection
    pub fn drop_collection(&self) -> StoreResult<()> {
        self.backend.drop_collection(self.ns)
    }
}

/// A pending `find`
pub struct Query<'a> {
    backend: &'a dyn SessionBackend,
    ns: Namespace<'a>,
    filter: Filter,
}

impl Query<'_> {
    /// Number of matching documents
    pub fn count(&self) -> StoreResult<usize> {
        self.backend.count(self.ns, &self.filter)
    }

    /// First matching document
    pub fn one(&self) -> StoreResult<Document> {
        self.backend.find_one(self.ns, &self.filter)
    }

    /// Every matching document
    pub fn all(&self) -> StoreResult<Vec<Document>> {
        self.backend.find_all(self.ns, &self.filter)
    }
}

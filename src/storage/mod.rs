//! Document store client layer
//!
//! The gateway talks to its backend through two traits:
//! - [`DocumentStore`] is the long-lived session factory created at startup
//! - [`SessionBackend`] is one isolated session, opened per request
//!
//! Handlers never see the traits directly; they use the [`Session`] guard and its
//! `db(..).collection(..).find(..)` handles, which close the session on drop.

use thiserror::Error;

use crate::types::{Document, DocumentId};

/// Session guard and fluent database/collection handles
pub mod session;

/// In-memory backend
pub mod mem_store;

/// Backend construction from configuration
pub mod factory;

pub use factory::{create_store, SharedStore};
pub use mem_store::{MemStore, StoreStats};
pub use session::{Collection, Database, Query, Session};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store client errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No document matched the filter
    #[error("document not found")]
    NotFound,

    /// A document with the same `_id` already exists
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The database or collection does not exist
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The session was already closed
    #[error("session closed")]
    SessionClosed,

    /// Backend communication or execution failure
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Database and collection a collection-level operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace<'a> {
    /// Database name
    pub db: &'a str,
    /// Collection name
    pub collection: &'a str,
}

impl std::fmt::Display for Namespace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.db, self.collection)
    }
}

/// Document selection understood by every backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every document in the collection
    All,
    /// The document with this `_id`
    ById(DocumentId),
}

impl Filter {
    /// Whether `doc` is selected by this filter
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::ById(id) => doc.id() == id,
        }
    }
}

/// Long-lived session factory shared by all requests
pub trait DocumentStore: Send + Sync {
    /// Check the backend is reachable
    fn ping(&self) -> StoreResult<()>;

    /// Open a new isolated session
    fn open_session(&self) -> StoreResult<Box<dyn SessionBackend>>;
}

/// One open session against the backend.
///
/// Implementations return [`StoreError::NotFound`] from `find_one`, `update` and
/// `remove` when nothing matches; the gateway's status-code decisions depend on it.
pub trait SessionBackend: Send {
    /// Names of all databases
    fn database_names(&self) -> StoreResult<Vec<String>>;

    /// Names of all collections in `db`
    fn collection_names(&self, db: &str) -> StoreResult<Vec<String>>;

    /// Number of documents matching `filter`
    fn count(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<usize>;

    /// First document matching `filter`
    fn find_one(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<Document>;

    /// All documents matching `filter`, in insertion order
    fn find_all(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Insert a new document
    fn insert(&self, ns: Namespace<'_>, doc: Document) -> StoreResult<()>;

    /// Replace the first document matching `filter` with `doc`
    fn update(&self, ns: Namespace<'_>, filter: &Filter, doc: Document) -> StoreResult<()>;

    /// Replace the document with `doc`'s id, or insert `doc` when there is none.
    ///
    /// Must be a single atomic step. Returns `true` when an existing document was
    /// replaced and `false` when `doc` was inserted.
    fn upsert(&self, ns: Namespace<'_>, doc: Document) -> StoreResult<bool>;

    /// Remove the first document matching `filter`
    fn remove(&self, ns: Namespace<'_>, filter: &Filter) -> StoreResult<()>;

    /// Drop a collection and all its documents
    fn drop_collection(&self, ns: Namespace<'_>) -> StoreResult<()>;

    /// Drop a database and all its collections
    fn drop_database(&self, db: &str) -> StoreResult<()>;

    /// Release the session. Called exactly once, by the [`Session`] guard.
    fn close(&mut self);
}

//! Type definitions for documents and their identifiers

pub mod document;
pub mod id;

pub use document::{Document, Fields, ID_FIELD};
pub use id::{DocumentId, IdError, ObjectId};

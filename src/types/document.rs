//! Schemaless documents
//!
//! Field values are `serde_json::Value`, the closed Null/Bool/Number/String/
//! Array/Object union. The `_id` field is kept out of the field map as a typed
//! [`DocumentId`] so raw and binary ids never get confused once stored.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use super::id::DocumentId;

/// Name of the reserved identifier field
pub const ID_FIELD: &str = "_id";

/// Field name to JSON value mapping, as parsed from a request body
pub type Fields = Map<String, Value>;

/// A persisted document: user fields plus its identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    fields: Fields,
}

impl Document {
    /// Build a document, discarding any `_id` already present in `fields`
    pub fn new(id: DocumentId, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self { id, fields }
    }

    /// The document identifier
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// User fields, without `_id`
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(ID_FIELD, &self.id.encode())?;
        map.end()
    }
}

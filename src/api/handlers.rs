//! Operation handlers
//!
//! One handler per verb and resource level. Each runs against the request's
//! [`Session`] and returns a [`Reply`] or an [`ApiError`]; the dispatcher writes
//! whichever comes back.

use axum::http::StatusCode;
use serde_json::Value;

use super::context::RequestContext;
use super::error::{ApiError, ApiResult};
use super::response::Reply;
use crate::storage::{Collection, Filter, Session, StoreError};
use crate::types::{Document, DocumentId, IdError, ID_FIELD};

/// Signature shared by every handler
pub type Handler = fn(&Session, &RequestContext) -> ApiResult<Reply>;

fn collection<'a>(session: &'a Session, ctx: &'a RequestContext) -> ApiResult<Collection<'a>> {
    Ok(session.db(ctx.param("db")?).collection(ctx.param("collection")?))
}

fn path_id(ctx: &RequestContext) -> ApiResult<DocumentId> {
    Ok(DocumentId::decode(ctx.param("docid")?, ctx.hex_ids())?)
}

/// Count documents with `id`; zero means not found
fn ensure_exists(coll: &Collection<'_>, id: &DocumentId) -> ApiResult<()> {
    let count = coll
        .find(Filter::ById(id.clone()))
        .count()
        .map_err(ApiError::store("Error counting documents"))?;
    if count == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

/// `GET /`
pub fn list_databases(session: &Session, _ctx: &RequestContext) -> ApiResult<Reply> {
    let names = session
        .database_names()
        .map_err(ApiError::store("Error getting database names"))?;
    Reply::json(StatusCode::OK, &names)
}

/// `GET /:db`
pub fn list_collections(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    let names = session
        .db(ctx.param("db")?)
        .collection_names()
        .map_err(ApiError::store("Error getting collection names"))?;
    Reply::json(StatusCode::OK, &names)
}

/// `GET /:db/:collection`; query filters are not translated, so any query is refused
pub fn list_documents(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    if ctx.has_query() {
        return Err(ApiError::UnsupportedQuery);
    }

    let docs = collection(session, ctx)?
        .find(Filter::All)
        .all()
        .map_err(ApiError::store("Error getting all documents"))?;
    Reply::json(StatusCode::OK, &docs)
}

/// `GET /:db/:collection/:docid`
pub fn get_document(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    let id = path_id(ctx)?;
    let coll = collection(session, ctx)?;
    ensure_exists(&coll, &id)?;

    let doc = coll
        .find(Filter::ById(id))
        .one()
        .map_err(ApiError::store("Error getting document by id"))?;
    Reply::json(StatusCode::OK, &doc)
}

/// `DELETE /:db/:collection/:docid`
pub fn delete_document(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    if ctx.body.is_some() {
        return Err(ApiError::BodyNotAllowed);
    }

    let id = path_id(ctx)?;
    let coll = collection(session, ctx)?;
    ensure_exists(&coll, &id)?;

    coll.remove(&Filter::ById(id))
        .map_err(ApiError::store("Error removing document"))?;
    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// `DELETE /:db/:collection`
pub fn drop_collection(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    if ctx.body.is_some() {
        return Err(ApiError::UnsupportedBody);
    }

    collection(session, ctx)?
        .drop_collection()
        .map_err(ApiError::store("Error dropping collection"))?;
    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// `DELETE /:db`
pub fn drop_database(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    if ctx.body.is_some() {
        return Err(ApiError::UnsupportedBody);
    }

    session
        .db(ctx.param("db")?)
        .drop_database()
        .map_err(ApiError::store("Error dropping database"))?;
    Ok(Reply::empty(StatusCode::NO_CONTENT))
}

/// `POST /:db/:collection`: update in place when `_id` is given and exists,
/// otherwise insert (generating an id if none was given)
pub fn upsert_document(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    let fields = ctx.body.clone().ok_or(ApiError::MissingBody)?;
    let coll = collection(session, ctx)?;

    let id = match fields.get(ID_FIELD) {
        Some(Value::String(raw)) => {
            Some(DocumentId::decode(raw, ctx.hex_ids()).map_err(ApiError::MalformedId)?)
        }
        Some(other) => {
            return Err(ApiError::MalformedId(IdError::InvalidValue(format!(
                "_id must be a string, got {}",
                other
            ))));
        }
        None => None,
    };

    let doc = match id {
        Some(id) => {
            let doc = Document::new(id.clone(), fields);
            match coll.update(&Filter::ById(id), doc.clone()) {
                Ok(()) => return Ok(Reply::empty(StatusCode::NO_CONTENT)),
                Err(StoreError::NotFound) => {
                    tracing::trace!(id = %doc.id(), "No document to update, inserting");
                    doc
                }
                Err(e) => return Err(ApiError::store("Error updating document")(e)),
            }
        }
        None => Document::new(DocumentId::generate(), fields),
    };

    coll.insert(doc.clone())
        .map_err(ApiError::store("Error inserting document"))?;
    Reply::json(StatusCode::CREATED, &doc)
}

/// `PUT /:db/:collection/:docid`: replace the document at this id, creating it if absent
pub fn put_document(session: &Session, ctx: &RequestContext) -> ApiResult<Reply> {
    let fields = ctx.body.clone().ok_or(ApiError::MissingBody)?;
    let id = path_id(ctx)?;
    let coll = collection(session, ctx)?;

    let replaced = coll
        .upsert(Document::new(id, fields))
        .map_err(ApiError::store("Error replacing document"))?;

    if replaced {
        Ok(Reply::empty(StatusCode::NO_CONTENT))
    } else {
        Ok(Reply::empty(StatusCode::CREATED))
    }
}

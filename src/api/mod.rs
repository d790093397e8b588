//! # API Module
//!
//! The HTTP surface of the gateway. Requests are matched against an ordered
//! route table and handed to one handler per verb and resource level:
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | `GET` | `/` | list database names |
//! | `GET` | `/:db` | list collection names |
//! | `GET` | `/:db/:collection` | list every document |
//! | `GET` | `/:db/:collection/:docid` | fetch one document |
//! | `POST` | `/:db/:collection` | update by `_id`, or insert |
//! | `PUT` | `/:db/:collection/:docid` | replace or create at this id |
//! | `DELETE` | `/:db/:collection/:docid` | remove one document |
//! | `DELETE` | `/:db/:collection` | drop the collection |
//! | `DELETE` | `/:db` | drop the database |
//!
//! Ids in the path (and in a POSTed `_id`) are 24-character hex binary ids unless
//! the query has `hexId=false`, in which case they are used verbatim.

pub mod context;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod server;

// Re-export commonly used items
pub use context::{QueryParams, RequestContext};
pub use error::{ApiError, ApiResult};
pub use response::{write_error, write_success, Reply};
pub use routes::{RouteError, RouteTable};
pub use server::{create_app, start_server, Gateway};

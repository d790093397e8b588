//! HTTP server for the document gateway
//!
//! axum only provides the listener and middleware here. Every request lands in a
//! single fallback handler that resolves it against the gateway's [`RouteTable`],
//! binds the query and body, and runs the handler on the blocking pool with a
//! fresh store session.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::response::Response;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::context::{parse_body, QueryParams, RequestContext};
use super::error::{ApiError, ApiResult};
use super::response::{finish, Reply};
use super::routes::RouteTable;
use crate::core::config::ServerConfig;
use crate::core::error::{Error, Result};
use crate::storage::{Session, SharedStore};

/// Shared state behind the fallback handler
pub struct Gateway {
    store: SharedStore,
    routes: RouteTable,
}

impl Gateway {
    /// Build the gateway over an already-created store
    pub fn new(store: SharedStore) -> Result<Self> {
        let routes = RouteTable::gateway()?;
        tracing::debug!(routes = routes.len(), "Route table built");
        Ok(Self { store, routes })
    }

    /// Resolve, bind and run one request
    pub async fn handle(&self, request: Request) -> ApiResult<Reply> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let path = uri.path();

        let hit = self
            .routes
            .resolve(&method, path)?
            .ok_or_else(|| ApiError::NoRoute {
                method: method.to_string(),
                path: path.to_string(),
            })?;
        tracing::trace!(route = hit.route.name, %path, "Resolved route");

        let handler = hit.route.handler;
        let query = QueryParams::from_uri(&uri)?;
        let body = parse_body(request).await?;
        let ctx = RequestContext {
            params: hit.params,
            query,
            body,
        };

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let session = Session::open(store.as_ref())
                .map_err(ApiError::store("Error opening store session"))?;
            handler(&session, &ctx)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("handler task failed: {}", e)))?
    }
}

async fn dispatch(State(gateway): State<Arc<Gateway>>, request: Request) -> Response {
    finish(gateway.handle(request).await)
}

fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    if config.cors_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| Error::config(format!("Invalid CORS origin {}: {}", origin, e)))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

/// Creates the application router with the gateway dispatcher and middleware
pub fn create_app(store: SharedStore, config: &ServerConfig) -> Result<Router> {
    let gateway = Arc::new(Gateway::new(store)?);

    Ok(Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config)?)
                .layer(DefaultBodyLimit::max(config.max_body_size)),
        )
        .with_state(gateway))
}

/// Serve the gateway until `shutdown` completes
pub async fn start_server<F>(config: &ServerConfig, store: SharedStore, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(store, config)?;

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!("Document gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::server(format!("HTTP server failed: {}", e)))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

//! # REST API HTTP Server
//!
//! Axum router over an [`ObjectsHandler`], with CORS from the HTTP config.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::HttpConfig;
use crate::executor::RowExecutor;
use crate::observability::{Event, Logger};
use crate::pagination::PageEnvelope;

use super::errors::ApiResult;
use super::handler::ObjectsHandler;

/// Shared state type
type ServerState<E> = Arc<ObjectsHandler<E>>;

/// HTTP server for object listings
pub struct ApiServer<E: RowExecutor> {
    handler: Arc<ObjectsHandler<E>>,
}

impl<E: RowExecutor + 'static> ApiServer<E> {
    pub fn new(handler: ObjectsHandler<E>) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let cors = cors_layer(&self.handler.config().http);

        Router::new()
            .route("/health", get(health_handler))
            .route(
                "/v1/instances/:instance/classes/:class/objects/",
                get(list_handler::<E>),
            )
            .with_state(Arc::clone(&self.handler))
            .layer(ServiceBuilder::new().layer(cors))
    }

    /// Bind the configured address and serve until the listener fails
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .handler
            .config()
            .http
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info(Event::ServerListening, &[("addr", &addr.to_string())]);
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

fn cors_layer(config: &HttpConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// GET /v1/instances/:instance/classes/:class/objects/
async fn list_handler<E: RowExecutor + 'static>(
    State(handler): State<ServerState<E>>,
    Path((instance, class)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<PageEnvelope>> {
    handler.list(&instance, &class, &params).map(Json)
}

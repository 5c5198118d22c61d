//! Thin axum transport over [`TileService`].
//!
//! The transport owns nothing but framing: it hands the raw request
//! path to the service and turns the outcome into a status code.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::error;
use tower_http::cors::{Any, CorsLayer};

use crate::error::Error;
use crate::service::TileService;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("{}", self);

        let code = match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::QueryFailed { .. } | Error::EmptyCursor => StatusCode::NOT_FOUND,
            Error::Unavailable { .. }
            | Error::Descriptor(_)
            | Error::Config(_)
            | Error::ConfigIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (code, self.to_string()).into_response()
    }
}

async fn tile(State(service): State<Arc<TileService>>, uri: Uri) -> Result<Response, Error> {
    let tile = service.serve_tile(uri.path()).await?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, tile.content_type)
        .body(Body::from(tile.payload))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// Builds the router: every GET path is a candidate tile address.
pub fn router(service: Arc<TileService>) -> Router {
    Router::new()
        .fallback(get(tile))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(service)
}

/// Binds `listen` and serves until ctrl-c.
pub async fn serve(service: TileService, listen: &str) -> Result<(), std::io::Error> {
    let app = router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

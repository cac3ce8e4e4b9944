use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::reconstruct::{request_key, Reconstructor, Resolution};

/// Content type of every successful response.
pub const CONTENT_TYPE: &str = "text/html";
/// Body of the 404 response.
pub const NOT_FOUND_BODY: &str = "not found";

/// Build the preview router. Every path is a file request.
pub fn build_router(reconstructor: Reconstructor) -> Router {
    Router::new()
        .fallback(serve_file)
        .layer(TraceLayer::new_for_http())
        .with_state(reconstructor)
}

async fn serve_file(State(reconstructor): State<Reconstructor>, uri: Uri) -> Response {
    let key = request_key(uri.path());
    match reconstructor.resolve(&key).await {
        Ok(Resolution::NotFound) => (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response(),
        Ok(Resolution::Whole(bytes)) => {
            ([(header::CONTENT_TYPE, CONTENT_TYPE)], bytes).into_response()
        }
        Ok(Resolution::Streamed(chunks)) => {
            ([(header::CONTENT_TYPE, CONTENT_TYPE)], Body::from_stream(chunks)).into_response()
        }
        Err(err) => {
            warn!(%key, error = %err, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::aggregator::Aggregator;

pub mod handlers;
pub mod models;

use models::ApiError;

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    log::error!("handler panicked: {detail}");
    ApiError::Internal("Internal server error".to_string()).into_response()
}

pub fn create_router(aggregator: Arc<Aggregator>, static_dir: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        // API routes
        .route("/api/query", post(handlers::query_handler))
        .route("/api/search", post(handlers::search_handler))
        .route("/api/similar", post(handlers::similar_handler))
        .route("/api/answer", post(handlers::answer_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(aggregator)
        // Static file serving for the UI
        .fallback_service(ServeDir::new(static_dir))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::aggregator::Aggregator;
use crate::data_models::{
    AggregatedResponse, AnswerResponse, SearchOnlyResponse, SimilarOnlyResponse,
};
use crate::error::ValidationError;
use crate::options::{AnswerRequest, QueryRequest, SearchOnlyRequest, SimilarRequest};

use super::models::{ApiError, HealthResponse};

type JsonBody = Result<Json<Value>, JsonRejection>;

fn body_value(body: JsonBody) -> Result<Value, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ValidationError::MalformedBody(e.body_text()).into())
}

fn request_span(operation: &'static str) -> tracing::Span {
    let request_id = nanoid::nanoid!(10);
    tracing::info_span!("request", operation, %request_id)
}

pub async fn query_handler(
    State(aggregator): State<Arc<Aggregator>>,
    body: JsonBody,
) -> Result<Json<AggregatedResponse>, ApiError> {
    async move {
        let start = Instant::now();
        let request = QueryRequest::from_json(&body_value(body)?)?;
        let response = aggregator.aggregate(&request.q, request.options).await?;
        tracing::info!(
            results = response.results.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "query served"
        );
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(request_span("query"))
    .await
}

pub async fn search_handler(
    State(aggregator): State<Arc<Aggregator>>,
    body: JsonBody,
) -> Result<Json<SearchOnlyResponse>, ApiError> {
    async move {
        let request = SearchOnlyRequest::from_json(&body_value(body)?)?;
        let response = aggregator
            .search_only(&request.q, request.options)
            .await
            .map_err(|e| ApiError::from_aggregate(e, "Search failed"))?;
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(request_span("search"))
    .await
}

pub async fn similar_handler(
    State(aggregator): State<Arc<Aggregator>>,
    body: JsonBody,
) -> Result<Json<SimilarOnlyResponse>, ApiError> {
    async move {
        let request = SimilarRequest::from_json(&body_value(body)?)?;
        let response = aggregator
            .similar_only(&request.url, &request.q, request.num_results)
            .await
            .map_err(|e| ApiError::from_aggregate(e, "Similar search failed"))?;
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(request_span("similar"))
    .await
}

pub async fn answer_handler(
    State(aggregator): State<Arc<Aggregator>>,
    body: JsonBody,
) -> Result<Json<AnswerResponse>, ApiError> {
    async move {
        let request = AnswerRequest::from_json(&body_value(body)?)?;
        let response = aggregator
            .answer_only(&request.question)
            .await
            .map_err(|e| ApiError::from_aggregate(e, "Failed to get answer"))?;
        Ok::<_, ApiError>(Json(response))
    }
    .instrument(request_span("answer"))
    .await
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

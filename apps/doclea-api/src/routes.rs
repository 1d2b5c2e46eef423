use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use doclea_service::{
    CreateMemoryRequest, EmbedBatchRequest, EmbedBatchResponse, EmbedInfo, EmbedRequest,
    EmbedResponse, ListRequest, ListResponse, Memory, Order, RecentResponse, SearchRequest,
    SearchResponse, ServiceError, SimilarResponse, SortKey, StatsResponse, UpdateMemoryRequest,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .route("/health", get(health))
                .route("/memories", get(list_memories).post(create_memory))
                .route(
                    "/memories/{id}",
                    get(get_memory).patch(update_memory).delete(delete_memory),
                )
                .route("/search", post(search))
                .route("/search/similar/{id}", post(find_similar))
                .route("/stats", get(stats))
                .route("/stats/recent", get(recent))
                .route("/embed", post(embed))
                .route("/embed/batch", post(embed_batch))
                .route("/embed/info", get(embed_info)),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "type")]
    r#type: Option<String>,
    tags: Option<String>,
    sort: Option<SortKey>,
    order: Option<Order>,
    cursor: Option<String>,
    limit: Option<u32>,
}

async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let request = ListRequest {
        r#type: query.r#type,
        tags: query
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        sort: query.sort.unwrap_or_default(),
        order: query.order.unwrap_or_default(),
        cursor: query.cursor,
        limit: query.limit,
    };
    let response = state.service.list_memories(&request).await?;
    Ok(Json(response))
}

async fn create_memory(
    State(state): State<AppState>,
    Json(payload): Json<CreateMemoryRequest>,
) -> Result<(StatusCode, Json<Memory>), ApiError> {
    let memory = state.service.create_memory(&payload).await?;
    Ok((StatusCode::CREATED, Json(memory)))
}

async fn get_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Memory>, ApiError> {
    let memory = state.service.get_memory(&id).await?;
    Ok(Json(memory))
}

async fn update_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemoryRequest>,
) -> Result<Json<Memory>, ApiError> {
    let memory = state.service.update_memory(&id, &payload).await?;
    Ok(Json(memory))
}

async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_memory(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = state.service.search(&payload).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SimilarQuery {
    limit: Option<u32>,
}

async fn find_similar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SimilarQuery>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let response = state.service.find_similar(&id, query.limit).await?;
    Ok(Json(response))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let response = state.service.stats().await?;
    Ok(Json(response))
}

async fn recent(State(state): State<AppState>) -> Result<Json<RecentResponse>, ApiError> {
    let response = state.service.recent_memories().await?;
    Ok(Json(response))
}

async fn embed(
    State(state): State<AppState>,
    Json(payload): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let response = state.service.embed_text(&payload).await?;
    Ok(Json(response))
}

async fn embed_batch(
    State(state): State<AppState>,
    Json(payload): Json<EmbedBatchRequest>,
) -> Result<Json<EmbedBatchResponse>, ApiError> {
    let response = state.service.embed_batch(&payload).await?;
    Ok(Json(response))
}

async fn embed_info(State(state): State<AppState>) -> Json<EmbedInfo> {
    Json(state.service.embed_info())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { message } => {
                ApiError::new(StatusCode::NOT_FOUND, "NotFoundError", message)
            }
            ServiceError::InvalidRequest { message } => {
                ApiError::new(StatusCode::BAD_REQUEST, "ValidationError", message)
            }
            ServiceError::Provider { message } => {
                tracing::error!("Embedding provider failure: {message}");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "ProviderError", message)
            }
            ServiceError::Storage { message } => {
                // Internal detail stays in the logs.
                tracing::error!("Database failure: {message}");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DatabaseError",
                    "A database error occurred.",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

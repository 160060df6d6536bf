use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use libpostdeck::{NewPost, Post, PostStatus, PostUpdate, PublishReport, PublishRequest};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct Preview {
    pub rendered: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(edit_post).delete(delete_post),
        )
        .route("/api/posts/{id}/submit", post(submit_post))
        .route("/api/posts/{id}/approve", patch(approve_post))
        .route("/api/posts/{id}/reject", patch(reject_post))
        .route("/api/posts/{id}/preview", post(preview_post))
        .route("/api/posts/{id}/publish", post(publish_post))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PostStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    Ok(Json(state.service.lifecycle().list(status).await?))
}

async fn create_post(
    State(state): State<AppState>,
    Json(input): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.service.lifecycle().create(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.lifecycle().get(id).await?))
}

async fn edit_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<PostUpdate>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.lifecycle().edit(id, update).await?))
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.service.lifecycle().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.lifecycle().submit(id).await?))
}

async fn approve_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.lifecycle().approve(id).await?))
}

async fn reject_post(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Post>> {
    Ok(Json(state.service.lifecycle().reject(id).await?))
}

async fn preview_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Preview>> {
    let rendered = state.service.lifecycle().preview(id).await?;
    Ok(Json(Preview { rendered }))
}

/// A failed attempt is still a 200: the report carries the outcome
async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<Json<PublishReport>> {
    Ok(Json(state.service.publish(id, request).await?))
}

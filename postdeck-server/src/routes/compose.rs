use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use libpostdeck::compose::ComposeRequest;
use libpostdeck::NewPost;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ComposeInput {
    pub topic: String,
    #[serde(default)]
    pub tone: Option<String>,
    /// Save the drafted text as a new post
    #[serde(default)]
    pub create: bool,
    /// With `create`, stage the new post as a draft
    #[serde(default)]
    pub draft: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/compose", post(compose))
}

async fn compose(
    State(state): State<AppState>,
    Json(input): Json<ComposeInput>,
) -> ApiResult<Response> {
    let request = ComposeRequest {
        topic: input.topic,
        tone: input.tone,
    };
    let composed = state.service.compose(&request).await?;

    if !input.create {
        return Ok(Json(composed).into_response());
    }

    let post = state
        .service
        .lifecycle()
        .create(NewPost {
            hashtags: composed.hashtags,
            draft: input.draft,
            ..NewPost::with_body(composed.body)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

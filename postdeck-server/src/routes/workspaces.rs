use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use libpostdeck::publishers::metricool::{Channel, Workspace};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/workspaces", get(list_workspaces))
        .route("/api/workspaces/{id}/channels", get(list_channels))
}

async fn list_workspaces(State(state): State<AppState>) -> ApiResult<Json<Vec<Workspace>>> {
    Ok(Json(state.service.workspaces().await?))
}

async fn list_channels(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Channel>>> {
    Ok(Json(state.service.channels(&id).await?))
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use libpostdeck::credentials::KeyInfo;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StoreKey {
    pub name: String,
    pub key: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/keys", get(list_keys).post(store_key))
        .route("/api/keys/{name}", delete(delete_key))
}

async fn list_keys(State(state): State<AppState>) -> ApiResult<Json<Vec<KeyInfo>>> {
    Ok(Json(state.service.credentials().list()?))
}

/// Secret values never appear in responses
async fn store_key(
    State(state): State<AppState>,
    Json(input): Json<StoreKey>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state.service.credentials().set(&input.name, &input.key)?;
    tracing::info!("Stored key '{}'", input.name);
    Ok((StatusCode::CREATED, Json(json!({ "name": input.name }))))
}

async fn delete_key(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.credentials().delete(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

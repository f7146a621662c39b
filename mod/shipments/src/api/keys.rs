use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use shiptrack_core::{ListParams, ListResult};

use crate::model::ApiKey;

use super::{ok_json, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/keys", get(list_keys).post(create_key))
        .route("/keys/{id}", axum::routing::delete(delete_key))
}

#[derive(Deserialize)]
struct CreateKeyRequest {
    description: String,
}

async fn create_key(
    State(state): State<AppState>,
    Json(req): Json<CreateKeyRequest>,
) -> Result<Json<ApiKey>, ApiError> {
    ok_json(state.svc.create_api_key(&req.description))
}

async fn list_keys(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<ApiKey>>, ApiError> {
    ok_json(state.svc.list_api_keys(&params))
}

async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.svc.delete_api_key(&id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

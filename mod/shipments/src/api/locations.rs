use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use shiptrack_core::{ListParams, ListResult};

use crate::model::Location;

use super::{ok_json, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location).patch(update_location).delete(delete_location),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLocationRequest {
    name: String,
    #[serde(default)]
    notify_emails: Vec<String>,
}

async fn create_location(
    State(state): State<AppState>,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Json<Location>, ApiError> {
    ok_json(state.svc.create_location(&req.name, req.notify_emails))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Location>, ApiError> {
    ok_json(state.svc.get_location(&id))
}

async fn list_locations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Location>>, ApiError> {
    ok_json(state.svc.list_locations(&params))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Location>, ApiError> {
    ok_json(state.svc.update_location(&id, patch))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.svc.delete_location(&id).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

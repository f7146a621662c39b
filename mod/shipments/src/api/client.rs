use axum::{extract::State, routing::post, Extension, Json, Router};
use tracing::info;

use crate::model::{ApiKey, Shipment};

use super::shipments::CreateShipmentRequest;
use super::{ok_json, ApiError, AppState};

/// External partner integration: shipment creation only, gated by the
/// API-key middleware which injects the verified key as an extension.
pub fn routes() -> Router<AppState> {
    Router::new().route("/client/shipments", post(create_shipment))
}

async fn create_shipment(
    State(state): State<AppState>,
    Extension(key): Extension<ApiKey>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<Json<Shipment>, ApiError> {
    info!(client = %key.description, "client shipment creation");
    ok_json(state.svc.create_shipment(req.into_input()))
}

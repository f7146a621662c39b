use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::service::receive::{ExtraDeviceInput, ReceiveInput};

use super::{ApiError, AppState};

/// The public receive endpoint. No authentication: possession of the
/// printed/scanned short code is the capability.
pub fn routes() -> Router<AppState> {
    Router::new().route("/receive/{code}", post(receive_shipment))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiveRequest {
    recipient_name: String,
    /// Signature image payload (base64).
    signature: String,
    #[serde(default)]
    received_serials: Vec<String>,
    #[serde(default)]
    extra_devices: Vec<ExtraDeviceEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtraDeviceEntry {
    serial: String,
    #[serde(default)]
    asset_tag: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiveResponse {
    short_code: String,
    status: String,
    received_at: Option<String>,
}

async fn receive_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<ReceiveRequest>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let input = ReceiveInput {
        recipient_name: req.recipient_name,
        signature: req.signature,
        received_serials: req.received_serials,
        extra_devices: req
            .extra_devices
            .into_iter()
            .map(|d| ExtraDeviceInput {
                serial: d.serial,
                asset_tag: d.asset_tag,
                model: d.model,
            })
            .collect(),
    };
    let shipment = state.svc.receive(&code, input).map_err(ApiError::from)?;
    Ok(Json(ReceiveResponse {
        short_code: shipment.short_code,
        status: shipment.status.as_str().to_string(),
        received_at: shipment.received_at,
    }))
}

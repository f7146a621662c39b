use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use shiptrack_core::{ListParams, ListResult};

use crate::model::{Device, Shipment, ShipmentStatus};
use crate::service::shipment::{
    CreateShipmentInput, DeviceInput, ShipmentFilters, ShipmentPatch,
};

use super::{ok_json, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", get(list_shipments).post(create_shipment))
        .route(
            "/shipments/{code}",
            get(get_shipment).patch(edit_shipment).delete(delete_shipment),
        )
        .route("/shipments/{code}/devices", get(list_devices))
        .route("/shipments/{code}/verify", post(verify_shipment))
        .route(
            "/shipments/{code}/devices/{serial}/checkin",
            post(checkin_device),
        )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    pub sender_name: String,
    pub sender_email: String,
    #[serde(default)]
    pub location_id: Option<String>,
    /// Destination by name, created implicitly on first use.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notify_emails: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    pub serial: String,
    #[serde(default)]
    pub asset_tag: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl CreateShipmentRequest {
    pub(crate) fn into_input(self) -> CreateShipmentInput {
        CreateShipmentInput {
            sender_name: self.sender_name,
            sender_email: self.sender_email,
            location_id: self.location_id,
            location_name: self.location,
            devices: self
                .devices
                .into_iter()
                .map(|d| DeviceInput {
                    serial: d.serial,
                    asset_tag: d.asset_tag,
                    model: d.model,
                })
                .collect(),
            tracking_number: self.tracking_number,
            notes: self.notes,
            reference: self.reference,
            notify_emails: self.notify_emails,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchRequest {
    #[serde(default)]
    status: Option<ShipmentStatus>,
    #[serde(default)]
    sender_name: Option<String>,
    #[serde(default)]
    sender_email: Option<String>,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    notify_emails: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    serials: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipmentQuery {
    #[serde(flatten)]
    params: ListParams,
    status: Option<String>,
    location_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckInResponse {
    serial: String,
    checked_in_at: Option<String>,
    already_checked_in: bool,
}

async fn create_shipment(
    State(state): State<AppState>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<Json<Shipment>, ApiError> {
    ok_json(state.svc.create_shipment(req.into_input()))
}

async fn get_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Shipment>, ApiError> {
    ok_json(state.svc.get_shipment(&code))
}

async fn list_shipments(
    State(state): State<AppState>,
    Query(q): Query<ShipmentQuery>,
) -> Result<Json<ListResult<Shipment>>, ApiError> {
    let status = match q.status {
        Some(ref s) => Some(ShipmentStatus::parse(s).map_err(ApiError::from)?),
        None => None,
    };
    let filters = ShipmentFilters {
        status,
        location_id: q.location_id,
    };
    ok_json(state.svc.list_shipments(&q.params, &filters))
}

async fn list_devices(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Device>>, ApiError> {
    ok_json(state.svc.list_devices(&code))
}

async fn edit_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<Shipment>, ApiError> {
    let patch = ShipmentPatch {
        status: req.status,
        sender_name: req.sender_name,
        sender_email: req.sender_email,
        tracking_number: req.tracking_number,
        notes: req.notes,
        notify_emails: req.notify_emails,
    };
    ok_json(state.svc.edit_shipment(&code, patch))
}

async fn verify_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Shipment>, ApiError> {
    ok_json(state.svc.verify_shipment(&code, &req.serials))
}

async fn delete_shipment(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.svc.delete_shipment(&code).map_err(ApiError::from)?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

async fn checkin_device(
    State(state): State<AppState>,
    Path((code, serial)): Path<(String, String)>,
) -> Result<Json<CheckInResponse>, ApiError> {
    let outcome = state
        .svc
        .checkin_device(&code, &serial)
        .map_err(ApiError::from)?;
    Ok(Json(CheckInResponse {
        serial: outcome.device.serial,
        checked_in_at: outcome.device.checked_in_at,
        already_checked_in: outcome.already_checked_in,
    }))
}

pub mod client;
pub mod keys;
pub mod locations;
pub mod middleware;
pub mod receive;
pub mod shipments;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;

use shiptrack_core::{Authenticator, ServiceError};

use crate::service::ShipmentService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<ShipmentService>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the shipments API router.
pub fn router(svc: Arc<ShipmentService>, auth: Arc<dyn Authenticator>) -> Router {
    let state = AppState { svc, auth };
    Router::new()
        .nest("/shipments/v1", api_routes(&state))
        .with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    // Three trust zones: admin (session auth), client (API key), and
    // the public receive endpoint.
    let admin = Router::new()
        .merge(shipments::routes())
        .merge(locations::routes())
        .merge(keys::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_auth,
        ));

    let client = client::routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::api_key_auth,
    ));

    Router::new()
        .merge(admin)
        .merge(client)
        .merge(receive::routes())
}

/// Standard API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError {
            code: err.status_code().as_u16(),
            message: err.to_string(),
        }
    }
}

/// Wrap a Result<T, ServiceError> into an API response.
pub(crate) fn ok_json<T: Serialize>(result: Result<T, ServiceError>) -> Result<Json<T>, ApiError> {
    result.map(Json).map_err(ApiError::from)
}

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use shiptrack_core::ServiceError;

use super::{ApiError, AppState};

/// Session authentication for dashboard routes.
///
/// Delegates to the injected `Authenticator`; the concrete credential
/// scheme lives in the binary, not here.
pub async fn admin_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match state.auth.check(req.headers(), "shipments:admin") {
        Ok(()) => next.run(req).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// API-key authentication for the external client routes.
///
/// The verified key metadata is stored as a request extension so
/// handlers can attribute the request (e.g. the key's description).
pub async fn api_key_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let key = match req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
    {
        Some(k) => k.to_string(),
        None => {
            return ApiError::from(ServiceError::Unauthorized(
                "missing x-api-key header".into(),
            ))
            .into_response();
        }
    };

    match state.svc.verify_api_key(&key) {
        Ok(record) => {
            req.extensions_mut().insert(record);
            next.run(req).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

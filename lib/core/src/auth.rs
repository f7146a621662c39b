//! Session authentication seam.
//!
//! The core does not depend on any specific credential scheme. It only
//! knows this trait; the concrete implementation (bearer token, JWT,
//! cookie session) is injected at startup time.

use axum::http::HeaderMap;

use crate::ServiceError;

/// Pluggable session authenticator, consulted by admin-gated endpoints.
///
/// The check receives the request headers (for extracting tokens)
/// and a permission string naming the protected surface.
pub trait Authenticator: Send + Sync + 'static {
    /// Authenticate a request and check the given permission.
    ///
    /// - `headers`: the HTTP request headers
    /// - `permission`: e.g. `"shipments:admin"`
    /// - Returns `Ok(())` if allowed, `Err(ServiceError)` if denied.
    fn check(
        &self,
        headers: &HeaderMap,
        permission: &str,
    ) -> Result<(), ServiceError>;
}

/// A no-op authenticator that allows everything. Used for testing
/// and for public-only deployments.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn check(&self, _headers: &HeaderMap, _permission: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// An authenticator that denies everything. Used for testing.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn check(&self, _headers: &HeaderMap, _permission: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Unauthorized("access denied".into()))
    }
}

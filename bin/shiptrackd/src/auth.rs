use axum::http::HeaderMap;

use shiptrack_core::{Authenticator, ServiceError};

/// Bearer-token authenticator for the administrative routes.
///
/// Compares the Authorization header against the configured admin
/// token. Deliberately minimal: credential storage and hashing schemes
/// belong to a fuller auth module, not to this service.
pub struct TokenAuthenticator {
    token: String,
}

impl TokenAuthenticator {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl Authenticator for TokenAuthenticator {
    fn check(&self, headers: &HeaderMap, _permission: &str) -> Result<(), ServiceError> {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match bearer {
            None => Err(ServiceError::Unauthorized(
                "missing authorization header".into(),
            )),
            Some(t) if t == self.token => Ok(()),
            Some(_) => Err(ServiceError::Unauthorized("invalid token".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(v) = value {
            h.insert("authorization", HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn accepts_matching_token() {
        let auth = TokenAuthenticator::new("secret".into());
        assert!(auth.check(&headers(Some("Bearer secret")), "shipments:admin").is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong() {
        let auth = TokenAuthenticator::new("secret".into());
        assert!(auth.check(&headers(None), "shipments:admin").is_err());
        assert!(auth.check(&headers(Some("Bearer nope")), "shipments:admin").is_err());
        assert!(auth.check(&headers(Some("secret")), "shipments:admin").is_err());
    }
}

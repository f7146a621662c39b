use tracing::warn;

use shiptrack_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use shiptrack_sql::Value;

use crate::model::ApiKey;

use super::ShipmentService;

impl ShipmentService {
    /// Issue a new API key for an external integration.
    pub fn create_api_key(&self, description: &str) -> Result<ApiKey, ServiceError> {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(ServiceError::Validation(
                "API key description is required".into(),
            ));
        }

        let id = new_id();
        let now = now_rfc3339();
        let record = ApiKey {
            id: id.clone(),
            key: new_id(),
            description,
            active: true,
            last_used_at: None,
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("api_keys", &id, &record, &[
            ("key", Value::Text(record.key.clone())),
            ("active", Value::Integer(1)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn list_api_keys(&self, params: &ListParams) -> Result<ListResult<ApiKey>, ServiceError> {
        self.list_records("api_keys", &[], params.limit.min(500), params.offset)
    }

    pub fn delete_api_key(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record("api_keys", id)
    }

    /// Verify a request-supplied key and return its metadata.
    ///
    /// Unknown keys are 401, disabled keys 403. A successful lookup
    /// refreshes `last_used_at` best-effort — a failed refresh is logged
    /// and never fails the request.
    pub fn verify_api_key(&self, key: &str) -> Result<ApiKey, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM api_keys WHERE key = ?1",
                &[Value::Text(key.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::Unauthorized("invalid API key".into()))?;
        let data = row
            .get_str("data")
            .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
        let mut record: ApiKey =
            serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?;

        if !record.active {
            return Err(ServiceError::PermissionDenied("API key is disabled".into()));
        }

        record.last_used_at = Some(now_rfc3339());
        if let Err(e) = self.update_record("api_keys", &record.id.clone(), &record, &[]) {
            warn!(key_id = %record.id, error = %e, "failed to refresh API key last_used_at");
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::test_service;
    use super::*;

    #[test]
    fn issue_and_verify() {
        let (svc, _, _) = test_service();
        let key = svc.create_api_key("partner integration").unwrap();
        let verified = svc.verify_api_key(&key.key).unwrap();
        assert_eq!(verified.id, key.id);
        assert!(verified.last_used_at.is_some());
    }

    #[test]
    fn unknown_key_unauthorized() {
        let (svc, _, _) = test_service();
        assert!(matches!(
            svc.verify_api_key("nope"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn disabled_key_forbidden() {
        let (svc, _, _) = test_service();
        let key = svc.create_api_key("partner integration").unwrap();
        let mut record = key.clone();
        record.active = false;
        svc.update_record("api_keys", &key.id, &record, &[("active", Value::Integer(0))])
            .unwrap();
        assert!(matches!(
            svc.verify_api_key(&key.key),
            Err(ServiceError::PermissionDenied(_))
        ));
    }

    #[test]
    fn blank_description_rejected() {
        let (svc, _, _) = test_service();
        assert!(matches!(
            svc.create_api_key("  "),
            Err(ServiceError::Validation(_))
        ));
    }
}
